/// Placeholder shown for missing or unknown values.
pub const PLACEHOLDER: &str = "-";

// ---------------------------------------------------------------------------
// Competition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Competition {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl Competition {
    /// Naver `compIdx` label ("낮음" / "중간" / "높음").
    pub fn from_naver_label(s: &str) -> Self {
        match s.trim() {
            "낮음" => Competition::Low,
            "중간" => Competition::Medium,
            "높음" => Competition::High,
            _ => Competition::Unknown,
        }
    }

    /// Google `KeywordPlanCompetitionLevel` numeric value.
    /// 0 = UNSPECIFIED, 1 = UNKNOWN.
    pub fn from_google_code(code: i64) -> Self {
        match code {
            2 => Competition::Low,
            3 => Competition::Medium,
            4 => Competition::High,
            _ => Competition::Unknown,
        }
    }

    /// Google enum name as returned by the REST interface.
    pub fn from_google_name(name: &str) -> Self {
        match name {
            "LOW" => Competition::Low,
            "MEDIUM" => Competition::Medium,
            "HIGH" => Competition::High,
            _ => Competition::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Competition::Low => "낮음",
            Competition::Medium => "중간",
            Competition::High => "높음",
            Competition::Unknown => PLACEHOLDER,
        }
    }
}

impl std::fmt::Display for Competition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Extra Naver metrics returned with `showDetail=1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailMetrics {
    pub pc_avg_clicks: f64,
    pub mobile_avg_clicks: f64,
    /// Percent, e.g. 1.25 = 1.25%.
    pub pc_ctr: f64,
    pub mobile_ctr: f64,
    pub avg_ad_depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub keyword: String,
    pub pc_volume: u64,
    pub mobile_volume: u64,
    /// Always pc_volume + mobile_volume, saturating at `u64::MAX`.
    pub total_volume: u64,
    pub competition: Competition,
    pub secondary_volume: u64,
    pub secondary_competition: Competition,
    pub detail: Option<DetailMetrics>,
}

impl NormalizedRow {
    pub fn primary(keyword: String, pc_volume: u64, mobile_volume: u64) -> Self {
        Self {
            keyword,
            pc_volume,
            mobile_volume,
            total_volume: pc_volume.saturating_add(mobile_volume),
            competition: Competition::Unknown,
            secondary_volume: 0,
            secondary_competition: Competition::Unknown,
            detail: None,
        }
    }

    pub fn secondary(keyword: String, volume: u64, competition: Competition) -> Self {
        Self {
            keyword,
            pc_volume: 0,
            mobile_volume: 0,
            total_volume: 0,
            competition: Competition::Unknown,
            secondary_volume: volume,
            secondary_competition: competition,
            detail: None,
        }
    }
}

/// One keyword idea from Google, before it is matched or tabled.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordIdea {
    pub text: String,
    pub avg_monthly_searches: u64,
    pub competition: Competition,
}

/// Google metrics for a keyword that matched a primary keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryMetric {
    pub volume: u64,
    pub competition: Competition,
}

// ---------------------------------------------------------------------------
// Result table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Primary { detail: bool },
    Secondary,
    Merged { detail: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Keyword,
    PcVolume,
    MobileVolume,
    TotalVolume,
    SecondaryVolume,
    Competition,
    SecondaryCompetition,
    PcAvgClicks,
    MobileAvgClicks,
    PcCtr,
    MobileCtr,
    AvgAdDepth,
}

const DETAIL_COLUMNS: [Column; 5] = [
    Column::PcAvgClicks,
    Column::MobileAvgClicks,
    Column::PcCtr,
    Column::MobileCtr,
    Column::AvgAdDepth,
];

impl Column {
    pub fn header(&self, kind: TableKind) -> &'static str {
        match (self, kind) {
            (Column::Keyword, _) => "키워드",
            (Column::SecondaryVolume, TableKind::Secondary) => "월간검색수",
            (Column::SecondaryCompetition, TableKind::Secondary) => "경쟁도",
            (Column::PcVolume, _) => "PC 월간검색수",
            (Column::MobileVolume, _) => "모바일 월간검색수",
            (Column::TotalVolume, _) => "총 월간검색수",
            (Column::SecondaryVolume, _) => "구글 월간검색수",
            (Column::Competition, _) => "경쟁정도",
            (Column::SecondaryCompetition, _) => "구글 경쟁도",
            (Column::PcAvgClicks, _) => "PC 월평균클릭수",
            (Column::MobileAvgClicks, _) => "모바일 월평균클릭수",
            (Column::PcCtr, _) => "PC 월평균클릭률(%)",
            (Column::MobileCtr, _) => "모바일 월평균클릭률(%)",
            (Column::AvgAdDepth, _) => "월평균노출광고수",
        }
    }

    pub fn cell(&self, row: &NormalizedRow) -> String {
        let detail = row.detail.as_ref();
        let metric = |f: fn(&DetailMetrics) -> f64| {
            detail.map(|d| format_metric(f(d))).unwrap_or_else(|| PLACEHOLDER.to_string())
        };
        match self {
            Column::Keyword => row.keyword.clone(),
            Column::PcVolume => row.pc_volume.to_string(),
            Column::MobileVolume => row.mobile_volume.to_string(),
            Column::TotalVolume => row.total_volume.to_string(),
            Column::SecondaryVolume => row.secondary_volume.to_string(),
            Column::Competition => row.competition.to_string(),
            Column::SecondaryCompetition => row.secondary_competition.to_string(),
            Column::PcAvgClicks => metric(|d| d.pc_avg_clicks),
            Column::MobileAvgClicks => metric(|d| d.mobile_avg_clicks),
            Column::PcCtr => metric(|d| d.pc_ctr),
            Column::MobileCtr => metric(|d| d.mobile_ctr),
            Column::AvgAdDepth => metric(|d| d.avg_ad_depth),
        }
    }
}

fn format_metric(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[derive(Debug, Clone)]
pub struct ResultTable {
    pub kind: TableKind,
    pub rows: Vec<NormalizedRow>,
}

impl ResultTable {
    pub fn new(kind: TableKind, rows: Vec<NormalizedRow>) -> Self {
        Self { kind, rows }
    }

    pub fn empty(kind: TableKind) -> Self {
        Self { kind, rows: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Fixed column order for this table kind. The primary competition column
    /// is only present together with the detail columns.
    pub fn columns(&self) -> Vec<Column> {
        let mut cols = match self.kind {
            TableKind::Secondary => {
                return vec![Column::Keyword, Column::SecondaryVolume, Column::SecondaryCompetition];
            }
            TableKind::Primary { .. } => vec![
                Column::Keyword,
                Column::PcVolume,
                Column::MobileVolume,
                Column::TotalVolume,
                Column::Competition,
            ],
            TableKind::Merged { .. } => vec![
                Column::Keyword,
                Column::PcVolume,
                Column::MobileVolume,
                Column::TotalVolume,
                Column::SecondaryVolume,
                Column::Competition,
                Column::SecondaryCompetition,
            ],
        };
        match self.kind {
            TableKind::Primary { detail: true } | TableKind::Merged { detail: true } => cols.extend(DETAIL_COLUMNS),
            // compIdx is only fetched with detail, so the column would always be empty.
            _ => cols.retain(|c| *c != Column::Competition),
        }
        cols
    }

    pub fn headers(&self) -> Vec<&'static str> {
        let kind = self.kind;
        self.columns().iter().map(|c| c.header(kind)).collect()
    }

    /// Rows rendered as display strings, in column order.
    pub fn cells(&self) -> Vec<Vec<String>> {
        let columns = self.columns();
        self.rows
            .iter()
            .map(|row| columns.iter().map(|c| c.cell(row)).collect())
            .collect()
    }
}
