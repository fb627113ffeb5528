use serde::Serialize;

use crate::error::Result;
use crate::types::ResultTable;

/// UTF-8 byte-order mark so spreadsheet tools detect the encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_FILENAME: &str = "keyword_stats.csv";

pub const NO_RESULTS_MESSAGE: &str = "조회 결과가 없습니다.";

/// BOM-prefixed CSV: one header row, then one line per table row.
pub fn to_csv(table: &ResultTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(table.headers())?;
    for record in table.cells() {
        writer.write_record(&record)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// JSON shape handed to the web layer.
#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<&ResultTable> for TableResponse {
    fn from(table: &ResultTable) -> Self {
        Self {
            columns: table.headers(),
            rows: table.cells(),
            row_count: table.len(),
            message: table.is_empty().then_some(NO_RESULTS_MESSAGE),
        }
    }
}

impl std::fmt::Display for ResultTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers = self.headers();
        let cells = self.cells();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |f: &mut std::fmt::Formatter<'_>, values: &[&str]| -> std::fmt::Result {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{v}{}", " ".repeat(w - v.chars().count())))
                .collect();
            writeln!(f, "{}", padded.join("  ").trim_end())
        };

        line(f, &headers)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("  "))?;
        for row in &cells {
            let values: Vec<&str> = row.iter().map(String::as_str).collect();
            line(f, &values)?;
        }
        Ok(())
    }
}
