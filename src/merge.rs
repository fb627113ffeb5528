use std::collections::HashMap;

use crate::normalize::canonical;
use crate::types::{Competition, NormalizedRow, ResultTable, SecondaryMetric, TableKind};

/// Stable sort, highest total volume first.
pub fn sort_by_total_desc(rows: &mut [NormalizedRow]) {
    rows.sort_by(|a, b| b.total_volume.cmp(&a.total_volume));
}

/// Join the sorted primary rows with the canonical-keyed secondary matches.
///
/// Every primary row is kept, in its original order. Rows without a match get
/// a secondary volume of 0 and the placeholder competition.
pub fn merge_results(
    primary: Vec<NormalizedRow>,
    secondary: &HashMap<String, SecondaryMetric>,
    detail: bool,
) -> ResultTable {
    let rows = primary
        .into_iter()
        .map(|mut row| {
            match secondary.get(&canonical(&row.keyword)) {
                Some(m) => {
                    row.secondary_volume = m.volume;
                    row.secondary_competition = m.competition;
                }
                None => {
                    row.secondary_volume = 0;
                    row.secondary_competition = Competition::Unknown;
                }
            }
            row
        })
        .collect();

    ResultTable::new(TableKind::Merged { detail }, rows)
}
