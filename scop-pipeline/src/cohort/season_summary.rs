use heatpump_client::domain::EnergyCategory;

use super::{fmt2, Summary};
use crate::season::{ScopRow, SeasonTable};
use crate::sinks::CsvTable;

pub const HEADERS: [&str; 5] = ["Category", "Season", "Window", "Valid count", "Median SCOP"];

/// Valid count and median SCOP per category and season, from the clean
/// tables. Unavailable values do not count.
pub fn season_summary(clean: &[(EnergyCategory, Vec<ScopRow>)], seasons: &SeasonTable) -> CsvTable {
    let mut table = CsvTable::new(HEADERS);

    for (category, rows) in clean {
        for (idx, window) in seasons.seasons().iter().enumerate() {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.values.get(idx).and_then(|v| v.value()))
                .collect();
            let summary = Summary::of(&values);
            table.push(vec![
                category.label().to_string(),
                window.label.clone(),
                window.column.clone(),
                summary.count.to_string(),
                fmt2(summary.median),
            ]);
        }
    }
    table
}
