use heatpump_client::domain::{DailyRecord, EnergyCategory};

use super::{Scop, SeasonTable, SeasonalWindow};
use crate::exclusion::ExclusionList;
use crate::metric::Metric;
use crate::sinks::CsvTable;

/// SCOP of one category over one window.
///
/// `NotAvailable` when no record falls in the window, when a record in the
/// window lacks the category's energy readings, or when the summed
/// electrical input is not strictly positive.
pub fn aggregate(records: &[DailyRecord], window: &SeasonalWindow, category: EnergyCategory) -> Scop {
    let mut data_available = false;
    let mut total_elec = 0.0;
    let mut total_heat = 0.0;

    for record in records.iter().filter(|r| window.contains(r.timestamp)) {
        data_available = true;
        match record.reading(category).energy() {
            Some((elec, heat)) => {
                total_elec += elec;
                total_heat += heat;
            }
            None => return Metric::NotAvailable,
        }
    }

    if !data_available {
        return Metric::NotAvailable;
    }
    Metric::ratio(total_heat, total_elec)
}

/// Per-window SCOP for one system and category, in [`SeasonTable::windows`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopRow {
    pub system_id: u32,
    pub values: Vec<Scop>,
}

impl ScopRow {
    /// The full-year result (last column).
    pub fn full_year(&self) -> Scop {
        self.values.last().copied().unwrap_or(Metric::NotAvailable)
    }

    /// Every window is unavailable or strictly positive, and at least one
    /// window produced a number.
    pub fn is_clean(&self) -> bool {
        let no_corrupt = self
            .values
            .iter()
            .all(|v| !v.is_available() || v.is_positive());
        let any_data = self.values.iter().any(|v| v.is_available());
        no_corrupt && any_data
    }

    fn to_record(&self) -> Vec<String> {
        std::iter::once(self.system_id.to_string())
            .chain(self.values.iter().map(ToString::to_string))
            .collect()
    }
}

pub fn compute_row(
    system_id: u32,
    records: &[DailyRecord],
    seasons: &SeasonTable,
    category: EnergyCategory,
) -> ScopRow {
    ScopRow {
        system_id,
        values: seasons
            .windows()
            .map(|w| aggregate(records, w, category))
            .collect(),
    }
}

/// The three published views of one category's SCOP results.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopTables {
    /// Every system, sorted by ID.
    pub original: Vec<ScopRow>,
    /// Rows passing [`ScopRow::is_clean`], excluded IDs removed.
    pub clean: Vec<ScopRow>,
    /// Positive full-year SCOP per system, excluded IDs removed.
    pub annual: Vec<(u32, f64)>,
}

impl ScopTables {
    pub fn build(mut rows: Vec<ScopRow>, exclusion: &ExclusionList) -> Self {
        rows.sort_by_key(|r| r.system_id);

        let clean = rows
            .iter()
            .filter(|r| r.is_clean() && !exclusion.contains(r.system_id))
            .cloned()
            .collect();
        let annual = rows
            .iter()
            .filter(|r| !exclusion.contains(r.system_id))
            .filter_map(|r| match r.full_year() {
                Metric::Value(v) if v > 0.0 => Some((r.system_id, v)),
                _ => None,
            })
            .collect();

        Self {
            original: rows,
            clean,
            annual,
        }
    }

    pub fn original_table(&self, seasons: &SeasonTable) -> CsvTable {
        rows_table(seasons, &self.original)
    }

    pub fn clean_table(&self, seasons: &SeasonTable) -> CsvTable {
        rows_table(seasons, &self.clean)
    }

    pub fn annual_table(&self, seasons: &SeasonTable) -> CsvTable {
        let mut table = CsvTable::new(["ID".to_string(), seasons.full_year().column.clone()]);
        for (id, scop) in &self.annual {
            table.push(vec![id.to_string(), Metric::Value(*scop).to_string()]);
        }
        table
    }
}

fn rows_table(seasons: &SeasonTable, rows: &[ScopRow]) -> CsvTable {
    let mut table = CsvTable::new(std::iter::once("ID".to_string()).chain(seasons.columns()));
    for row in rows {
        table.push(row.to_record());
    }
    table
}

/// Parse a SCOP table written by [`ScopTables`] back into rows. Columns are
/// matched by name; rows with a malformed ID are skipped.
pub fn rows_from_table(table: &CsvTable, seasons: &SeasonTable) -> Vec<ScopRow> {
    let Some(id_idx) = table.column("ID") else {
        return Vec::new();
    };
    let columns: Vec<Option<usize>> = seasons.windows().map(|w| table.column(&w.column)).collect();

    table
        .rows
        .iter()
        .filter_map(|row| {
            let system_id = row.get(id_idx)?.trim().parse().ok()?;
            let values = columns
                .iter()
                .map(|idx| {
                    idx.and_then(|i| row.get(i))
                        .map_or(Metric::NotAvailable, |cell| Metric::from_text(cell))
                })
                .collect();
            Some(ScopRow { system_id, values })
        })
        .collect()
}

/// `(ID, full-year SCOP)` pairs from an annual table.
pub fn annual_from_table(table: &CsvTable, seasons: &SeasonTable) -> Vec<(u32, f64)> {
    let (Some(id_idx), Some(scop_idx)) = (table.column("ID"), table.column(&seasons.full_year().column)) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|row| {
            let id = row.get(id_idx)?.trim().parse().ok()?;
            let scop = Metric::from_text(row.get(scop_idx)?).value()?;
            Some((id, scop))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::fixtures::season_table;
    use heatpump_client::domain::CategoryReading;
    use time::macros::datetime;
    use time::PrimitiveDateTime;

    fn day(ts: PrimitiveDateTime, elec: f64, heat: f64) -> DailyRecord {
        let reading = CategoryReading {
            elec_kwh: Some(elec),
            heat_kwh: Some(heat),
            ..Default::default()
        };
        DailyRecord {
            timestamp: ts,
            combined: reading,
            space: reading,
            water: CategoryReading::default(),
        }
    }

    #[test]
    fn single_winter_day() {
        let seasons = season_table();
        let records = vec![day(datetime!(2024-01-15 00:00:00), 2.0, 6.0)];

        let row = compute_row(7, &records, &seasons, EnergyCategory::Combined);
        assert_eq!(
            row.values,
            vec![
                Metric::NotAvailable,
                Metric::NotAvailable,
                Metric::Value(3.0),
                Metric::NotAvailable,
                Metric::Value(3.0),
            ]
        );
        assert!(row.is_clean());
    }

    #[test]
    fn sums_before_dividing() {
        let seasons = season_table();
        let records = vec![
            day(datetime!(2023-06-10 00:00:00), 1.0, 5.0),
            day(datetime!(2023-06-11 00:00:00), 3.0, 7.0),
        ];
        let summer = seasons.find("Summer").unwrap();
        assert_eq!(aggregate(&records, summer, EnergyCategory::Combined), Metric::Value(3.0));
    }

    #[test]
    fn not_available_when_window_empty_or_no_consumption() {
        let seasons = season_table();
        let summer = seasons.find("Summer").unwrap();

        assert_eq!(aggregate(&[], summer, EnergyCategory::Combined), Metric::NotAvailable);

        let zero = vec![day(datetime!(2023-07-01 00:00:00), 0.0, 4.0)];
        assert_eq!(aggregate(&zero, summer, EnergyCategory::Combined), Metric::NotAvailable);

        let negative = vec![
            day(datetime!(2023-07-01 00:00:00), 1.0, 4.0),
            day(datetime!(2023-07-02 00:00:00), -2.0, 1.0),
        ];
        assert_eq!(aggregate(&negative, summer, EnergyCategory::Combined), Metric::NotAvailable);
    }

    #[test]
    fn missing_category_readings_make_window_unavailable() {
        let seasons = season_table();
        let records = vec![day(datetime!(2023-07-01 00:00:00), 2.0, 6.0)];
        let summer = seasons.find("Summer").unwrap();

        assert_eq!(aggregate(&records, summer, EnergyCategory::Water), Metric::NotAvailable);
        assert_eq!(aggregate(&records, summer, EnergyCategory::Space), Metric::Value(3.0));
    }

    #[test]
    fn record_at_window_end_counts_in_next_window() {
        let seasons = season_table();
        let records = vec![day(datetime!(2023-09-01 00:00:00), 1.0, 4.0)];

        let row = compute_row(1, &records, &seasons, EnergyCategory::Combined);
        assert_eq!(row.values[0], Metric::NotAvailable);
        assert_eq!(row.values[1], Metric::Value(4.0));
    }

    #[test]
    fn clean_filter_drops_corrupt_and_empty_rows() {
        let na = Metric::NotAvailable;
        let ok = ScopRow { system_id: 1, values: vec![Metric::Value(3.1), na, na, na, Metric::Value(3.1)] };
        let negative = ScopRow { system_id: 2, values: vec![Metric::Value(-1.0), na, na, na, Metric::Value(2.0)] };
        let zero = ScopRow { system_id: 3, values: vec![Metric::Value(0.0), na, na, na, na] };
        let empty = ScopRow { system_id: 4, values: vec![na; 5] };

        assert!(ok.is_clean());
        assert!(!negative.is_clean());
        assert!(!zero.is_clean());
        assert!(!empty.is_clean());
    }

    #[test]
    fn tables_apply_exclusions_after_aggregation() {
        let na = Metric::NotAvailable;
        let rows = vec![
            ScopRow { system_id: 12, values: vec![Metric::Value(3.0), na, na, na, Metric::Value(3.0)] },
            ScopRow { system_id: 5, values: vec![na, na, na, na, Metric::Value(4.2)] },
            ScopRow { system_id: 8, values: vec![na; 5] },
        ];
        let exclusion = ExclusionList::new([12]);

        let tables = ScopTables::build(rows, &exclusion);

        let original_ids: Vec<u32> = tables.original.iter().map(|r| r.system_id).collect();
        assert_eq!(original_ids, vec![5, 8, 12]);
        let clean_ids: Vec<u32> = tables.clean.iter().map(|r| r.system_id).collect();
        assert_eq!(clean_ids, vec![5]);
        assert_eq!(tables.annual, vec![(5, 4.2)]);
    }

    #[test]
    fn table_round_trip() {
        let seasons = season_table();
        let na = Metric::NotAvailable;
        let rows = vec![ScopRow {
            system_id: 9,
            values: vec![Metric::Value(2.875), na, Metric::Value(3.3333333333333335), na, Metric::Value(3.0)],
        }];
        let tables = ScopTables::build(rows.clone(), &ExclusionList::default());

        let table = tables.original_table(&seasons);
        assert_eq!(table.headers[1], "SCOP (Jun 23 to Aug 23)");
        assert_eq!(table.rows[0][2], "Data not available");
        assert_eq!(rows_from_table(&table, &seasons), rows);

        let annual = tables.annual_table(&seasons);
        assert_eq!(annual.headers, vec!["ID", "SCOP (Jun 23 to Jun 24)"]);
        assert_eq!(annual.rows, vec![vec!["9".to_string(), "3.0".to_string()]]);
        assert_eq!(annual_from_table(&annual, &seasons), vec![(9, 3.0)]);
    }
}
