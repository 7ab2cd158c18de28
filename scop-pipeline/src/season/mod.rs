//! Seasonal windows and SCOP aggregation.

pub mod aggregate;

pub use aggregate::{aggregate, annual_from_table, compute_row, rows_from_table, ScopRow, ScopTables};

use time::{Date, PrimitiveDateTime};

use crate::metric::Metric;

/// Seasonal coefficient of performance for one window.
pub type Scop = Metric;

/// A fixed half-open interval `[start, end)` with a label and the column
/// name used in SCOP tables.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalWindow {
    pub label: String,
    pub column: String,
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

impl SeasonalWindow {
    pub fn new(label: impl Into<String>, column: impl Into<String>, start: Date, end: Date) -> Self {
        Self {
            label: label.into(),
            column: column.into(),
            start: start.midnight(),
            end: end.midnight(),
        }
    }

    pub fn contains(&self, ts: PrimitiveDateTime) -> bool {
        self.start <= ts && ts < self.end
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SeasonError {
    #[error("at least one seasonal window is required")]
    Empty,
    #[error("window '{0}' ends before it starts")]
    Inverted(String),
    #[error("window '{next}' does not start where '{previous}' ends")]
    NotContiguous { previous: String, next: String },
    #[error("full-year window must span exactly the seasonal windows")]
    FullYearMismatch,
    #[error("no window labelled '{0}'")]
    UnknownLabel(String),
}

/// The seasonal windows of one analysis year plus the full-year window.
///
/// Seasons are contiguous and non-overlapping; the full-year window starts
/// with the first season and ends with the last.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonTable {
    seasons: Vec<SeasonalWindow>,
    full_year: SeasonalWindow,
}

impl SeasonTable {
    pub fn new(seasons: Vec<SeasonalWindow>, full_year: SeasonalWindow) -> Result<Self, SeasonError> {
        let (first, last) = match (seasons.first(), seasons.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(SeasonError::Empty),
        };

        for w in seasons.iter().chain(std::iter::once(&full_year)) {
            if w.end <= w.start {
                return Err(SeasonError::Inverted(w.label.clone()));
            }
        }
        for pair in seasons.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(SeasonError::NotContiguous {
                    previous: pair[0].label.clone(),
                    next: pair[1].label.clone(),
                });
            }
        }
        if full_year.start != first.start || full_year.end != last.end {
            return Err(SeasonError::FullYearMismatch);
        }

        Ok(Self { seasons, full_year })
    }

    pub fn seasons(&self) -> &[SeasonalWindow] {
        &self.seasons
    }

    pub fn full_year(&self) -> &SeasonalWindow {
        &self.full_year
    }

    /// Seasons followed by the full-year window, in table column order.
    pub fn windows(&self) -> impl Iterator<Item = &SeasonalWindow> {
        self.seasons.iter().chain(std::iter::once(&self.full_year))
    }

    pub fn columns(&self) -> Vec<String> {
        self.windows().map(|w| w.column.clone()).collect()
    }

    pub fn season_of(&self, ts: PrimitiveDateTime) -> Option<&SeasonalWindow> {
        self.seasons.iter().find(|w| w.contains(ts))
    }

    pub fn find(&self, label: &str) -> Result<&SeasonalWindow, SeasonError> {
        self.windows()
            .find(|w| w.label.eq_ignore_ascii_case(label))
            .ok_or_else(|| SeasonError::UnknownLabel(label.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use time::macros::date;

    /// June 2023 to June 2024, as used throughout the tests.
    pub fn season_table() -> SeasonTable {
        SeasonTable::new(
            vec![
                SeasonalWindow::new("Summer", "SCOP (Jun 23 to Aug 23)", date!(2023-06-01), date!(2023-09-01)),
                SeasonalWindow::new("Autumn", "SCOP (Sep 23 to Nov 23)", date!(2023-09-01), date!(2023-12-01)),
                SeasonalWindow::new("Winter", "SCOP (Dec 23 to Feb 24)", date!(2023-12-01), date!(2024-03-01)),
                SeasonalWindow::new("Spring", "SCOP (Mar 24 to May 24)", date!(2024-03-01), date!(2024-06-01)),
            ],
            SeasonalWindow::new("Full-year", "SCOP (Jun 23 to Jun 24)", date!(2023-06-01), date!(2024-06-01)),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::season_table;
    use super::*;
    use time::macros::{date, datetime};
    use time::Duration;

    #[test]
    fn boundary_belongs_to_next_window() {
        let table = season_table();
        let ts = datetime!(2023-09-01 00:00:00);
        assert_eq!(table.season_of(ts).unwrap().label, "Autumn");
        assert!(!table.find("Summer").unwrap().contains(ts));
        assert!(table.find("Autumn").unwrap().contains(ts));
    }

    #[test]
    fn every_hour_of_the_year_is_in_exactly_one_season() {
        let table = season_table();
        let mut ts = datetime!(2023-06-01 00:00:00);
        while ts < datetime!(2024-06-01 00:00:00) {
            let hits = table.seasons().iter().filter(|w| w.contains(ts)).count();
            assert_eq!(hits, 1, "{ts}");
            assert!(table.full_year().contains(ts));
            ts += Duration::hours(7);
        }
        assert!(table.season_of(datetime!(2024-06-01 00:00:00)).is_none());
        assert!(table.season_of(datetime!(2023-05-31 23:00:00)).is_none());
    }

    #[test]
    fn rejects_gaps_between_seasons() {
        let err = SeasonTable::new(
            vec![
                SeasonalWindow::new("A", "a", date!(2023-06-01), date!(2023-09-01)),
                SeasonalWindow::new("B", "b", date!(2023-09-02), date!(2023-12-01)),
            ],
            SeasonalWindow::new("Y", "y", date!(2023-06-01), date!(2023-12-01)),
        )
        .unwrap_err();
        assert!(matches!(err, SeasonError::NotContiguous { .. }));
    }

    #[test]
    fn rejects_full_year_not_spanning_seasons() {
        let err = SeasonTable::new(
            vec![SeasonalWindow::new("A", "a", date!(2023-06-01), date!(2023-09-01))],
            SeasonalWindow::new("Y", "y", date!(2023-06-01), date!(2023-10-01)),
        )
        .unwrap_err();
        assert_eq!(err, SeasonError::FullYearMismatch);
    }

    #[test]
    fn find_is_case_insensitive() {
        let table = season_table();
        assert_eq!(table.find("winter").unwrap().label, "Winter");
        assert!(table.find("Monsoon").is_err());
        assert_eq!(table.columns().len(), 5);
    }
}
