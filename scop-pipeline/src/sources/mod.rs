pub mod daily_csv_file;
pub mod http_daily;

pub use daily_csv_file::{load_daily_records, DailyCsvFileSource};
pub use http_daily::HttpDailySource;

use csv::StringRecord;
use heatpump_client::domain::daily::TIMESTAMP_COLUMN;
use time::PrimitiveDateTime;

/// A raw row of a per-system daily CSV. `hour` is filled in by the
/// timestamp normalization transform when the epoch value parses.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub fields: StringRecord,
    pub hour: Option<PrimitiveDateTime>,
}

impl DailyRow {
    pub fn new(fields: StringRecord) -> Self {
        Self { fields, hour: None }
    }
}

/// Position of the timestamp column. The service pads header names with a
/// leading space; the second column is assumed when no header matches.
pub fn timestamp_index(headers: &StringRecord) -> usize {
    headers
        .iter()
        .position(|h| h.trim() == TIMESTAMP_COLUMN)
        .unwrap_or(1)
}

pub(crate) fn daily_reader<R: std::io::Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(rdr)
}
