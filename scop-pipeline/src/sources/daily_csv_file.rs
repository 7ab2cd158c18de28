use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use csv::StringRecord;
use heatpump_client::domain::DailyRecord;

use super::{daily_reader, timestamp_index, DailyRow};
use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// A previously saved daily CSV, replayed row by row.
///
/// Used to rebuild the derived variants from `_original` files without
/// touching the network.
pub struct DailyCsvFileSource {
    path: PathBuf,
    headers: StringRecord,
}

impl DailyCsvFileSource {
    /// `None` when the file does not exist or has no header row.
    pub fn open(path: impl Into<PathBuf>) -> Result<Option<Self>, PipelineError> {
        let path = path.into();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                metrics::counter!("daily_files_missing_total").increment(1);
                tracing::debug!(path = %path.display(), "daily file not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let headers = daily_reader(BufReader::new(file))
            .headers()
            .map_err(|e| PipelineError::Source(format!("{}: {e}", path.display())))?
            .clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(None);
        }
        Ok(Some(Self { path, headers }))
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn timestamp_index(&self) -> usize {
        timestamp_index(&self.headers)
    }
}

#[async_trait::async_trait]
impl Source<DailyRow> for DailyCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<DailyRow> {
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let file = File::open(&path)?;
            let mut rdr = daily_reader(BufReader::new(file));
            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!("{}: {e}", path.display())))?;
                let line = record.position().map_or(0, |p| p.line());
                yield Envelope { payload: DailyRow::new(record), line };
            }
        };

        Box::pin(s)
    }
}

/// Parse a normalized (`_clean` / `_winter`) daily file into records.
///
/// Returns `Ok(None)` when the file does not exist. Rows that do not parse
/// are skipped with a warning.
pub fn load_daily_records(path: &Path) -> Result<Option<Vec<DailyRecord>>, PipelineError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            metrics::counter!("daily_files_missing_total").increment(1);
            tracing::debug!(path = %path.display(), "daily file not found, skipping");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut rdr = daily_reader(BufReader::new(file));
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::Source(format!("{}: {e}", path.display())))?
        .clone();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| PipelineError::Source(format!("{}: {e}", path.display())))?;
        match DailyRecord::from_csv(&headers, &row) {
            Ok(record) => records.push(record),
            Err(e) => {
                let line = row.position().map_or(0, |p| p.line());
                tracing::warn!(path = %path.display(), line, error = %e, "skipping daily row");
            }
        }
    }
    Ok(Some(records))
}
