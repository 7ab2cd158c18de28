use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use csv::{StringRecord, Writer};
use futures::{Stream, StreamExt};

use crate::pipeline::{Envelope, PipelineError, Sink};
use crate::season::SeasonalWindow;
use crate::sources::DailyRow;
use crate::transform::format_hour;

/// The four files kept per system for its daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyVariant {
    /// Rows exactly as downloaded.
    Original,
    /// Timestamps rewritten to calendar hours.
    Converted,
    /// Converted rows inside the full-year window.
    Clean,
    /// Converted rows inside the winter window.
    Winter,
}

impl DailyVariant {
    pub const ALL: [DailyVariant; 4] = [Self::Original, Self::Converted, Self::Clean, Self::Winter];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Converted => "converted",
            Self::Clean => "clean",
            Self::Winter => "winter",
        }
    }
}

pub fn daily_file_path(dir: &Path, system_id: u32, variant: DailyVariant) -> PathBuf {
    dir.join(format!("system_{system_id}_daily_data_{}.csv", variant.suffix()))
}

/// Splits one system's normalized daily rows across the four variant files.
///
/// Upstream errors are logged and the row is dropped; only I/O failures on
/// the output files end the run.
pub struct DailyVariantSink {
    dir: PathBuf,
    system_id: u32,
    headers: StringRecord,
    timestamp_index: usize,
    clean_window: SeasonalWindow,
    winter_window: SeasonalWindow,
    write_original: bool,
}

impl DailyVariantSink {
    pub fn new(
        dir: impl Into<PathBuf>,
        system_id: u32,
        headers: StringRecord,
        timestamp_index: usize,
        clean_window: SeasonalWindow,
        winter_window: SeasonalWindow,
    ) -> Self {
        Self {
            dir: dir.into(),
            system_id,
            headers,
            timestamp_index,
            clean_window,
            winter_window,
            write_original: true,
        }
    }

    /// Leave an existing `_original` file untouched, for reprocessing from it.
    pub fn without_original(mut self) -> Self {
        self.write_original = false;
        self
    }

    pub fn path(&self, variant: DailyVariant) -> PathBuf {
        daily_file_path(&self.dir, self.system_id, variant)
    }

    /// Paths of the files this sink writes.
    pub fn files(&self) -> Vec<PathBuf> {
        self.variants().map(|v| self.path(v)).collect()
    }

    fn variants(&self) -> impl Iterator<Item = DailyVariant> + '_ {
        DailyVariant::ALL
            .into_iter()
            .filter(|v| self.write_original || *v != DailyVariant::Original)
    }

    fn open(&self, variant: DailyVariant) -> Result<Writer<File>, PipelineError> {
        let path = self.path(variant);
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| sink_error(&path, e))?;
        wtr.write_record(&self.headers).map_err(|e| sink_error(&path, e))?;
        Ok(wtr)
    }

    fn converted(&self, row: &DailyRow) -> StringRecord {
        match row.hour {
            Some(hour) => row
                .fields
                .iter()
                .enumerate()
                .map(|(i, f)| if i == self.timestamp_index { format_hour(hour) } else { f.to_string() })
                .collect(),
            None => row.fields.clone(),
        }
    }
}

fn sink_error(path: &Path, e: csv::Error) -> PipelineError {
    PipelineError::Sink(format!("{}: {e}", path.display()))
}

struct Writers {
    original: Option<Writer<File>>,
    converted: Writer<File>,
    clean: Writer<File>,
    winter: Writer<File>,
}

#[async_trait::async_trait]
impl Sink<DailyRow> for DailyVariantSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<DailyRow>, PipelineError>> + Send + Unpin + 'static,
    {
        fs::create_dir_all(&self.dir)?;
        let mut w = Writers {
            original: if self.write_original { Some(self.open(DailyVariant::Original)?) } else { None },
            converted: self.open(DailyVariant::Converted)?,
            clean: self.open(DailyVariant::Clean)?,
            winter: self.open(DailyVariant::Winter)?,
        };

        let mut rows = 0u64;
        let mut clean = 0u64;
        let mut winter = 0u64;
        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(system_id = self.system_id, error = %e, "dropping daily row");
                    continue;
                }
            };
            let row = env.payload;
            rows += 1;

            let res: Result<(), csv::Error> = (|| {
                if row.fields.len() <= 1 {
                    return w.converted.write_record(&row.fields);
                }
                if let Some(original) = w.original.as_mut() {
                    original.write_record(&row.fields)?;
                }
                let converted = self.converted(&row);
                w.converted.write_record(&converted)?;
                if let Some(hour) = row.hour {
                    if self.clean_window.contains(hour) {
                        w.clean.write_record(&converted)?;
                        clean += 1;
                    }
                    if self.winter_window.contains(hour) {
                        w.winter.write_record(&converted)?;
                        winter += 1;
                    }
                }
                Ok(())
            })();
            res.map_err(|e| PipelineError::Sink(format!("system {} line {}: {e}", self.system_id, env.line)))?;
        }

        if let Some(original) = w.original.as_mut() {
            original.flush()?;
        }
        w.converted.flush()?;
        w.clean.flush()?;
        w.winter.flush()?;

        metrics::counter!("daily_rows_total").increment(rows);
        tracing::info!(system_id = self.system_id, rows, clean, winter, "wrote daily variants");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::season::fixtures::season_table;
    use crate::sources::HttpDailySource;
    use crate::transform::TimestampNormalization;
    use std::sync::Arc;
    use chrono_tz::Tz;

    #[tokio::test]
    async fn splits_rows_across_variants() {
        let dir = tempfile::tempdir().unwrap();
        let seasons = season_table();
        // 2023-05-31 12:00, 2023-12-01 00:00, 2023-09-01 00:00, garbage.
        let body = "id, timestamp, combined_elec_kwh\n\
                    4,1685534400,1.0\n\
                    4,1701388800,2.0\n\
                    4,1693526400,3.0\n\
                    4,oops,4.0\n"
            .to_string();
        let source = HttpDailySource::from_body(4, body).unwrap().unwrap();
        let sink = DailyVariantSink::new(
            dir.path(),
            4,
            source.headers().clone(),
            source.timestamp_index(),
            seasons.full_year().clone(),
            seasons.find("Winter").unwrap().clone(),
        );
        let files = sink.files();
        let pipeline: Pipeline<_, DailyRow, _> = Pipeline {
            name: "system-4".to_string(),
            transforms: vec![Arc::new(TimestampNormalization::new(source.timestamp_index(), Tz::UTC))],
            source,
            sink,
        };
        pipeline.run().await.unwrap();
        assert_eq!(files.len(), 4);

        let read = |v| fs::read_to_string(daily_file_path(dir.path(), 4, v)).unwrap();
        assert_eq!(
            read(DailyVariant::Original),
            "id, timestamp, combined_elec_kwh\n4,1685534400,1.0\n4,1701388800,2.0\n4,1693526400,3.0\n4,oops,4.0\n"
        );
        assert_eq!(
            read(DailyVariant::Converted),
            "id, timestamp, combined_elec_kwh\n\
             4,2023-05-31 12:00:00,1.0\n\
             4,2023-12-01 00:00:00,2.0\n\
             4,2023-09-01 00:00:00,3.0\n\
             4,oops,4.0\n"
        );
        assert_eq!(
            read(DailyVariant::Clean),
            "id, timestamp, combined_elec_kwh\n4,2023-12-01 00:00:00,2.0\n4,2023-09-01 00:00:00,3.0\n"
        );
        assert_eq!(read(DailyVariant::Winter), "id, timestamp, combined_elec_kwh\n4,2023-12-01 00:00:00,2.0\n");
    }

    #[test]
    fn file_names() {
        let path = daily_file_path(Path::new("system_daily_data"), 42, DailyVariant::Winter);
        assert_eq!(path, Path::new("system_daily_data/system_42_daily_data_winter.csv"));
    }
}
