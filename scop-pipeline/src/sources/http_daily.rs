use anyhow::{Context, Result};
use csv::StringRecord;
use heatpump_client::MonitorClient;

use super::{daily_reader, timestamp_index, DailyRow};
use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Daily series of one system, downloaded from the monitoring service.
///
/// The body is fetched up front so the header row is known before the
/// pipeline is assembled; rows are streamed from memory.
pub struct HttpDailySource {
    system_id: u32,
    headers: StringRecord,
    body: String,
}

impl HttpDailySource {
    /// Download the series. `None` when the service returned no header row.
    pub async fn fetch(client: &MonitorClient, system_id: u32) -> Result<Option<Self>> {
        let body = client.daily_csv(system_id).await?;
        metrics::counter!("daily_series_fetched_total").increment(1);
        Self::from_body(system_id, body)
    }

    pub fn from_body(system_id: u32, body: String) -> Result<Option<Self>> {
        let headers = daily_reader(body.as_bytes())
            .headers()
            .with_context(|| format!("failed to read daily CSV header for system {system_id}"))?
            .clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            tracing::warn!(system_id, "daily response has no header row");
            return Ok(None);
        }
        Ok(Some(Self {
            system_id,
            headers,
            body,
        }))
    }

    pub fn system_id(&self) -> u32 {
        self.system_id
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn timestamp_index(&self) -> usize {
        timestamp_index(&self.headers)
    }
}

#[async_trait::async_trait]
impl Source<DailyRow> for HttpDailySource {
    async fn stream(&self) -> EnvelopeStream<DailyRow> {
        let body = self.body.clone();
        let system_id = self.system_id;
        let s = async_stream::try_stream! {
            let mut rdr = daily_reader(body.as_bytes());
            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read daily record for system {system_id}: {e}"
                )))?;
                let line = record.position().map_or(0, |p| p.line());
                yield Envelope { payload: DailyRow::new(record), line };
            }
        };

        Box::pin(s)
    }
}
