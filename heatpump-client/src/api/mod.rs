use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::domain::{System, SystemStats};

pub const DEFAULT_BASE_URL: &str = "https://heatpumpmonitor.org";

const SYSTEM_LIST_PATH: &str = "/system/list/public.json";
const STATS_LAST365_PATH: &str = "/system/stats/last365";
const DAILY_STATS_PATH: &str = "/system/stats/daily";

/// Read-only client for the public heat-pump monitoring API.
///
/// No timeouts or retries are configured: a failed or non-2xx call is
/// returned as an error and callers abort the batch.
#[derive(Clone)]
pub struct MonitorClient {
    base_url: String,
    client: Client,
}

impl MonitorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the public system metadata list.
    pub async fn system_list(&self) -> Result<Vec<System>> {
        let url = format!("{}{SYSTEM_LIST_PATH}", self.base_url);
        tracing::debug!(%url, "fetching system list");

        let systems = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?
            .json::<Vec<System>>()
            .await
            .context("failed to decode system list")?;

        Ok(systems)
    }

    /// Fetch trailing-365-day statistics keyed by system ID (as a string).
    pub async fn stats_last365(&self) -> Result<HashMap<String, SystemStats>> {
        let url = format!("{}{STATS_LAST365_PATH}", self.base_url);
        tracing::debug!(%url, "fetching last365 stats");

        let stats = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?
            .json::<HashMap<String, SystemStats>>()
            .await
            .context("failed to decode last365 stats")?;

        Ok(stats)
    }

    /// Fetch the raw daily CSV for one system. Timestamps are epoch seconds.
    pub async fn daily_csv(&self, system_id: u32) -> Result<String> {
        let url = format!("{}{DAILY_STATS_PATH}", self.base_url);
        tracing::debug!(%url, system_id, "fetching daily stats");

        let body = self
            .client
            .get(&url)
            .query(&[("id", system_id)])
            .send()
            .await
            .with_context(|| format!("GET {url}?id={system_id} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url}?id={system_id} returned an error status"))?
            .text()
            .await
            .with_context(|| format!("failed to read daily stats body for system {system_id}"))?;

        Ok(body)
    }
}
