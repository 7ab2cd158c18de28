//! Batch stages run by the binaries. Each stage reads what earlier stages
//! wrote and writes its own tables under the configured output directory.

pub mod cohort_summary;
pub mod daily_scop;
pub mod load_groups;
pub mod reprocess;
pub mod system_tables;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use heatpump_client::{
    domain::{System, SystemStats},
    MonitorClient,
};

use crate::config::AppConfig;
use crate::sinks::CsvTable;

/// System metadata and trailing-year stats, fetched once per run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub systems: Vec<System>,
    pub stats: HashMap<String, SystemStats>,
}

impl Snapshot {
    pub async fn fetch(client: &MonitorClient) -> Result<Self> {
        let systems = client.system_list().await?;
        let stats = client.stats_last365().await?;
        metrics::counter!("systems_fetched_total").increment(systems.len() as u64);
        tracing::info!(systems = systems.len(), stats = stats.len(), "fetched system snapshot");
        Ok(Self { systems, stats })
    }
}

pub fn client(cfg: &AppConfig) -> Result<MonitorClient> {
    MonitorClient::new(cfg.api.base_url.as_str())
}

/// Write named tables into `dir`.
pub(crate) fn write_tables<'a>(dir: &Path, tables: impl IntoIterator<Item = (&'a str, CsvTable)>) -> Result<()> {
    for (name, table) in tables {
        let path = dir.join(name);
        table
            .write(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Read a table written by an earlier stage. `None` (with a warning) when it
/// has not been produced yet.
pub(crate) fn read_table(path: &Path) -> Result<Option<CsvTable>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "table not found, run the producing stage first");
        return Ok(None);
    }
    let table = CsvTable::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(table))
}
