//! Rebuild the daily variants and SCOP tables from saved `_original` files.

use anyhow::Result;
use scop_pipeline::{config::AppConfig, metrics_textfile, observability, stages::reprocess};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::init(metrics_cfg)?;
    }

    let report = reprocess::run(&cfg).await?;
    tracing::info!(moved = report.moved.len(), failed = report.errors.len(), "reprocessed daily series");

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::write_textfile(metrics_cfg)?;
    }
    Ok(())
}
