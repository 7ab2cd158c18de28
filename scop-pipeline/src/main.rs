use anyhow::Result;
use scop_pipeline::{
    config::AppConfig,
    metrics_textfile, observability,
    stages::{self, cohort_summary, daily_scop, load_groups, system_tables, Snapshot},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::init(metrics_cfg)?;
    }

    let client = stages::client(&cfg)?;
    let snapshot = Snapshot::fetch(&client).await?;

    system_tables::run(&cfg, &snapshot)?;
    load_groups::run(&cfg, &snapshot)?;
    let report = daily_scop::run(&cfg, &client, &snapshot).await?;
    tracing::info!(moved = report.moved.len(), failed = report.errors.len(), "relocated excluded systems");
    cohort_summary::run(&cfg)?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::write_textfile(metrics_cfg)?;
    }
    Ok(())
}
