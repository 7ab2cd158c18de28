use anyhow::Result;
use scop_pipeline::{config::AppConfig, metrics_textfile, observability, stages::cohort_summary};

fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::init(metrics_cfg)?;
    }

    cohort_summary::run(&cfg)?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::write_textfile(metrics_cfg)?;
    }
    Ok(())
}
