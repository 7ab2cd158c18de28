use anyhow::Result;
use scop_pipeline::{
    config::AppConfig,
    observability,
    stages::{self, load_groups, Snapshot},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let client = stages::client(&cfg)?;
    let snapshot = Snapshot::fetch(&client).await?;
    let classification = load_groups::run(&cfg, &snapshot)?;
    tracing::info!(
        classified = classification.by_cop.len(),
        clean = classification.clean.len(),
        "classified systems by heat demand per floor area"
    );
    Ok(())
}
