use anyhow::Result;
use scop_pipeline::{
    config::AppConfig,
    observability,
    stages::{self, system_tables, Snapshot},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let client = stages::client(&cfg)?;
    let snapshot = Snapshot::fetch(&client).await?;
    system_tables::run(&cfg, &snapshot)
}
