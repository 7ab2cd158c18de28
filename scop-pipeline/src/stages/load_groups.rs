use anyhow::Result;

use super::{write_tables, Snapshot};
use crate::classify::Classification;
use crate::config::AppConfig;

pub fn run(cfg: &AppConfig, snapshot: &Snapshot) -> Result<Classification> {
    let classification = Classification::build(&snapshot.systems, &snapshot.stats, &cfg.exclusion_list());
    for (group, members) in &classification.groups {
        tracing::info!(group = %group, count = members.len(), "load group");
    }
    write_tables(&cfg.output.dir, classification.tables())?;
    Ok(classification)
}
