use anyhow::Result;

use super::{write_tables, Snapshot};
use crate::config::AppConfig;
use crate::table;

/// Limited and detailed system views, sorted by COP and by ID.
pub fn run(cfg: &AppConfig, snapshot: &Snapshot) -> Result<()> {
    let tables = table::system_tables(&snapshot.systems, &snapshot.stats);
    write_tables(&cfg.output.dir, tables)
}
