use std::{fs, io, path::Path};

use anyhow::{Context, Result};

use super::daily_scop::{publish, DailyLayout};
use crate::config::AppConfig;
use crate::exclusion::RelocationReport;
use crate::sinks::{daily_file_path, DailyVariant};
use crate::sources::DailyCsvFileSource;

/// IDs of the systems with a saved `_original` file in `dir`, ascending.
pub fn saved_original_ids(dir: &Path) -> io::Result<Vec<u32>> {
    let suffix = format!("_daily_data_{}.csv", DailyVariant::Original.suffix());
    let mut ids: Vec<u32> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            name.strip_prefix("system_")?.strip_suffix(suffix.as_str())?.parse().ok()
        })
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// Rebuild converted/clean/winter files and the SCOP tables from the saved
/// `_original` files, without network access.
pub async fn run(cfg: &AppConfig) -> Result<RelocationReport> {
    let seasons = cfg.season_table()?;
    let layout = DailyLayout::new(cfg, &seasons)?;
    let ids = saved_original_ids(&layout.dir)
        .with_context(|| format!("failed to list {}", layout.dir.display()))?;
    tracing::info!(systems = ids.len(), dir = %layout.dir.display(), "reprocessing saved daily series");

    let mut processed = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(source) = DailyCsvFileSource::open(daily_file_path(&layout.dir, id, DailyVariant::Original))? else {
            continue;
        };
        let headers = source.headers().clone();
        let timestamp_index = source.timestamp_index();
        layout
            .split(id, source, headers, timestamp_index, false)
            .await
            .with_context(|| format!("failed to rebuild daily files for system {id}"))?;
        processed.push(id);
    }

    publish(cfg, &seasons, &processed)
}
