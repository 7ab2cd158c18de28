use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use csv::StringRecord;
use heatpump_client::{domain::EnergyCategory, MonitorClient};
use chrono_tz::Tz;

use super::{write_tables, Snapshot};
use crate::config::AppConfig;
use crate::exclusion::{relocate_excluded_files, ExclusionList, RelocationReport};
use crate::pipeline::{Pipeline, PipelineError, Source};
use crate::season::{compute_row, ScopTables, SeasonTable, SeasonalWindow};
use crate::sinks::{daily_file_path, DailyVariant, DailyVariantSink};
use crate::sources::{load_daily_records, DailyRow, HttpDailySource};
use crate::transform::TimestampNormalization;

/// File names of one category's SCOP tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopTableFiles {
    pub original: String,
    pub clean: String,
    pub annual: String,
}

impl ScopTableFiles {
    pub fn for_category(category: EnergyCategory) -> Self {
        let tag = match category {
            EnergyCategory::Combined => "",
            EnergyCategory::Space => "sh_",
            EnergyCategory::Water => "wh_",
        };
        Self {
            original: format!("system_{tag}scop_original.csv"),
            clean: format!("system_{tag}scop_clean.csv"),
            annual: format!("annual_system_{tag}scop.csv"),
        }
    }
}

/// Where and how the daily series of each system is split into variants.
#[derive(Debug, Clone)]
pub struct DailyLayout {
    pub dir: PathBuf,
    pub full_year: SeasonalWindow,
    pub winter: SeasonalWindow,
    pub timezone: Tz,
}

impl DailyLayout {
    pub fn new(cfg: &AppConfig, seasons: &SeasonTable) -> Result<Self> {
        Ok(Self {
            dir: cfg.output.daily_dir.clone(),
            full_year: seasons.full_year().clone(),
            winter: seasons.find(&cfg.seasons.winter_label)?.clone(),
            timezone: cfg.timezone()?,
        })
    }

    /// Run one system's rows through timestamp normalization into the
    /// variant files.
    pub async fn split<S>(
        &self,
        system_id: u32,
        source: S,
        headers: StringRecord,
        timestamp_index: usize,
        keep_original: bool,
    ) -> Result<(), PipelineError>
    where
        S: Source<DailyRow> + Send + Sync + 'static,
    {
        let mut sink = DailyVariantSink::new(
            &self.dir,
            system_id,
            headers,
            timestamp_index,
            self.full_year.clone(),
            self.winter.clone(),
        );
        if !keep_original {
            sink = sink.without_original();
        }

        let pipeline: Pipeline<_, DailyRow, _> = Pipeline {
            name: format!("daily-{system_id}"),
            source,
            transforms: vec![Arc::new(TimestampNormalization::new(timestamp_index, self.timezone))],
            sink,
        };
        pipeline.run().await
    }
}

/// Download every system's daily series and write its variant files.
/// Returns the IDs whose series was written.
pub async fn download(client: &MonitorClient, layout: &DailyLayout, snapshot: &Snapshot) -> Result<Vec<u32>> {
    let mut written = Vec::new();
    for system in &snapshot.systems {
        let Some(source) = HttpDailySource::fetch(client, system.id).await? else {
            continue;
        };
        let headers = source.headers().clone();
        let timestamp_index = source.timestamp_index();
        layout
            .split(system.id, source, headers, timestamp_index, true)
            .await
            .with_context(|| format!("failed to write daily files for system {}", system.id))?;
        written.push(system.id);
    }
    tracing::info!(systems = written.len(), "downloaded daily series");
    Ok(written)
}

/// SCOP rows for every category from each system's `_clean` file. Systems
/// without a file are skipped.
pub fn aggregate_systems(
    daily_dir: &Path,
    system_ids: &[u32],
    seasons: &SeasonTable,
    exclusion: &ExclusionList,
) -> Result<Vec<(EnergyCategory, ScopTables)>> {
    let mut rows: Vec<Vec<_>> = vec![Vec::new(); EnergyCategory::ALL.len()];
    for &system_id in system_ids {
        let path = daily_file_path(daily_dir, system_id, DailyVariant::Clean);
        let Some(records) = load_daily_records(&path)? else {
            continue;
        };
        for (idx, category) in EnergyCategory::ALL.into_iter().enumerate() {
            rows[idx].push(compute_row(system_id, &records, seasons, category));
        }
    }

    Ok(EnergyCategory::ALL
        .into_iter()
        .zip(rows)
        .map(|(category, rows)| (category, ScopTables::build(rows, exclusion)))
        .collect())
}

pub fn write_scop_tables(
    dir: &Path,
    seasons: &SeasonTable,
    tables: &[(EnergyCategory, ScopTables)],
) -> Result<()> {
    for (category, t) in tables {
        let files = ScopTableFiles::for_category(*category);
        tracing::info!(
            category = %category,
            systems = t.original.len(),
            clean = t.clean.len(),
            annual = t.annual.len(),
            "seasonal SCOP"
        );
        write_tables(
            dir,
            [
                (files.original.as_str(), t.original_table(seasons)),
                (files.clean.as_str(), t.clean_table(seasons)),
                (files.annual.as_str(), t.annual_table(seasons)),
            ],
        )?;
    }
    Ok(())
}

/// Aggregate, publish and then move excluded systems' files aside.
pub fn publish(cfg: &AppConfig, seasons: &SeasonTable, system_ids: &[u32]) -> Result<RelocationReport> {
    let exclusion = cfg.exclusion_list();
    let tables = aggregate_systems(&cfg.output.daily_dir, system_ids, seasons, &exclusion)?;
    write_scop_tables(&cfg.output.dir, seasons, &tables)?;

    let report = relocate_excluded_files(&cfg.output.daily_dir, &cfg.output.metering_error_folder, &exclusion)
        .context("failed to prepare the metering error folder")?;
    for err in &report.errors {
        tracing::error!(system_id = err.system_id, error = %err.source, "daily files left in place");
    }
    Ok(report)
}

/// Download, split, aggregate and publish.
pub async fn run(cfg: &AppConfig, client: &MonitorClient, snapshot: &Snapshot) -> Result<RelocationReport> {
    let seasons = cfg.season_table()?;
    let layout = DailyLayout::new(cfg, &seasons)?;

    let ids = download(client, &layout, snapshot).await?;
    publish(cfg, &seasons, &ids)
}
