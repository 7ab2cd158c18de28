use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use crate::sinks::daily_files::{daily_file_path, DailyVariant};

/// System IDs with known metering or instrumentation defects.
///
/// Applied to derived tables after aggregation; raw daily files are only
/// relocated, never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    ids: BTreeSet<u32>,
}

impl ExclusionList {
    pub fn new(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, system_id: u32) -> bool {
        self.ids.contains(&system_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(thiserror::Error, Debug)]
#[error("failed to move files for system {system_id}: {source}")]
pub struct RelocationError {
    pub system_id: u32,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Default)]
pub struct RelocationReport {
    /// Original locations of the files that were moved.
    pub moved: Vec<PathBuf>,
    pub errors: Vec<RelocationError>,
}

/// Move every daily file of an excluded system from `daily_dir` into
/// `daily_dir/<folder>`.
///
/// Only creating the target folder can fail the call; a failed move stops
/// that system's remaining files and is recorded in the report.
pub fn relocate_excluded_files(
    daily_dir: &Path,
    folder: &str,
    exclusion: &ExclusionList,
) -> io::Result<RelocationReport> {
    let target_dir = daily_dir.join(folder);
    fs::create_dir_all(&target_dir)?;

    let mut report = RelocationReport::default();
    for system_id in exclusion.ids() {
        if let Err(source) = move_system_files(daily_dir, &target_dir, system_id, &mut report.moved) {
            tracing::warn!(system_id, error = %source, "failed to relocate daily files");
            metrics::counter!("relocation_errors_total").increment(1);
            report.errors.push(RelocationError { system_id, source });
        }
    }

    tracing::info!(
        moved = report.moved.len(),
        errors = report.errors.len(),
        target = %target_dir.display(),
        "relocated daily files of excluded systems"
    );
    Ok(report)
}

fn move_system_files(
    daily_dir: &Path,
    target_dir: &Path,
    system_id: u32,
    moved: &mut Vec<PathBuf>,
) -> io::Result<()> {
    for variant in DailyVariant::ALL {
        let from = daily_file_path(daily_dir, system_id, variant);
        if !from.exists() {
            continue;
        }
        let Some(name) = from.file_name() else {
            continue;
        };
        fs::rename(&from, target_dir.join(name))?;
        moved.push(from);
    }
    Ok(())
}
