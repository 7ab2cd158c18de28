use std::{fs, path::Path};

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::config::MetricsConfig;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder when a textfile target is configured.
/// Without one, the `metrics` macros stay no-ops.
pub fn init(cfg: &MetricsConfig) -> anyhow::Result<()> {
    if cfg.textfile.is_none() || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;
    // Only the first caller gets to set it.
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// Current exposition text, if a recorder is installed.
pub fn render() -> Option<String> {
    PROM_HANDLE.get().map(PrometheusHandle::render)
}

/// Write the exposition to the configured textfile for a node-exporter style
/// collector to pick up.
pub fn write_textfile(cfg: &MetricsConfig) -> anyhow::Result<()> {
    let (Some(path), Some(body)) = (cfg.textfile.as_deref(), render()) else {
        return Ok(());
    };
    write_atomically(path, &body)?;
    tracing::info!(path = %path.display(), "wrote metrics textfile");
    Ok(())
}

fn write_atomically(path: &Path, body: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to move metrics into {}", path.display()))?;
    Ok(())
}
