use std::collections::HashMap;

use anyhow::Result;
use heatpump_client::domain::EnergyCategory;

use super::daily_scop::ScopTableFiles;
use super::{read_table, write_tables};
use crate::classify::{group_ids, LoadGroup};
use crate::cohort::{attribute_summary, group_regressions, season_summary, AttributeInputs, Period};
use crate::config::AppConfig;
use crate::season::{annual_from_table, rows_from_table, SeasonTable};
use crate::sinks::{daily_file_path, CsvTable};
use crate::sources::load_daily_records;

const SYSTEMS_BY_ID: &str = "all_data_sorted_by_id.csv";

/// Season, attribute and load-group summaries from the tables written by the
/// other stages. A summary whose inputs are missing is skipped.
pub fn run(cfg: &AppConfig) -> Result<()> {
    let seasons = cfg.season_table()?;
    let dir = &cfg.output.dir;

    let mut clean = Vec::new();
    for category in EnergyCategory::ALL {
        if let Some(table) = read_table(&dir.join(ScopTableFiles::for_category(category).clean))? {
            clean.push((category, rows_from_table(&table, &seasons)));
        }
    }
    if !clean.is_empty() {
        write_tables(dir, [("scop_season_summary.csv", season_summary(&clean, &seasons))])?;
    }

    if let Some(table) = attributes(cfg, &seasons)? {
        write_tables(dir, [("scop_by_attribute.csv", table)])?;
    }

    if let Some(table) = regressions(cfg)? {
        write_tables(dir, [("group_cop_regression.csv", table)])?;
    }
    Ok(())
}

fn attributes(cfg: &AppConfig, seasons: &SeasonTable) -> Result<Option<CsvTable>> {
    let dir = &cfg.output.dir;
    let annual = |category| -> Result<Option<Vec<(u32, f64)>>> {
        let table = read_table(&dir.join(ScopTableFiles::for_category(category).annual))?;
        Ok(table.map(|t| annual_from_table(&t, seasons)))
    };

    let (Some(systems), Some(annual_combined), Some(annual_space)) = (
        read_table(&dir.join(SYSTEMS_BY_ID))?,
        annual(EnergyCategory::Combined)?,
        annual(EnergyCategory::Space)?,
    ) else {
        return Ok(None);
    };

    let load_groups = load_groups(cfg)?;
    Ok(Some(attribute_summary(&AttributeInputs {
        systems: &systems,
        annual_combined: &annual_combined,
        annual_space: &annual_space,
        load_groups: &load_groups,
        scop_column: &seasons.full_year().column,
    })))
}

/// Load group of every system listed in a group file.
fn load_groups(cfg: &AppConfig) -> Result<HashMap<u32, LoadGroup>> {
    let mut out = HashMap::new();
    for group in LoadGroup::ALL {
        if let Some(members) = read_table(&cfg.output.dir.join(group.file_name()))? {
            out.extend(group_ids(&members).into_iter().map(|id| (id, group)));
        }
    }
    Ok(out)
}

fn regressions(cfg: &AppConfig) -> Result<Option<CsvTable>> {
    let mut out: Option<CsvTable> = None;

    for group in LoadGroup::ALL {
        let Some(members) = read_table(&cfg.output.dir.join(group.file_name()))? else {
            continue;
        };
        let ids = group_ids(&members);

        for period in Period::ALL {
            let mut series = Vec::with_capacity(ids.len());
            for &id in &ids {
                let path = daily_file_path(&cfg.output.daily_dir, id, period.variant());
                if let Some(records) = load_daily_records(&path)? {
                    series.push(records);
                }
            }

            let table = group_regressions(group, period, &series, &cfg.daily_filter);
            match out.as_mut() {
                Some(acc) => acc.rows.extend(table.rows),
                None => out = Some(table),
            }
        }
    }
    Ok(out)
}
