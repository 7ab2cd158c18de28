use serde::{Deserialize, Deserializer};
use std::{fs, io, path::PathBuf};
use chrono_tz::Tz;
use time::{macros::format_description, Date};

use crate::exclusion::ExclusionList;
use crate::season::{SeasonError, SeasonTable, SeasonalWindow};

const CONFIG_ENV: &str = "SCOP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "scop-config.toml";

fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Date::parse(&raw, format_description!("[year]-[month]-[day]")).map_err(serde::de::Error::custom)
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid seasons: {0}")]
    Seasons(#[from] SeasonError),
    #[error("unknown timezone '{0}'")]
    Timezone(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: heatpump_client::api::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for every report table.
    pub dir: PathBuf,
    /// Directory for the per-system daily files.
    pub daily_dir: PathBuf,
    /// Sub-directory of `daily_dir` receiving files of excluded systems.
    pub metering_error_folder: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            daily_dir: PathBuf::from("system_daily_data"),
            metering_error_folder: "metering_error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub label: String,
    pub column: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub start: Date,
    #[serde(deserialize_with = "deserialize_date")]
    pub end: Date,
}

impl WindowConfig {
    fn new(label: &str, column: &str, start: Date, end: Date) -> Self {
        Self {
            label: label.to_string(),
            column: column.to_string(),
            start,
            end,
        }
    }

    fn to_window(&self) -> SeasonalWindow {
        SeasonalWindow::new(self.label.clone(), self.column.clone(), self.start, self.end)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeasonsConfig {
    pub windows: Vec<WindowConfig>,
    pub full_year: WindowConfig,
    /// Label of the window whose rows go to the `_winter` daily files.
    pub winter_label: String,
    /// IANA timezone the daily epochs are read in, daylight saving included.
    pub timezone: String,
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        use time::macros::date;

        Self {
            windows: vec![
                WindowConfig::new("Summer", "SCOP (Jun 23 to Aug 23)", date!(2023-06-01), date!(2023-09-01)),
                WindowConfig::new("Autumn", "SCOP (Sep 23 to Nov 23)", date!(2023-09-01), date!(2023-12-01)),
                WindowConfig::new("Winter", "SCOP (Dec 23 to Feb 24)", date!(2023-12-01), date!(2024-03-01)),
                WindowConfig::new("Spring", "SCOP (Mar 24 to May 24)", date!(2024-03-01), date!(2024-06-01)),
            ],
            full_year: WindowConfig::new(
                "Full-year",
                "SCOP (Jun 23 to Jun 24)",
                date!(2023-06-01),
                date!(2024-06-01),
            ),
            winter_label: "Winter".to_string(),
            timezone: "Europe/London".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    pub system_ids: Vec<u32>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            system_ids: vec![
                12, 17, 21, 36, 49, 52, 67, 105, 117, 148, 163, 169, 224, 276, 301, 305, 311, 325, 333,
            ],
        }
    }
}

/// Thresholds for the daily COP regression cohorts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DailyFilterConfig {
    pub cop_max: f64,
    pub cop_min_cleanse: f64,
    pub flow_temp_min: f64,
    pub flow_temp_max: f64,
}

impl Default for DailyFilterConfig {
    fn default() -> Self {
        Self {
            cop_max: 6.0,
            cop_min_cleanse: 0.5,
            flow_temp_min: 15.0,
            flow_temp_max: 55.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus text exposition written here at the end of a run.
    pub textfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub output: OutputConfig,
    pub seasons: SeasonsConfig,
    pub exclusion: ExclusionConfig,
    pub daily_filter: DailyFilterConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `$SCOP_CONFIG`, else `scop-config.toml`. A missing default
    /// file yields the built-in defaults; a missing explicit file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let (path, explicit) = match std::env::var(CONFIG_ENV) {
            Ok(p) => (p, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };

        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                return Self::validated(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        tracing::info!(path = %path, "loaded config");
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Self::validated(cfg)
    }

    fn validated(cfg: Self) -> Result<Self, ConfigError> {
        let seasons = cfg.season_table()?;
        seasons.find(&cfg.seasons.winter_label)?;
        cfg.timezone()?;
        Ok(cfg)
    }

    pub fn season_table(&self) -> Result<SeasonTable, SeasonError> {
        SeasonTable::new(
            self.seasons.windows.iter().map(WindowConfig::to_window).collect(),
            self.seasons.full_year.to_window(),
        )
    }

    pub fn exclusion_list(&self) -> ExclusionList {
        ExclusionList::new(self.exclusion.system_ids.iter().copied())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        let name = &self.seasons.timezone;
        name.parse::<Tz>().map_err(|_| ConfigError::Timezone(name.clone()))
    }
}
