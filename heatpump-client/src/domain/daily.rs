use std::fmt;

use csv::StringRecord;
use time::{format_description::BorrowedFormatItem, macros::format_description, PrimitiveDateTime};

use super::lenient::parse_f64;

/// Hour-granularity calendar timestamp used in the normalized daily files,
/// e.g. `2023-12-01 00:00:00`.
pub const HOUR_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Name of the timestamp column in the daily CSV (headers carry a leading space).
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Energy accounting partitions reported by the monitoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyCategory {
    Combined,
    Space,
    Water,
}

impl EnergyCategory {
    pub const ALL: [EnergyCategory; 3] = [Self::Combined, Self::Space, Self::Water];

    /// Column prefix in the daily CSV (`combined_elec_kwh`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::Space => "space",
            Self::Water => "water",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Combined => "Combined",
            Self::Space => "Space heating",
            Self::Water => "Water heating",
        }
    }
}

impl fmt::Display for EnergyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One category's readings for a single day. Every value is optional because
/// the service leaves cells empty for unmetered circuits.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryReading {
    pub elec_kwh: Option<f64>,
    pub heat_kwh: Option<f64>,
    pub cop: Option<f64>,
    pub flow_t_mean: Option<f64>,
    pub outside_t_mean: Option<f64>,
    pub room_t_mean: Option<f64>,
}

impl CategoryReading {
    /// Consumed and delivered energy, if both were recorded.
    pub fn energy(&self) -> Option<(f64, f64)> {
        Some((self.elec_kwh?, self.heat_kwh?))
    }

    pub fn room_outside_delta(&self) -> Option<f64> {
        Some(self.room_t_mean? - self.outside_t_mean?)
    }
}

/// A normalized row of a per-system daily series.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub timestamp: PrimitiveDateTime,
    pub combined: CategoryReading,
    pub space: CategoryReading,
    pub water: CategoryReading,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DailyRecordError {
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },
}

impl DailyRecord {
    pub fn reading(&self, category: EnergyCategory) -> &CategoryReading {
        match category {
            EnergyCategory::Combined => &self.combined,
            EnergyCategory::Space => &self.space,
            EnergyCategory::Water => &self.water,
        }
    }

    /// Build a record from a normalized daily CSV row.
    ///
    /// Header names are matched after trimming. The timestamp must already be
    /// in [`HOUR_FORMAT`]; numeric cells that are empty or malformed are kept
    /// as `None`.
    pub fn from_csv(headers: &StringRecord, record: &StringRecord) -> Result<Self, DailyRecordError> {
        let get = |name: &str| -> Option<&str> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|idx| record.get(idx))
        };

        let ts_str = get(TIMESTAMP_COLUMN)
            .ok_or_else(|| DailyRecordError::MissingColumn(TIMESTAMP_COLUMN.to_string()))?;
        let timestamp = PrimitiveDateTime::parse(ts_str.trim(), HOUR_FORMAT).map_err(|e| {
            DailyRecordError::InvalidTimestamp {
                value: ts_str.to_string(),
                message: e.to_string(),
            }
        })?;

        let reading = |category: EnergyCategory| {
            let p = category.prefix();
            let num = |suffix: &str| get(&format!("{p}_{suffix}")).and_then(parse_f64);
            CategoryReading {
                elec_kwh: num("elec_kwh"),
                heat_kwh: num("heat_kwh"),
                cop: num("cop"),
                flow_t_mean: num("flowT_mean"),
                outside_t_mean: num("outsideT_mean"),
                room_t_mean: num("roomT_mean"),
            }
        };

        Ok(Self {
            timestamp,
            combined: reading(EnergyCategory::Combined),
            space: reading(EnergyCategory::Space),
            water: reading(EnergyCategory::Water),
        })
    }
}
