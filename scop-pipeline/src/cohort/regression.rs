//! Daily COP against temperature, per load group.

use heatpump_client::domain::{CategoryReading, DailyRecord, EnergyCategory};

use crate::classify::LoadGroup;
use crate::config::DailyFilterConfig;
use crate::sinks::{CsvTable, DailyVariant};

pub const HEADERS: [&str; 9] = [
    "Group",
    "Period",
    "Category",
    "Predictor",
    "Systems",
    "n",
    "Slope",
    "Intercept",
    "R²",
];

/// Which daily file a regression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annual,
    Winter,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Annual, Period::Winter];

    pub fn variant(self) -> DailyVariant {
        match self {
            Period::Annual => DailyVariant::Clean,
            Period::Winter => DailyVariant::Winter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Annual => "Annual",
            Period::Winter => "Winter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predictor {
    FlowTemp,
    OutsideTemp,
    RoomOutsideDelta,
}

impl Predictor {
    fn label(self) -> &'static str {
        match self {
            Predictor::FlowTemp => "Flow temperature",
            Predictor::OutsideTemp => "Outside temperature",
            Predictor::RoomOutsideDelta => "Room-outside difference",
        }
    }

    fn x(self, reading: &CategoryReading) -> Option<f64> {
        match self {
            Predictor::FlowTemp => reading.flow_t_mean,
            Predictor::OutsideTemp => reading.outside_t_mean,
            Predictor::RoomOutsideDelta => reading.room_outside_delta(),
        }
    }
}

const FITS: [(EnergyCategory, Predictor); 7] = [
    (EnergyCategory::Combined, Predictor::FlowTemp),
    (EnergyCategory::Combined, Predictor::OutsideTemp),
    (EnergyCategory::Space, Predictor::FlowTemp),
    (EnergyCategory::Water, Predictor::FlowTemp),
    (EnergyCategory::Combined, Predictor::RoomOutsideDelta),
    (EnergyCategory::Space, Predictor::RoomOutsideDelta),
    (EnergyCategory::Water, Predictor::RoomOutsideDelta),
];

/// Ordinary least squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    /// `None` when `y` is constant.
    pub r_squared: Option<f64>,
}

/// `None` with fewer than two points or when every `x` is equal.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LinearFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (slope * p.0 + intercept)).powi(2))
        .sum();
    let r_squared = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);

    Some(LinearFit {
        n,
        slope,
        intercept,
        r_squared,
    })
}

/// A system whose series has an implausible day is dropped as a whole:
/// combined COP above the ceiling or not positive, or space/water COP above
/// the ceiling. Missing values never disqualify.
pub fn has_invalid_cop(records: &[DailyRecord], filter: &DailyFilterConfig) -> bool {
    records.iter().any(|r| {
        r.combined.cop.is_some_and(|c| c > filter.cop_max || c <= 0.0)
            || r.space.cop.is_some_and(|c| c > filter.cop_max)
            || r.water.cop.is_some_and(|c| c > filter.cop_max)
    })
}

/// Days kept for fitting: combined COP above the cleanse floor, positive
/// space and water COP, and every category's flow temperature in range.
/// A missing value fails the test.
pub fn keep_day(record: &DailyRecord, filter: &DailyFilterConfig) -> bool {
    let flow_ok = |r: &CategoryReading| {
        r.flow_t_mean
            .is_some_and(|t| t >= filter.flow_temp_min && t <= filter.flow_temp_max)
    };
    record.combined.cop.is_some_and(|c| c > filter.cop_min_cleanse)
        && record.space.cop.is_some_and(|c| c > 0.0)
        && record.water.cop.is_some_and(|c| c > 0.0)
        && EnergyCategory::ALL.iter().all(|c| flow_ok(record.reading(*c)))
}

/// Every fit for one group and period.
///
/// `series` holds the daily records of each group member whose file exists.
pub fn group_regressions(
    group: LoadGroup,
    period: Period,
    series: &[Vec<DailyRecord>],
    filter: &DailyFilterConfig,
) -> CsvTable {
    let accepted: Vec<&Vec<DailyRecord>> = series
        .iter()
        .filter(|records| !records.is_empty() && !has_invalid_cop(records, filter))
        .collect();
    let days: Vec<&DailyRecord> = accepted
        .iter()
        .flat_map(|records| records.iter())
        .filter(|r| keep_day(r, filter))
        .collect();
    tracing::info!(
        group = group.label(),
        period = period.label(),
        systems = accepted.len(),
        rejected = series.len() - accepted.len(),
        days = days.len(),
        "fitting daily COP"
    );

    let mut table = CsvTable::new(HEADERS);
    for (category, predictor) in FITS {
        let points: Vec<(f64, f64)> = days
            .iter()
            .filter_map(|d| {
                let reading = d.reading(category);
                Some((predictor.x(reading)?, reading.cop?))
            })
            .collect();

        let fit = fit_line(&points);
        let cell = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format!("{v:.4}"));
        table.push(vec![
            group.label().to_string(),
            period.label().to_string(),
            category.label().to_string(),
            predictor.label().to_string(),
            accepted.len().to_string(),
            points.len().to_string(),
            cell(fit.map(|f| f.slope)),
            cell(fit.map(|f| f.intercept)),
            cell(fit.and_then(|f| f.r_squared)),
        ]);
    }
    table
}
