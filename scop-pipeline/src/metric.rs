use std::fmt;

use heatpump_client::domain::lenient;

/// Text written for [`Metric::NotAvailable`] in SCOP tables.
pub const NOT_AVAILABLE: &str = "Data not available";

/// A derived quantity that may be missing.
///
/// Used for SCOP results and heat-demand ratios. Arithmetic is only possible
/// on `Value`, so the sentinel can never leak into a sum or a division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    NotAvailable,
}

impl Metric {
    /// `numerator / denominator` when the denominator is strictly positive.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator > 0.0 {
            Metric::Value(numerator / denominator)
        } else {
            Metric::NotAvailable
        }
    }

    /// Lenient parse of a table cell; anything non-numeric is `NotAvailable`.
    pub fn from_text(s: &str) -> Self {
        lenient::parse_f64(s).map_or(Metric::NotAvailable, Metric::Value)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::NotAvailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Metric::Value(_))
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Metric::Value(v) if v > 0.0)
    }

    /// Format with fixed decimals, or `na` for the sentinel.
    pub fn format_fixed(self, decimals: usize, na: &str) -> String {
        match self {
            Metric::Value(v) => format!("{v:.decimals$}"),
            Metric::NotAvailable => na.to_string(),
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Metric::NotAvailable, Metric::Value)
    }
}

/// Full precision (shortest round-trip form) for values, [`NOT_AVAILABLE`] otherwise.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:?}"),
            Metric::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// Round to `decimals` places the way the value is displayed, so filters and
/// bucketing agree with what ends up in the CSV.
pub fn round_display(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}
