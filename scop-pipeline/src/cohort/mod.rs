//! Cohort-level summaries of the SCOP and daily COP tables.

pub mod attributes;
pub mod regression;
pub mod season_summary;

pub use attributes::{attribute_summary, AttributeInputs};
pub use regression::{fit_line, group_regressions, LinearFit, Period};
pub use season_summary::season_summary;

use statrs::statistics::{Data, Median, Statistics};

use crate::table::NA;

/// Count, median and mean of a sample. Median and mean are `None` for an
/// empty sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub median: Option<f64>,
    pub mean: Option<f64>,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                median: None,
                mean: None,
            };
        }
        Self {
            count: values.len(),
            median: Some(Data::new(values.to_vec()).median()),
            mean: Some(values.iter().mean()),
        }
    }
}

pub(crate) fn fmt2(value: Option<f64>) -> String {
    value.map_or_else(|| NA.to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn summary_of_even_and_odd_samples() {
        let odd = Summary::of(&[3.0, 1.0, 2.0]);
        assert_eq!(odd.count, 3);
        assert_relative_eq!(odd.median.unwrap(), 2.0);
        assert_relative_eq!(odd.mean.unwrap(), 2.0);

        let even = Summary::of(&[4.0, 1.0, 3.0, 2.0]);
        assert_relative_eq!(even.median.unwrap(), 2.5);
        assert_relative_eq!(even.mean.unwrap(), 2.5);

        let empty = Summary::of(&[]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.median, None);
        assert_eq!(fmt2(empty.mean), "N/A");
    }
}
