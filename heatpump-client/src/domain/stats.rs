use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;

const COMBINED_COP: &str = "combined_cop";
const RUNNING_FLOW_T_MEAN: &str = "running_flowT_mean";
const RUNNING_OUTSIDE_T_MEAN: &str = "running_outsideT_mean";
const COMBINED_DATA_LENGTH: &str = "combined_data_length";

/// Trailing-365-day statistics for one system, keyed by the system ID string
/// in the service response.
///
/// Every key is kept verbatim in `fields`; the typed fields are numeric views
/// of the handful the pipeline computes with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SystemStats {
    pub combined_cop: Option<f64>,
    pub running_flow_t_mean: Option<f64>,
    pub running_outside_t_mean: Option<f64>,
    /// Seconds of data behind the combined figures.
    pub combined_data_length: Option<f64>,
    pub fields: Map<String, Value>,
}

impl From<Map<String, Value>> for SystemStats {
    fn from(fields: Map<String, Value>) -> Self {
        let numeric = |name: &str| fields.get(name).and_then(lenient::as_f64);
        Self {
            combined_cop: numeric(COMBINED_COP),
            running_flow_t_mean: numeric(RUNNING_FLOW_T_MEAN),
            running_outside_t_mean: numeric(RUNNING_OUTSIDE_T_MEAN),
            combined_data_length: numeric(COMBINED_DATA_LENGTH),
            fields,
        }
    }
}

impl From<SystemStats> for Map<String, Value> {
    fn from(stats: SystemStats) -> Self {
        stats.fields
    }
}

impl SystemStats {
    /// Look up a statistic by its API name, as the service sent it.
    ///
    /// Returns `None` when the key is absent; `Some(Value::Null)` when the
    /// service reported it without a value. The typed statistics always
    /// answer, with null when missing.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.fields.get(name) {
            Some(v) => Some(v.clone()),
            None => matches!(name, COMBINED_COP | RUNNING_FLOW_T_MEAN | RUNNING_OUTSIDE_T_MEAN | COMBINED_DATA_LENGTH)
                .then_some(Value::Null),
        }
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).as_ref().and_then(lenient::as_f64)
    }

    /// Days of data, from `combined_data_length` in seconds.
    pub fn data_days(&self) -> Option<f64> {
        self.combined_data_length.map(|secs| secs / 86_400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_fields_accept_strings_and_nulls() {
        let stats: SystemStats = serde_json::from_value(json!({
            "combined_cop": "3.81",
            "running_flowT_mean": 35.25,
            "running_outsideT_mean": null,
            "combined_data_length": 31536000,
            "space_cop": 3.9
        }))
        .unwrap();

        assert_eq!(stats.combined_cop, Some(3.81));
        assert_eq!(stats.running_flow_t_mean, Some(35.25));
        assert_eq!(stats.running_outside_t_mean, None);
        assert_eq!(stats.data_days(), Some(365.0));
        assert_eq!(stats.numeric("space_cop"), Some(3.9));
    }

    #[test]
    fn get_distinguishes_absent_from_null() {
        let stats: SystemStats = serde_json::from_value(json!({
            "combined_cop": null,
            "water_cop": null
        }))
        .unwrap();

        assert_eq!(stats.get("combined_cop"), Some(Value::Null));
        assert_eq!(stats.get("water_cop"), Some(Value::Null));
        assert_eq!(stats.get("quality_heat"), None);
    }

    #[test]
    fn get_keeps_numbers_as_sent() {
        let stats: SystemStats = serde_json::from_value(json!({
            "combined_cop": "3.81",
            "combined_data_length": 31536000
        }))
        .unwrap();

        assert_eq!(stats.get("combined_data_length"), Some(json!(31536000)));
        assert_eq!(stats.get("combined_cop"), Some(json!("3.81")));
        assert_eq!(stats.get("running_flowT_mean"), Some(Value::Null));
        assert_eq!(stats.data_days(), Some(365.0));
        assert_eq!(serde_json::to_value(&stats).unwrap()["combined_data_length"], json!(31536000));
    }
}
