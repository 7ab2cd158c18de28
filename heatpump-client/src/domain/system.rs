use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;

/// A public heat-pump installation as listed by the monitoring service.
///
/// Only the identifying fields are typed; the ~100 optional descriptive and
/// metering fields (installer, controls, insulation, floor area, ...) are
/// kept verbatim in `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub id: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub hp_output: Value,
    #[serde(default)]
    pub hp_model: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl System {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Numeric value of an optional field, if present and coercible.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(lenient::as_f64)
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }

    pub fn model(&self) -> &str {
        self.hp_model.as_deref().unwrap_or_default()
    }

    /// Rated output as displayed in tables, e.g. `5 kW`.
    pub fn output_label(&self) -> String {
        let output = match &self.hp_output {
            Value::Null => "N/A".to_string(),
            other => lenient::display(other),
        };
        format!("{output} kW")
    }

    pub fn heat_demand(&self) -> Option<f64> {
        self.numeric("heat_demand")
    }

    pub fn floor_area(&self) -> Option<f64> {
        self.numeric("floor_area")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_with_extra_fields() {
        let system: System = serde_json::from_value(json!({
            "id": 44,
            "location": "Bristol",
            "hp_output": 7,
            "hp_model": "Vaillant Arotherm+",
            "floor_area": "120",
            "heat_demand": 12000,
            "heatgeek": 1
        }))
        .unwrap();

        assert_eq!(system.id, 44);
        assert_eq!(system.location(), "Bristol");
        assert_eq!(system.output_label(), "7 kW");
        assert_eq!(system.floor_area(), Some(120.0));
        assert_eq!(system.heat_demand(), Some(12000.0));
        assert_eq!(system.field("heatgeek"), Some(&json!(1)));
    }

    #[test]
    fn tolerates_nulls_in_identifying_fields() {
        let system: System = serde_json::from_value(json!({
            "id": 3,
            "location": null,
            "hp_output": null,
            "hp_model": null
        }))
        .unwrap();

        assert_eq!(system.location(), "");
        assert_eq!(system.model(), "");
        assert_eq!(system.output_label(), "N/A kW");
        assert_eq!(system.floor_area(), None);
    }
}
