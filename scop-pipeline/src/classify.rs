//! Heat demand per floor area and the four load bands.

use std::{collections::HashMap, fmt};

use heatpump_client::domain::{lenient, System, SystemStats};
use serde_json::Value;

use crate::exclusion::ExclusionList;
use crate::metric::{round_display, Metric};
use crate::sinks::CsvTable;
use crate::table::{compare_missing_last, NA};

pub const HEADERS: [&str; 11] = [
    "ID",
    "Location",
    "Output",
    "Model",
    "COP",
    "FlowT",
    "OutsideT",
    "Days",
    "Heat Demand",
    "Floor Area",
    "Heat Demand/Floor Area",
];

/// Annual space-heating demand per floor area, in kWh/m²/yr, rounded to two
/// decimals. `NotAvailable` unless both inputs are numeric and the floor area
/// is strictly positive.
pub fn heat_demand_per_floor_area(heat_demand: Option<f64>, floor_area: Option<f64>) -> Metric {
    match (heat_demand, floor_area) {
        (Some(demand), Some(area)) if area > 0.0 => Metric::Value(round_display(demand / area, 2)),
        _ => Metric::NotAvailable,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadGroup {
    Minimal,
    Moderate,
    High,
    Excessive,
}

impl LoadGroup {
    pub const ALL: [LoadGroup; 4] = [Self::Minimal, Self::Moderate, Self::High, Self::Excessive];

    /// Band boundaries are 50, 100 and 200; each lower bound is inclusive.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 50.0 {
            Self::Minimal
        } else if ratio < 100.0 {
            Self::Moderate
        } else if ratio < 200.0 {
            Self::High
        } else {
            Self::Excessive
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal Load",
            Self::Moderate => "Moderate Load",
            Self::High => "High Load",
            Self::Excessive => "Excessive Load",
        }
    }

    pub fn range_label(self) -> &'static str {
        match self {
            Self::Minimal => "<50 kWh/m²",
            Self::Moderate => "50-100 kWh/m²",
            Self::High => "100-200 kWh/m²",
            Self::Excessive => ">200 kWh/m²",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Minimal => "less_than_50_group.csv",
            Self::Moderate => "bet_50_100_group.csv",
            Self::High => "bet_100_200_group.csv",
            Self::Excessive => "more_than_200_group.csv",
        }
    }
}

impl fmt::Display for LoadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.range_label())
    }
}

/// One row of the classification table. Numeric columns hold the values as
/// displayed (rounded), so filtering and sorting agree with the CSV text.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSystem {
    pub id: u32,
    pub location: String,
    pub output: String,
    pub model: String,
    pub cop: Option<f64>,
    pub flow_t: Option<f64>,
    pub outside_t: Option<f64>,
    pub days: Option<f64>,
    pub heat_demand: String,
    pub floor_area: String,
    pub ratio: Metric,
}

impl ClassifiedSystem {
    pub fn new(system: &System, stats: Option<&SystemStats>) -> Self {
        let rounded = |v: Option<f64>, decimals| v.map(|v| round_display(v, decimals));
        // Absent fields read N/A; a null value stays an empty cell.
        let raw = |name: &str| match system.field(name) {
            None => NA.to_string(),
            Some(Value::Null) => String::new(),
            Some(value) => lenient::display(value),
        };

        Self {
            id: system.id,
            location: system.location().to_string(),
            output: system.output_label(),
            model: system.model().to_string(),
            cop: rounded(stats.and_then(|s| s.combined_cop), 2),
            flow_t: rounded(stats.and_then(|s| s.running_flow_t_mean), 1),
            outside_t: rounded(stats.and_then(|s| s.running_outside_t_mean), 1),
            days: rounded(stats.and_then(SystemStats::data_days), 0),
            heat_demand: raw("heat_demand"),
            floor_area: raw("floor_area"),
            ratio: heat_demand_per_floor_area(system.heat_demand(), system.floor_area()),
        }
    }

    pub fn group(&self) -> Option<LoadGroup> {
        self.ratio.value().map(LoadGroup::from_ratio)
    }

    /// Has a non-zero ratio, a positive COP and a positive flow temperature,
    /// and is not on the exclusion list.
    pub fn is_eligible(&self, exclusion: &ExclusionList) -> bool {
        !exclusion.contains(self.id)
            && matches!(self.ratio, Metric::Value(r) if r != 0.0)
            && self.cop.is_some_and(|c| c > 0.0)
            && self.flow_t.is_some_and(|t| t > 0.0)
    }

    pub fn to_record(&self) -> Vec<String> {
        let fixed = |v: Option<f64>, decimals: usize| Metric::from(v).format_fixed(decimals, NA);
        vec![
            self.id.to_string(),
            self.location.clone(),
            self.output.clone(),
            self.model.clone(),
            fixed(self.cop, 2),
            fixed(self.flow_t, 1),
            fixed(self.outside_t, 1),
            fixed(self.days, 0),
            self.heat_demand.clone(),
            self.floor_area.clone(),
            self.ratio.format_fixed(2, NA),
        ]
    }
}

/// Every metadata system, with stats where the service has them.
pub fn classify_systems(systems: &[System], stats: &HashMap<String, SystemStats>) -> Vec<ClassifiedSystem> {
    systems
        .iter()
        .map(|s| ClassifiedSystem::new(s, stats.get(&s.id.to_string())))
        .collect()
}

pub fn sort_by_cop_desc(rows: &mut [ClassifiedSystem]) {
    rows.sort_by(|a, b| compare_missing_last(a.cop, b.cop, true));
}

pub fn sort_by_ratio_desc(rows: &mut [ClassifiedSystem]) {
    rows.sort_by(|a, b| compare_missing_last(a.ratio.value(), b.ratio.value(), true));
}

/// Eligible systems split into the four bands, each ascending by ratio.
/// Every band is present, possibly empty.
pub fn group_by_load(rows: &[ClassifiedSystem]) -> Vec<(LoadGroup, Vec<ClassifiedSystem>)> {
    LoadGroup::ALL
        .into_iter()
        .map(|group| {
            let mut members: Vec<ClassifiedSystem> =
                rows.iter().filter(|r| r.group() == Some(group)).cloned().collect();
            members.sort_by(|a, b| compare_missing_last(a.ratio.value(), b.ratio.value(), false));
            (group, members)
        })
        .collect()
}

pub fn to_table(rows: &[ClassifiedSystem]) -> CsvTable {
    let mut table = CsvTable::new(HEADERS);
    for row in rows {
        table.push(row.to_record());
    }
    table
}

/// Every table of the load classification, keyed by file name, in write order.
#[derive(Debug, Clone)]
pub struct Classification {
    pub by_cop: Vec<ClassifiedSystem>,
    pub by_ratio: Vec<ClassifiedSystem>,
    pub clean: Vec<ClassifiedSystem>,
    pub groups: Vec<(LoadGroup, Vec<ClassifiedSystem>)>,
}

impl Classification {
    pub fn build(systems: &[System], stats: &HashMap<String, SystemStats>, exclusion: &ExclusionList) -> Self {
        let all = classify_systems(systems, stats);

        let mut by_cop = all.clone();
        sort_by_cop_desc(&mut by_cop);
        let mut by_ratio = all;
        sort_by_ratio_desc(&mut by_ratio);

        let clean: Vec<ClassifiedSystem> = by_ratio.iter().filter(|r| r.is_eligible(exclusion)).cloned().collect();
        let groups = group_by_load(&clean);

        Self {
            by_cop,
            by_ratio,
            clean,
            groups,
        }
    }

    pub fn tables(&self) -> Vec<(&'static str, CsvTable)> {
        let mut tables = vec![
            ("data_sorted_by_cop.csv", to_table(&self.by_cop)),
            ("data_sorted_by_heat_demand_per_floor_area.csv", to_table(&self.by_ratio)),
            ("classify_clean.csv", to_table(&self.clean)),
        ];
        tables.extend(self.groups.iter().map(|(g, rows)| (g.file_name(), to_table(rows))));
        tables
    }
}

/// System IDs listed in a load-group CSV.
pub fn group_ids(table: &CsvTable) -> Vec<u32> {
    let Some(idx) = table.column("ID") else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|r| r.get(idx)?.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn system(id: u32, heat_demand: serde_json::Value, floor_area: serde_json::Value) -> System {
        serde_json::from_value(json!({
            "id": id,
            "location": "Somewhere",
            "hp_output": 6,
            "hp_model": "Model",
            "heat_demand": heat_demand,
            "floor_area": floor_area
        }))
        .unwrap()
    }

    fn stats(cop: f64, flow: f64) -> SystemStats {
        serde_json::from_value(json!({
            "combined_cop": cop,
            "running_flowT_mean": flow,
            "running_outsideT_mean": 8.0,
            "combined_data_length": 864_000.0
        }))
        .unwrap()
    }

    #[test]
    fn ratio_rounds_and_guards_floor_area() {
        assert_eq!(heat_demand_per_floor_area(Some(12000.0), Some(120.0)), Metric::Value(100.0));
        assert_eq!(heat_demand_per_floor_area(Some(1000.0), Some(3.0)), Metric::Value(333.33));
        assert_eq!(heat_demand_per_floor_area(Some(1000.0), Some(0.0)), Metric::NotAvailable);
        assert_eq!(heat_demand_per_floor_area(None, Some(100.0)), Metric::NotAvailable);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(LoadGroup::from_ratio(49.99), LoadGroup::Minimal);
        assert_eq!(LoadGroup::from_ratio(50.0), LoadGroup::Moderate);
        assert_eq!(LoadGroup::from_ratio(100.0), LoadGroup::High);
        assert_eq!(LoadGroup::from_ratio(200.0), LoadGroup::Excessive);
        assert_eq!(LoadGroup::from_ratio(-5.0), LoadGroup::Minimal);
    }

    #[test]
    fn twelve_thousand_over_one_twenty_is_high_load() {
        let s = system(7, json!(12000), json!("120"));
        let row = ClassifiedSystem::new(&s, Some(&stats(3.2, 40.0)));
        assert_eq!(row.group(), Some(LoadGroup::High));
        assert_eq!(row.to_record()[10], "100.00");
        assert_eq!(row.to_record()[7], "10");
        assert_eq!(row.group().unwrap().label(), "High Load");
    }

    #[test]
    fn null_inputs_are_blank_and_absent_inputs_are_na() {
        let nulls = ClassifiedSystem::new(&system(5, json!(null), json!(null)), None).to_record();
        assert_eq!(nulls[8], "");
        assert_eq!(nulls[9], "");
        assert_eq!(nulls[10], "N/A");

        let absent: System = serde_json::from_value(json!({"id": 6, "location": "Somewhere"})).unwrap();
        let record = ClassifiedSystem::new(&absent, None).to_record();
        assert_eq!(record[8], "N/A");
        assert_eq!(record[9], "N/A");
    }

    #[test]
    fn eligibility() {
        let ok = ClassifiedSystem::new(&system(1, json!(5000), json!(100)), Some(&stats(3.0, 40.0)));
        assert!(ok.is_eligible(&ExclusionList::default()));
        assert!(!ok.is_eligible(&ExclusionList::new([1])));

        let no_stats = ClassifiedSystem::new(&system(2, json!(5000), json!(100)), None);
        assert!(!no_stats.is_eligible(&ExclusionList::default()));
        assert_eq!(no_stats.to_record()[4], "N/A");

        let zero_ratio = ClassifiedSystem::new(&system(3, json!(0), json!(100)), Some(&stats(3.0, 40.0)));
        assert!(!zero_ratio.is_eligible(&ExclusionList::default()));

        // 0.001 displays as 0.00 and is treated as such.
        let tiny_cop = ClassifiedSystem::new(&system(4, json!(5000), json!(100)), Some(&stats(0.001, 40.0)));
        assert!(!tiny_cop.is_eligible(&ExclusionList::default()));
    }

    #[test]
    fn classification_is_idempotent_and_respects_exclusions() {
        let systems = vec![
            system(12, json!(9000), json!(100)),
            system(20, json!(4000), json!(100)),
            system(21, json!(4500), json!(100)),
            system(30, json!(25000), json!(100)),
            system(31, json!("n/a"), json!(100)),
        ];
        let stats = HashMap::from([
            ("12".to_string(), stats(3.0, 40.0)),
            ("20".to_string(), stats(4.0, 35.0)),
            ("21".to_string(), stats(3.5, 38.0)),
            ("30".to_string(), stats(2.5, 50.0)),
            ("31".to_string(), stats(3.1, 45.0)),
        ]);
        let exclusion = ExclusionList::new([12]);

        let first = Classification::build(&systems, &stats, &exclusion);
        let second = Classification::build(&systems, &stats, &exclusion);
        assert_eq!(first.tables(), second.tables());

        let ids = |rows: &[ClassifiedSystem]| rows.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(&first.by_cop), vec![20, 21, 31, 12, 30]);
        assert_eq!(ids(&first.by_ratio), vec![30, 12, 21, 20, 31]);
        assert_eq!(ids(&first.clean), vec![30, 21, 20]);

        let groups: Vec<(LoadGroup, Vec<u32>)> = first.groups.iter().map(|(g, r)| (*g, ids(r))).collect();
        assert_eq!(
            groups,
            vec![
                (LoadGroup::Minimal, vec![20, 21]),
                (LoadGroup::Moderate, vec![]),
                (LoadGroup::High, vec![]),
                (LoadGroup::Excessive, vec![30]),
            ]
        );
        assert_eq!(first.tables().len(), 7);
        assert_eq!(group_ids(&to_table(&first.groups[0].1)), vec![20, 21]);
    }
}
