//! Joined metadata/statistics views of every public system.

use std::{cmp::Ordering, collections::HashMap};

use heatpump_client::domain::{lenient, System, SystemStats};
use serde_json::Value;

use crate::sinks::CsvTable;

pub const NA: &str = "N/A";

pub const LIMITED_HEADERS: [&str; 8] = ["ID", "Location", "Output", "Model", "COP", "FlowT", "OutsideT", "Days"];

/// Extra columns of the detailed view, looked up by API name.
pub const DETAILED_FIELDS: &[&str] = &[
    "installer_name", "installer_url", "installer_logo", "heatgeek", "ultimaterenewables", "heatingacademy",
    "betateach", "youtube", "url", "share", "hp_type", "refrigerant", "dhw_method", "cylinder_volume",
    "dhw_coil_hex_area", "new_radiators", "old_radiators", "fan_coil_radiators", "UFH", "hydraulic_separation",
    "flow_temp", "design_temp", "flow_temp_typical", "wc_curve", "freeze", "zone_number", "space_heat_control_type",
    "dhw_control_type", "dhw_target_temperature", "legionella_frequency", "legionella_target_temperature",
    "property", "floor_area", "heat_demand", "water_heat_demand", "EPC_spaceheat_demand", "EPC_waterheat_demand",
    "heat_loss", "age", "insulation", "kwh_m2", "electricity_tariff", "electricity_tariff_type",
    "electricity_tariff_unit_rate_all", "solar_pv_generation", "solar_pv_self_consumption", "solar_pv_divert",
    "battery_storage_capacity", "mid_metering", "electric_meter", "heat_meter", "metering_inc_boost",
    "metering_inc_central_heating_pumps", "metering_inc_brine_pumps", "metering_inc_controls",
    "indoor_temperature", "notes", "timestamp", "combined_elec_kwh", "combined_heat_kwh", "combined_cop",
    "combined_data_length", "combined_elec_mean", "combined_heat_mean", "combined_flowT_mean",
    "combined_returnT_mean", "combined_outsideT_mean", "combined_roomT_mean", "combined_prc_carnot",
    "combined_cooling_kwh", "running_elec_kwh", "running_heat_kwh", "running_cop", "running_data_length",
    "running_elec_mean", "running_heat_mean", "running_flowT_mean", "running_returnT_mean",
    "running_outsideT_mean", "running_roomT_mean", "running_prc_carnot", "space_elec_kwh", "space_heat_kwh",
    "space_cop", "space_data_length", "space_elec_mean", "space_heat_mean", "space_flowT_mean",
    "space_returnT_mean", "space_outsideT_mean", "space_roomT_mean", "space_prc_carnot", "water_elec_kwh",
    "water_heat_kwh", "water_cop", "water_data_length", "water_elec_mean", "water_heat_mean", "water_flowT_mean",
    "water_returnT_mean", "water_outsideT_mean", "water_roomT_mean", "water_prc_carnot",
    "from_energy_feeds_elec_kwh", "from_energy_feeds_heat_kwh", "from_energy_feeds_cop", "quality_elec",
    "quality_heat", "quality_flowT", "quality_returnT", "quality_outsideT", "quality_roomT",
];

/// A system together with its trailing-year statistics.
#[derive(Debug, Clone, Copy)]
pub struct JoinedSystem<'a> {
    pub system: &'a System,
    pub stats: &'a SystemStats,
}

/// Pair each system with its stats entry. Systems without stats are dropped;
/// metadata order is preserved.
pub fn join<'a>(systems: &'a [System], stats: &'a HashMap<String, SystemStats>) -> Vec<JoinedSystem<'a>> {
    systems
        .iter()
        .filter_map(|system| {
            stats
                .get(&system.id.to_string())
                .map(|stats| JoinedSystem { system, stats })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOrder {
    IdAscending,
    /// By `combined_cop`; systems without a COP always sort last.
    Cop { descending: bool },
}

impl SystemOrder {
    pub fn sort(self, systems: &mut [JoinedSystem<'_>]) {
        match self {
            SystemOrder::IdAscending => systems.sort_by_key(|j| j.system.id),
            SystemOrder::Cop { descending } => systems.sort_by(|a, b| {
                compare_missing_last(a.stats.combined_cop, b.stats.combined_cop, descending)
            }),
        }
    }
}

/// Total order on optional floats with `None` after every value, in either
/// direction. Stable sorts keep ties in input order.
pub fn compare_missing_last(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| NA.to_string(), |v| format!("{v:.decimals$}"))
}

fn limited_row(j: &JoinedSystem<'_>) -> Vec<String> {
    vec![
        j.system.id.to_string(),
        j.system.location().to_string(),
        j.system.output_label(),
        j.system.model().to_string(),
        fixed(j.stats.combined_cop, 2),
        fixed(j.stats.running_flow_t_mean, 1),
        fixed(j.stats.running_outside_t_mean, 1),
        fixed(j.stats.data_days(), 0),
    ]
}

/// Stats first, then metadata. A key present in stats but null is `N/A`
/// even when the metadata has a value.
fn detailed_value(j: &JoinedSystem<'_>, field: &str) -> String {
    let value = match j.stats.get(field) {
        Some(v) => Some(v),
        None => j.system.field(field).cloned(),
    };
    match value {
        None | Some(Value::Null) => NA.to_string(),
        Some(v) => lenient::display(&v),
    }
}

/// Limited (8 column) or detailed view, in the order given. Systems without
/// a combined COP are left out.
pub fn system_table(systems: &[JoinedSystem<'_>], detailed: bool) -> CsvTable {
    let headers = LIMITED_HEADERS
        .iter()
        .chain(if detailed { DETAILED_FIELDS } else { &[] })
        .copied();
    let mut table = CsvTable::new(headers);

    for j in systems.iter().filter(|j| j.stats.combined_cop.is_some()) {
        let mut row = limited_row(j);
        if detailed {
            row.extend(DETAILED_FIELDS.iter().map(|f| detailed_value(j, f)));
        }
        table.push(row);
    }
    table
}

/// The four published system tables, keyed by file name.
pub fn system_tables(systems: &[System], stats: &HashMap<String, SystemStats>) -> Vec<(&'static str, CsvTable)> {
    let joined = join(systems, stats);

    let mut by_cop = joined.clone();
    SystemOrder::Cop { descending: true }.sort(&mut by_cop);
    let mut by_id = joined;
    SystemOrder::IdAscending.sort(&mut by_id);

    vec![
        ("limited_data_sorted_by_cop.csv", system_table(&by_cop, false)),
        ("limited_data_sorted_by_id.csv", system_table(&by_id, false)),
        ("all_data_sorted_by_cop.csv", system_table(&by_cop, true)),
        ("all_data_sorted_by_id.csv", system_table(&by_id, true)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn system(id: u32) -> System {
        serde_json::from_value(json!({
            "id": id,
            "location": format!("Town {id}"),
            "hp_output": 5,
            "hp_model": "Model",
            "heatgeek": 1,
            "notes": "metadata note"
        }))
        .unwrap()
    }

    fn stats(cop: Option<f64>) -> SystemStats {
        serde_json::from_value(json!({
            "combined_cop": cop,
            "running_flowT_mean": 35.04,
            "running_outsideT_mean": null,
            "combined_data_length": 31_536_000,
            "space_cop": 3.9,
            "notes": null
        }))
        .unwrap()
    }

    fn fixture() -> (Vec<System>, HashMap<String, SystemStats>) {
        let systems = vec![system(3), system(1), system(2), system(4)];
        let stats = HashMap::from([
            ("1".to_string(), stats(Some(3.5))),
            ("2".to_string(), stats(None)),
            ("3".to_string(), stats(Some(4.25))),
        ]);
        (systems, stats)
    }

    #[test]
    fn join_drops_systems_without_stats() {
        let (systems, stats) = fixture();
        let ids: Vec<u32> = join(&systems, &stats).iter().map(|j| j.system.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn missing_cop_sorts_last_both_ways() {
        let (systems, stats) = fixture();
        let mut joined = join(&systems, &stats);

        SystemOrder::Cop { descending: true }.sort(&mut joined);
        assert_eq!(joined.iter().map(|j| j.system.id).collect::<Vec<_>>(), vec![3, 1, 2]);
        SystemOrder::Cop { descending: false }.sort(&mut joined);
        assert_eq!(joined.iter().map(|j| j.system.id).collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    #[test]
    fn limited_rows_format_and_skip_missing_cop() {
        let (systems, stats) = fixture();
        let tables = system_tables(&systems, &stats);

        let (name, by_cop) = &tables[0];
        assert_eq!(*name, "limited_data_sorted_by_cop.csv");
        assert_eq!(by_cop.len(), 2);
        assert_eq!(
            by_cop.rows[0],
            vec!["3", "Town 3", "5 kW", "Model", "4.25", "35.0", "N/A", "365"]
        );

        let (_, by_id) = &tables[1];
        assert_eq!(by_id.rows.iter().map(|r| r[0].as_str()).collect::<Vec<_>>(), vec!["1", "3"]);
    }

    #[test]
    fn detailed_lookup_prefers_stats() {
        let (systems, stats) = fixture();
        let tables = system_tables(&systems, &stats);
        let (_, detailed) = &tables[3];

        assert_eq!(detailed.headers.len(), LIMITED_HEADERS.len() + DETAILED_FIELDS.len());
        let row = &detailed.rows[0];
        assert_eq!(detailed.cell(row, "space_cop"), Some("3.9"));
        assert_eq!(detailed.cell(row, "heatgeek"), Some("1"));
        assert_eq!(detailed.cell(row, "notes"), Some("N/A"));
        assert_eq!(detailed.cell(row, "combined_cop"), Some("3.5"));
        assert_eq!(detailed.cell(row, "combined_data_length"), Some("31536000"));
        assert_eq!(detailed.cell(row, "installer_name"), Some("N/A"));
    }
}
