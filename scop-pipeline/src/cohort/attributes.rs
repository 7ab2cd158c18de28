use std::collections::{BTreeMap, HashMap};

use heatpump_client::domain::lenient;

use super::{fmt2, Summary};
use crate::classify::LoadGroup;
use crate::sinks::CsvTable;
use crate::table::NA;

pub const HEADERS: [&str; 6] = ["Attribute", "Group", "Count", "Median SCOP", "Mean SCOP", "SCOP"];

const WITHOUT: &str = "Without";
const WITH: &str = "With";

/// How an attribute column of the system table is grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    /// 0/1 (or false/true) flag; anything else is skipped.
    Flag,
    /// With when the numeric value is strictly positive, Without otherwise.
    Positive,
    /// The trimmed cell text; empty and `N/A` are skipped.
    Category,
}

/// Which annual SCOP table an attribute is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Combined,
    Space,
}

struct Attribute {
    name: &'static str,
    column: &'static str,
    grouping: Grouping,
    target: Target,
}

const HEAT_GEEK: Attribute =
    Attribute { name: "Heat Geek", column: "heatgeek", grouping: Grouping::Flag, target: Target::Combined };
const ULTIMATE_RENEWABLES: Attribute = Attribute {
    name: "Ultimate Renewables",
    column: "ultimaterenewables",
    grouping: Grouping::Flag,
    target: Target::Combined,
};
const HEATING_ACADEMY: Attribute =
    Attribute { name: "Heating Academy", column: "heatingacademy", grouping: Grouping::Flag, target: Target::Combined };
const INSULATION: Attribute =
    Attribute { name: "Insulation", column: "insulation", grouping: Grouping::Category, target: Target::Combined };

const ATTRIBUTES: [Attribute; 7] = [
    HEAT_GEEK,
    ULTIMATE_RENEWABLES,
    HEATING_ACADEMY,
    Attribute { name: "UFH", column: "UFH", grouping: Grouping::Flag, target: Target::Combined },
    Attribute {
        name: "Solar PV",
        column: "solar_pv_generation",
        grouping: Grouping::Positive,
        target: Target::Combined,
    },
    INSULATION,
    Attribute {
        name: "Space heat control",
        column: "space_heat_control_type",
        grouping: Grouping::Category,
        target: Target::Space,
    },
];

/// Installer-training flags compared cell by cell, row flag first.
const TRAINING_PAIRS: [(Attribute, Attribute); 3] = [
    (HEAT_GEEK, ULTIMATE_RENEWABLES),
    (HEAT_GEEK, HEATING_ACADEMY),
    (ULTIMATE_RENEWABLES, HEATING_ACADEMY),
];

const PAIR_SEPARATOR: &str = " / ";

fn group_of(grouping: Grouping, cell: &str) -> Option<String> {
    let cell = cell.trim();
    match grouping {
        Grouping::Flag => match cell.to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" => Some(WITH.to_string()),
            "0" | "0.0" | "false" => Some(WITHOUT.to_string()),
            _ => None,
        },
        Grouping::Positive => {
            let positive = lenient::parse_f64(cell).is_some_and(|v| v > 0.0);
            Some(if positive { WITH } else { WITHOUT }.to_string())
        }
        Grouping::Category => (!cell.is_empty() && cell != NA).then(|| cell.to_string()),
    }
}

/// The inputs of the attribute comparison: the ID-sorted detailed system
/// table, the annual SCOP per system for combined and space heating, and the
/// load group of each classified system.
pub struct AttributeInputs<'a> {
    pub systems: &'a CsvTable,
    pub annual_combined: &'a [(u32, f64)],
    pub annual_space: &'a [(u32, f64)],
    pub load_groups: &'a HashMap<u32, LoadGroup>,
    /// Column header of the full-year window, echoed into the output.
    pub scop_column: &'a str,
}

/// Annual SCOP of every system with an ID and a SCOP value, keyed by `key`.
fn collect_groups(
    systems: &CsvTable,
    id_idx: usize,
    scop: &HashMap<u32, f64>,
    key: impl Fn(u32, &[String]) -> Option<String>,
) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in &systems.rows {
        let Some(id) = row.get(id_idx).and_then(|c| c.trim().parse::<u32>().ok()) else {
            continue;
        };
        let Some(value) = scop.get(&id) else {
            continue;
        };
        if let Some(group) = key(id, row.as_slice()) {
            groups.entry(group).or_default().push(*value);
        }
    }
    groups
}

fn push_groups(
    table: &mut CsvTable,
    attribute: &str,
    groups: BTreeMap<String, Vec<f64>>,
    flags: bool,
    scop_column: &str,
) {
    let mut ordered: Vec<(String, Vec<f64>)> = groups.into_iter().collect();
    if flags {
        // Without before With, flag by flag.
        ordered.sort_by_key(|(g, _)| g.split(PAIR_SEPARATOR).map(|p| p != WITHOUT).collect::<Vec<_>>());
    }
    for (group, values) in ordered {
        let summary = Summary::of(&values);
        table.push(vec![
            attribute.to_string(),
            group,
            summary.count.to_string(),
            fmt2(summary.median),
            fmt2(summary.mean),
            scop_column.to_string(),
        ]);
    }
}

/// Annual SCOP grouped by installer training, underfloor heating, solar PV,
/// insulation and space-heating control type, then by pairs of training
/// flags and by insulation within each load group. Only systems present in
/// both the system table and the annual table contribute.
pub fn attribute_summary(inputs: &AttributeInputs<'_>) -> CsvTable {
    let mut table = CsvTable::new(HEADERS);
    let systems = inputs.systems;
    let Some(id_idx) = systems.column("ID") else {
        tracing::warn!("system table has no ID column, skipping attribute summary");
        return table;
    };
    let combined: HashMap<u32, f64> = inputs.annual_combined.iter().copied().collect();
    let space: HashMap<u32, f64> = inputs.annual_space.iter().copied().collect();

    for attr in &ATTRIBUTES {
        let Some(col) = systems.column(attr.column) else {
            tracing::debug!(column = attr.column, "attribute column missing");
            continue;
        };
        let scop = match attr.target {
            Target::Combined => &combined,
            Target::Space => &space,
        };
        let groups = collect_groups(systems, id_idx, scop, |_, row| {
            group_of(attr.grouping, row.get(col)?)
        });
        push_groups(&mut table, attr.name, groups, attr.grouping != Grouping::Category, inputs.scop_column);
    }

    for (first, second) in &TRAINING_PAIRS {
        let (Some(a), Some(b)) = (systems.column(first.column), systems.column(second.column)) else {
            continue;
        };
        let groups = collect_groups(systems, id_idx, &combined, |_, row| {
            let ga = group_of(Grouping::Flag, row.get(a)?)?;
            let gb = group_of(Grouping::Flag, row.get(b)?)?;
            Some(format!("{ga}{PAIR_SEPARATOR}{gb}"))
        });
        let name = format!("{} × {}", first.name, second.name);
        push_groups(&mut table, &name, groups, true, inputs.scop_column);
    }

    if let Some(col) = systems.column(INSULATION.column) {
        for load in LoadGroup::ALL {
            let groups = collect_groups(systems, id_idx, &combined, |id, row| {
                if inputs.load_groups.get(&id) != Some(&load) {
                    return None;
                }
                group_of(Grouping::Category, row.get(col)?)
            });
            let name = format!("{} ({})", INSULATION.name, load.label());
            push_groups(&mut table, &name, groups, false, inputs.scop_column);
        }
    }
    table
}
