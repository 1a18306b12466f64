//! Chart-ready series built from an [`AggregatedResult`].
//!
//! Each function reshapes one part of the aggregated data into the rows a
//! chart consumes. Ships always appear in selection order.

use serde::Serialize;

use super::aggregate::AggregatedResult;
use super::record::{MicronSize, SamplePoint};
use crate::source::ListCategory;

/// A labelled value (pie slice or bar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: u64,
}

impl NamedValue {
    fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Particle counts of one ship at one sample point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipParticleCounts {
    pub ship: String,
    pub count_4: f64,
    pub count_6: f64,
    pub count_14: f64,
}

/// All ships' counts at one sample point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePointGroup {
    pub sample_point: String,
    pub ships: Vec<ShipParticleCounts>,
}

/// Before/after filter averages of one ship for one particle size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeforeAfter {
    pub ship: String,
    pub before: f64,
    pub after: f64,
}

/// One row of the filter average line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicronRow {
    pub micron: MicronSize,
    pub ships: Vec<BeforeAfter>,
}

/// Sample type distribution over all ships, zero totals removed.
pub fn sample_type_distribution(result: &AggregatedResult) -> Vec<NamedValue> {
    result
        .sample_type_totals()
        .into_iter()
        .filter(|(_, total)| *total > 0)
        .map(|(name, total)| NamedValue::new(name, total))
        .collect()
}

/// Purifier and HCU bars per ship, zero values removed.
pub fn purifier_hcu_bars(result: &AggregatedResult) -> Vec<NamedValue> {
    let mut bars = Vec::new();
    for ship in &result.ships {
        let purifier = result.purifier_count.get(ship).copied().unwrap_or(0);
        let hcu = result.hcu_count.get(ship).copied().unwrap_or(0);
        bars.push(NamedValue::new(format!("{} - Purifier", ship), purifier));
        bars.push(NamedValue::new(format!("{} - HCU", ship), hcu));
    }
    bars.retain(|bar| bar.value > 0);
    bars
}

/// Group a particle-count category by sample point.
///
/// Groups appear in first-seen order. Within a group, each ship holds the
/// last entry it reported for that sample point.
pub fn particle_groups(result: &AggregatedResult, category: ListCategory) -> Vec<SamplePointGroup> {
    let records = result.list(category);

    let mut points: Vec<&str> = Vec::new();
    for record in records {
        let label = record.sample_point.label();
        if !points.contains(&label) {
            points.push(label);
        }
    }

    points
        .into_iter()
        .map(|point| {
            let ships = result
                .ships
                .iter()
                .filter_map(|ship| {
                    records
                        .iter()
                        .rev()
                        .find(|r| &r.ship == ship && r.sample_point.label() == point)
                        .map(|r| ShipParticleCounts {
                            ship: ship.clone(),
                            count_4: r.count_4,
                            count_6: r.count_6,
                            count_14: r.count_14,
                        })
                })
                .collect();
            SamplePointGroup {
                sample_point: point.to_string(),
                ships,
            }
        })
        .collect()
}

/// HCU detail entries grouped by sample point.
pub fn hcu_particle_groups(result: &AggregatedResult) -> Vec<SamplePointGroup> {
    particle_groups(result, ListCategory::HcuDetails)
}

/// Average HCU counts grouped by sample point.
pub fn average_hcu_groups(result: &AggregatedResult) -> Vec<SamplePointGroup> {
    particle_groups(result, ListCategory::AverageHcuCounts)
}

/// Before/after filter averages, one row per particle size.
///
/// A ship without a before (or after) entry reports 0 for it.
pub fn filter_average_lines(result: &AggregatedResult) -> Vec<MicronRow> {
    MicronSize::ALL
        .into_iter()
        .map(|micron| {
            let ships = result
                .ships
                .iter()
                .map(|ship| {
                    let value_at = |point: SamplePoint| {
                        result
                            .records_for(ship, ListCategory::FilterAverageCounts)
                            .find(|r| r.sample_point == point)
                            .map_or(0.0, |r| r.count(micron))
                    };
                    BeforeAfter {
                        ship: ship.clone(),
                        before: value_at(SamplePoint::BeforeFilter),
                        after: value_at(SamplePoint::AfterFilter),
                    }
                })
                .collect();
            MicronRow { micron, ships }
        })
        .collect()
}
