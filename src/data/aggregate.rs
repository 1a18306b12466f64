//! Multi-ship aggregation.
//!
//! One summary request is issued per selected ship, all concurrently, and
//! the aggregation waits for every request to settle. Failures are
//! recorded per ship and never abort the others.
//!
//! ## Merge rules
//!
//! ```text
//! sample_type_count    type -> ship -> count      (rollup = sum over ships)
//! purifier/hcu_count   ship -> count              (0 when the category is absent)
//! list categories      concatenated, ship-tagged, ships in selection order
//! ```
//!
//! Output order follows the selection, never network completion order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use super::classify::{classify, Classification};
use super::range::DateRange;
use super::record::SampleRecord;
use super::selection::{MissingInput, Selection};
use crate::error::FetchError;
use crate::source::{ListCategory, ShipSummary, SummarySource};

/// A ship whose fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub ship: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: FetchError,
}

/// Combined view of every selected ship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    /// Selected ships, in selection order.
    pub ships: Vec<String>,
    pub range: DateRange,
    pub issued_at: DateTime<Utc>,
    /// Sample type -> ship -> count.
    pub sample_type_count: BTreeMap<String, BTreeMap<String, u64>>,
    pub purifier_count: BTreeMap<String, u64>,
    pub hcu_count: BTreeMap<String, u64>,
    pub hcu_details: Vec<SampleRecord>,
    pub average_hcu_counts: Vec<SampleRecord>,
    pub filter_average_counts: Vec<SampleRecord>,
    pub filter_sample_details: Vec<SampleRecord>,
    pub failures: Vec<FetchFailure>,
}

impl AggregatedResult {
    fn empty(ships: Vec<String>, range: DateRange, issued_at: DateTime<Utc>) -> Self {
        Self {
            ships,
            range,
            issued_at,
            sample_type_count: BTreeMap::new(),
            purifier_count: BTreeMap::new(),
            hcu_count: BTreeMap::new(),
            hcu_details: Vec::new(),
            average_hcu_counts: Vec::new(),
            filter_average_counts: Vec::new(),
            filter_sample_details: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn list(&self, category: ListCategory) -> &[SampleRecord] {
        match category {
            ListCategory::HcuDetails => &self.hcu_details,
            ListCategory::AverageHcuCounts => &self.average_hcu_counts,
            ListCategory::FilterAverageCounts => &self.filter_average_counts,
            ListCategory::FilterSampleDetails => &self.filter_sample_details,
        }
    }

    fn list_mut(&mut self, category: ListCategory) -> &mut Vec<SampleRecord> {
        match category {
            ListCategory::HcuDetails => &mut self.hcu_details,
            ListCategory::AverageHcuCounts => &mut self.average_hcu_counts,
            ListCategory::FilterAverageCounts => &mut self.filter_average_counts,
            ListCategory::FilterSampleDetails => &mut self.filter_sample_details,
        }
    }

    /// Entries of one ship in one list category, in their original order.
    pub fn records_for<'a>(
        &'a self,
        ship: &'a str,
        category: ListCategory,
    ) -> impl Iterator<Item = &'a SampleRecord> + 'a {
        self.list(category).iter().filter(move |r| r.ship == ship)
    }

    /// Total samples per type across all ships (the pie rollup).
    pub fn sample_type_totals(&self) -> Vec<(String, u64)> {
        self.sample_type_count
            .iter()
            .map(|(sample_type, per_ship)| {
                let total = per_ship.values().copied().fold(0u64, u64::saturating_add);
                (sample_type.clone(), total)
            })
            .collect()
    }

    /// True when at least one ship failed to load.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_ships(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.ship.as_str()).collect()
    }

    /// Ships that answered, in selection order.
    pub fn loaded_ships(&self) -> Vec<&str> {
        self.ships
            .iter()
            .map(String::as_str)
            .filter(|s| !self.failures.iter().any(|f| f.ship == *s))
            .collect()
    }

    /// Classify the filter samples of every loaded ship.
    pub fn classify_filter_samples(&self) -> Classification {
        classify(&self.filter_sample_details)
    }
}

/// Outcome of an aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// The selection is incomplete; no request was issued.
    AwaitingInput(MissingInput),
    Ready(AggregatedResult),
}

impl Aggregation {
    pub fn result(&self) -> Option<&AggregatedResult> {
        match self {
            Aggregation::Ready(result) => Some(result),
            Aggregation::AwaitingInput(_) => None,
        }
    }
}

/// Fetch every selected ship concurrently and merge the settled results.
pub async fn aggregate(source: &dyn SummarySource, selection: &Selection) -> Aggregation {
    let (ships, range) = match selection.validate() {
        Ok(valid) => valid,
        Err(missing) => {
            debug!(?missing, "Selection incomplete, skipping aggregation");
            return Aggregation::AwaitingInput(missing);
        }
    };

    let issued_at = Utc::now();
    info!(
        ships = ships.len(),
        %range,
        source = source.description(),
        "Aggregating ship summaries"
    );

    let fetches = ships.iter().map(|ship| async move {
        let result = source.fetch_summary(ship, &range).await;
        (ship.clone(), result)
    });
    // join_all yields in input order, whatever order the requests finish in
    let settled = join_all(fetches).await;

    Aggregation::Ready(merge(ships.to_vec(), range, issued_at, settled))
}

/// Merge settled per-ship results, in the order given.
pub fn merge(
    ships: Vec<String>,
    range: DateRange,
    issued_at: DateTime<Utc>,
    settled: Vec<(String, Result<ShipSummary, FetchError>)>,
) -> AggregatedResult {
    let mut result = AggregatedResult::empty(ships, range, issued_at);

    for (ship, outcome) in settled {
        match outcome {
            Ok(summary) => merge_ship(&mut result, &ship, summary),
            Err(error) => {
                warn!(%ship, %error, "Failed to fetch ship summary");
                result.failures.push(FetchFailure { ship, error });
            }
        }
    }

    result
}

fn merge_ship(result: &mut AggregatedResult, ship: &str, mut summary: ShipSummary) {
    for (sample_type, count) in std::mem::take(&mut summary.sample_type_count) {
        result
            .sample_type_count
            .entry(sample_type)
            .or_default()
            .insert(ship.to_string(), count);
    }

    result
        .purifier_count
        .insert(ship.to_string(), summary.purifier_count.unwrap_or(0));
    result
        .hcu_count
        .insert(ship.to_string(), summary.hcu_count.unwrap_or(0));

    for category in ListCategory::ALL {
        let records = std::mem::take(summary.list_mut(category));
        result
            .list_mut(category)
            .extend(records.into_iter().map(|mut record| {
                record.ship = ship.to_string();
                record
            }));
    }
}

fn serialize_display<T: std::fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
