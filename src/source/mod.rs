//! Data source abstraction for ship sampling data.
//!
//! This module provides a trait-based abstraction over where ship summaries
//! come from: the sampling data service over HTTP, a JSON fixture file, or
//! an in-memory table.

mod file;
mod http;
mod memory;
mod payload;

pub use file::FileSource;
pub use http::{HttpSource, HttpSourceBuilder, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use memory::StaticSource;
pub use payload::{parse_records, parse_ship_list, ListCategory, ShipSummary};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::data::{DateRange, SampleRecord};
use crate::error::FetchError;

/// Trait for fetching sampling data from various sources.
///
/// Every call is independent; the aggregator issues one
/// [`fetch_summary`](SummarySource::fetch_summary) per selected ship
/// concurrently and tolerates individual failures.
///
/// # Example
///
/// ```
/// use shipwatch::{DateRange, ShipSummary, StaticSource, SummarySource};
/// use chrono::NaiveDate;
///
/// # tokio_test::block_on(async {
/// let source = StaticSource::new("demo").with_summary("A", ShipSummary::default());
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let range = DateRange::new(day, day).unwrap();
///
/// assert!(source.fetch_summary("A", &range).await.is_ok());
/// assert!(source.fetch_summary("B", &range).await.is_err());
/// # });
/// ```
#[async_trait]
pub trait SummarySource: Send + Sync + Debug {
    /// Fetch the list of known ships.
    async fn fetch_ships(&self) -> Result<Vec<String>, FetchError>;

    /// Fetch the summary bundle of one ship for a date range.
    async fn fetch_summary(&self, ship: &str, range: &DateRange)
        -> Result<ShipSummary, FetchError>;

    /// Fetch filter sample details of all ships for a date range.
    async fn fetch_filter_sample_details(
        &self,
        range: &DateRange,
    ) -> Result<Vec<SampleRecord>, FetchError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used in logs and in the report header.
    fn description(&self) -> &str;
}
