//! In-memory data source.
//!
//! Serves canned per-ship results, optionally after an artificial delay.
//! Useful for demos and for exercising ordering and stale-response
//! handling without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::payload::ShipSummary;
use super::SummarySource;
use crate::data::{DateRange, SampleRecord};
use crate::error::FetchError;

/// A data source answering from an in-memory table.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use shipwatch::{FetchError, ShipSummary, StaticSource};
///
/// let source = StaticSource::new("demo")
///     .with_summary("A", ShipSummary::default())
///     .with_failure("B", FetchError::Timeout)
///     .with_delay("A", Duration::from_millis(20));
/// ```
#[derive(Debug, Default)]
pub struct StaticSource {
    description: String,
    ships: Vec<String>,
    responses: HashMap<String, Result<ShipSummary, FetchError>>,
    delays: HashMap<String, Duration>,
    all_filter_samples: Option<Result<Vec<SampleRecord>, FetchError>>,
    ship_list_error: Option<FetchError>,
    requests: Mutex<Vec<String>>,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new(description: &str) -> Self {
        Self {
            description: format!("memory: {}", description),
            ..Default::default()
        }
    }

    /// Answer requests for `ship` with `summary`.
    pub fn with_summary(mut self, ship: &str, summary: ShipSummary) -> Self {
        self.insert(ship, Ok(summary));
        self
    }

    /// Fail requests for `ship` with `error`.
    pub fn with_failure(mut self, ship: &str, error: FetchError) -> Self {
        self.insert(ship, Err(error));
        self
    }

    /// Delay responses for `ship`.
    pub fn with_delay(mut self, ship: &str, delay: Duration) -> Self {
        self.delays.insert(ship.to_string(), delay);
        self
    }

    /// Answer the all-ship filter sample query with `records`.
    pub fn with_filter_samples(mut self, records: Vec<SampleRecord>) -> Self {
        self.all_filter_samples = Some(Ok(records));
        self
    }

    /// Fail the ship list query with `error`.
    pub fn with_ship_list_error(mut self, error: FetchError) -> Self {
        self.ship_list_error = Some(error);
        self
    }

    /// Ships requested so far, in the order requests started.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn insert(&mut self, ship: &str, response: Result<ShipSummary, FetchError>) {
        if !self.ships.iter().any(|s| s == ship) {
            self.ships.push(ship.to_string());
        }
        self.responses.insert(ship.to_string(), response);
    }

    fn record_request(&self, what: &str) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(what.to_string());
        }
    }
}

#[async_trait]
impl SummarySource for StaticSource {
    async fn fetch_ships(&self) -> Result<Vec<String>, FetchError> {
        match &self.ship_list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.ships.clone()),
        }
    }

    async fn fetch_summary(
        &self,
        ship: &str,
        _range: &DateRange,
    ) -> Result<ShipSummary, FetchError> {
        self.record_request(ship);

        if let Some(delay) = self.delays.get(ship) {
            tokio::time::sleep(*delay).await;
        }

        self.responses
            .get(ship)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(ship.to_string())))
    }

    async fn fetch_filter_sample_details(
        &self,
        _range: &DateRange,
    ) -> Result<Vec<SampleRecord>, FetchError> {
        self.record_request("*");

        if let Some(samples) = &self.all_filter_samples {
            return samples.clone();
        }

        let mut records = Vec::new();
        for ship in &self.ships {
            if let Some(Ok(summary)) = self.responses.get(ship) {
                records.extend(summary.filter_sample_details.iter().cloned().map(|mut r| {
                    r.ship = ship.clone();
                    r
                }));
            }
        }
        Ok(records)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
