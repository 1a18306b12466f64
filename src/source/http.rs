//! HTTP data source backed by the sampling data service.
//!
//! ## Endpoints
//!
//! - `GET /api/ships`: ship names, either `{"ships": [...]}` or a bare array
//! - `GET /api/ship-summary?ship=&start_date=&end_date=`: per-ship bundle
//! - `GET /api/filter-sample-details?start_date=&end_date=`: filter samples
//!   of every ship
//!
//! Dates are sent as `YYYY-MM-DD`; the range is inclusive on both ends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::payload::{parse_records, parse_ship_list, ShipSummary};
use super::SummarySource;
use crate::data::{DateRange, SampleRecord};
use crate::error::FetchError;

/// Default endpoint of the data service.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Data source querying the sampling data service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    endpoint: String,
    description: String,
}

impl HttpSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    /// Base URL requests are sent to, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(%url, ?query, "Requesting");

        let response = self.client.get(&url).query(query).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            let ship = query
                .iter()
                .find(|(k, _)| *k == "ship")
                .map(|(_, v)| v.clone());
            if let Some(ship) = ship {
                return Err(FetchError::NotFound(ship));
            }
        }

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(body)
    }
}

#[async_trait]
impl SummarySource for HttpSource {
    async fn fetch_ships(&self) -> Result<Vec<String>, FetchError> {
        let body = self.get_json("/api/ships", &[]).await?;
        parse_ship_list(body)
    }

    async fn fetch_summary(
        &self,
        ship: &str,
        range: &DateRange,
    ) -> Result<ShipSummary, FetchError> {
        let query = [
            ("ship", ship.to_string()),
            ("start_date", range.start_param()),
            ("end_date", range.end_param()),
        ];
        let body = self.get_json("/api/ship-summary", &query).await?;
        ShipSummary::from_response(ship, body)
    }

    async fn fetch_filter_sample_details(
        &self,
        range: &DateRange,
    ) -> Result<Vec<SampleRecord>, FetchError> {
        let query = [
            ("start_date", range.start_param()),
            ("end_date", range.end_param()),
        ];
        let body = self.get_json("/api/filter-sample-details", &query).await?;
        match body {
            Value::Array(_) => Ok(parse_records("filter_sample_details", Some(body))),
            _ => Err(FetchError::Parse(
                "expected a list of filter samples".to_string(),
            )),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Set the service endpoint (e.g., "http://127.0.0.1:5000").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<HttpSource, FetchError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = normalize_endpoint(
            self.endpoint
                .as_deref()
                .unwrap_or(DEFAULT_ENDPOINT),
        );
        let description = format!("http: {}", endpoint);

        Ok(HttpSource {
            client,
            endpoint,
            description,
        })
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}
