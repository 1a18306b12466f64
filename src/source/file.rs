//! File-based data source.
//!
//! Reads ship summaries from a JSON fixture standing in for the data
//! service:
//!
//! ```json
//! {
//!   "ships": {
//!     "MSC ANNA": { "purifier_count": 3, "filter_sample_details": [ ... ] }
//!   },
//!   "filter_sample_details": [ ... ]
//! }
//! ```
//!
//! Each ship entry has the same shape as a `/api/ship-summary` response.
//! The top-level `filter_sample_details` list is optional; without it the
//! all-ship query is answered from the per-ship lists.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::payload::{parse_records, ListCategory, ShipSummary};
use super::SummarySource;
use crate::data::{DateRange, SampleRecord};
use crate::error::FetchError;

/// A data source that reads ship summaries from a JSON fixture file.
///
/// The file is re-read on every request, so edits are picked up by the
/// next refresh. Records carrying a test date outside the requested range
/// are dropped; undated records are always kept.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the fixture path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_fixture(&self) -> Result<Map<String, Value>, FetchError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(FetchError::Parse(
                "fixture must be a JSON object".to_string(),
            )),
        }
    }

    async fn read_ships(&self) -> Result<Map<String, Value>, FetchError> {
        let mut fixture = self.read_fixture().await?;
        match fixture.remove("ships") {
            Some(Value::Object(ships)) => Ok(ships),
            None | Some(Value::Null) => Ok(Map::new()),
            Some(_) => Err(FetchError::Parse(
                "'ships' must map ship names to summaries".to_string(),
            )),
        }
    }
}

#[async_trait]
impl SummarySource for FileSource {
    async fn fetch_ships(&self) -> Result<Vec<String>, FetchError> {
        let mut ships: Vec<String> = self.read_ships().await?.keys().cloned().collect();
        ships.sort();
        Ok(ships)
    }

    async fn fetch_summary(
        &self,
        ship: &str,
        range: &DateRange,
    ) -> Result<ShipSummary, FetchError> {
        let mut ships = self.read_ships().await?;
        let body = ships
            .remove(ship)
            .ok_or_else(|| FetchError::NotFound(ship.to_string()))?;

        let mut summary = ShipSummary::from_response(ship, body)?;
        for category in ListCategory::ALL {
            retain_in_range(summary.list_mut(category), range);
        }
        debug!(ship, path = %self.path.display(), "Loaded summary from fixture");
        Ok(summary)
    }

    async fn fetch_filter_sample_details(
        &self,
        range: &DateRange,
    ) -> Result<Vec<SampleRecord>, FetchError> {
        let mut fixture = self.read_fixture().await?;

        let mut records = match fixture.remove("filter_sample_details") {
            Some(list) => parse_records("filter_sample_details", Some(list)),
            None => {
                let mut all = Vec::new();
                if let Some(Value::Object(ships)) = fixture.remove("ships") {
                    for (ship, body) in ships {
                        let Ok(summary) = ShipSummary::from_response(&ship, body) else {
                            continue;
                        };
                        all.extend(summary.filter_sample_details.into_iter().map(|mut r| {
                            if r.ship.is_empty() {
                                r.ship = ship.clone();
                            }
                            r
                        }));
                    }
                }
                all
            }
        };

        retain_in_range(&mut records, range);
        Ok(records)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

fn retain_in_range(records: &mut Vec<SampleRecord>, range: &DateRange) {
    records.retain(|r| r.test_date.map_or(true, |d| range.contains(d)));
}
