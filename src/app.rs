//! Dashboard state and refresh sequencing.
//!
//! The dashboard owns the selection and the single "currently displayed"
//! result. A refresh is split in three steps so the network part never
//! borrows the dashboard:
//!
//! ```text
//! begin_refresh()  ──▶ PendingRefresh  (ticket + selection snapshot)
//!                          │ run().await
//!                          ▼
//! complete()       ◀── CompletedRefresh
//! ```
//!
//! Every `begin_refresh` issues a new ticket. `complete` applies a result
//! only if its ticket is the latest one issued, so a slow response to an
//! older selection can never overwrite a newer one.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::data::{aggregate, AggregatedResult, Aggregation, Classification, MissingInput, Selection};
use crate::source::SummarySource;

/// Notice shown when some ships could not be loaded.
pub const PARTIAL_FAILURE_NOTICE: &str = "Failed to load data for some ships.";

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    /// The selection is incomplete; nothing was requested.
    AwaitingInput(MissingInput),
    /// A refresh is in flight.
    Loading,
    /// The latest completed refresh.
    Ready(Arc<AggregatedResult>),
}

/// Identifies one refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket {
    sequence: u64,
    selection_version: u64,
}

impl RequestTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Version of the selection the request was issued for.
    pub fn selection_version(&self) -> u64 {
        self.selection_version
    }
}

/// Monotonic request sequence.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket, superseding every earlier one.
    pub fn issue(&mut self, selection_version: u64) -> RequestTicket {
        self.latest += 1;
        RequestTicket {
            sequence: self.latest,
            selection_version,
        }
    }

    /// True if `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.sequence == self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }
}

/// A refresh that has been issued but not yet run.
#[derive(Debug)]
pub struct PendingRefresh {
    ticket: RequestTicket,
    selection: Selection,
    source: Arc<dyn SummarySource>,
}

impl PendingRefresh {
    pub fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    /// Run the aggregation. Does not touch the dashboard.
    pub async fn run(self) -> CompletedRefresh {
        let aggregation = aggregate(self.source.as_ref(), &self.selection).await;
        CompletedRefresh {
            ticket: self.ticket,
            aggregation,
        }
    }
}

/// A finished refresh waiting to be applied.
#[derive(Debug)]
pub struct CompletedRefresh {
    pub ticket: RequestTicket,
    pub aggregation: Aggregation,
}

/// Dashboard application state.
#[derive(Debug)]
pub struct Dashboard {
    source: Arc<dyn SummarySource>,
    selection: Selection,
    tracker: RequestTracker,
    state: DashboardState,
    /// Selection version the displayed result was requested for.
    displayed_version: Option<u64>,
    ship_options: Vec<String>,
    preferred_ship: Option<String>,
    notice: Option<String>,
}

impl Dashboard {
    /// Create a dashboard over `source` with an initial selection.
    pub fn new(source: Arc<dyn SummarySource>, selection: Selection) -> Self {
        let state = match selection.validate() {
            Ok(_) => DashboardState::Loading,
            Err(missing) => DashboardState::AwaitingInput(missing),
        };
        Self {
            source,
            selection,
            tracker: RequestTracker::new(),
            state,
            displayed_version: None,
            ship_options: Vec::new(),
            preferred_ship: None,
            notice: None,
        }
    }

    /// Ship to select by default once the ship list is known.
    pub fn with_preferred_ship(mut self, ship: impl Into<String>) -> Self {
        self.preferred_ship = Some(ship.into());
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// The displayed result, if one is loaded.
    pub fn result(&self) -> Option<Arc<AggregatedResult>> {
        match &self.state {
            DashboardState::Ready(result) => Some(Arc::clone(result)),
            _ => None,
        }
    }

    /// True when the displayed result was requested for an older selection
    /// than the current one. No result counts as outdated.
    pub fn is_outdated(&self) -> bool {
        self.displayed_version != Some(self.selection.version())
    }

    /// Non-blocking notice for the user, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn ship_options(&self) -> &[String] {
        &self.ship_options
    }

    pub fn select_ships<I, S>(&mut self, ships: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.set_ships(ships);
    }

    pub fn set_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.selection.set_range(start, end);
    }

    /// Issue a new refresh for the current selection.
    ///
    /// Returns `None` when the selection is incomplete; the state then
    /// becomes [`DashboardState::AwaitingInput`] and any notice is kept,
    /// since it usually explains the missing input. A ticket is issued
    /// either way, so any refresh still in flight is now stale.
    pub fn begin_refresh(&mut self) -> Option<PendingRefresh> {
        let ticket = self.tracker.issue(self.selection.version());

        if let Err(missing) = self.selection.validate() {
            debug!(?missing, sequence = ticket.sequence, "Refresh skipped");
            self.state = DashboardState::AwaitingInput(missing);
            return None;
        }

        debug!(
            sequence = ticket.sequence,
            version = ticket.selection_version,
            "Refresh issued"
        );
        self.state = DashboardState::Loading;
        self.notice = None;

        Some(PendingRefresh {
            ticket,
            selection: self.selection.clone(),
            source: Arc::clone(&self.source),
        })
    }

    /// Apply a finished refresh.
    ///
    /// Returns `false` and leaves the state untouched if a newer refresh
    /// has been issued since.
    pub fn complete(&mut self, done: CompletedRefresh) -> bool {
        if !self.tracker.is_current(done.ticket) {
            debug!(
                sequence = done.ticket.sequence,
                latest = self.tracker.latest(),
                "Discarding stale refresh"
            );
            return false;
        }

        if done.ticket.selection_version != self.selection.version() {
            debug!(
                requested = done.ticket.selection_version,
                current = self.selection.version(),
                "Selection changed while refreshing"
            );
        }

        match done.aggregation {
            Aggregation::AwaitingInput(missing) => {
                self.state = DashboardState::AwaitingInput(missing);
                self.displayed_version = None;
            }
            Aggregation::Ready(result) => {
                if result.is_partial() {
                    self.notice = Some(format!(
                        "{} ({})",
                        PARTIAL_FAILURE_NOTICE,
                        result.failed_ships().join(", ")
                    ));
                }
                info!(
                    ships = result.ships.len(),
                    failed = result.failures.len(),
                    "Refresh applied"
                );
                self.state = DashboardState::Ready(Arc::new(result));
                self.displayed_version = Some(done.ticket.selection_version);
            }
        }
        true
    }

    /// Issue, run and apply a refresh in one go.
    pub async fn refresh(&mut self) -> bool {
        match self.begin_refresh() {
            Some(pending) => {
                let done = pending.run().await;
                self.complete(done)
            }
            None => false,
        }
    }

    /// Load the ship list and pick a default ship if none is selected.
    ///
    /// The preferred ship wins when the service knows it, otherwise the
    /// first ship in sorted order. A failure empties both the options and
    /// the selected ships and sets a notice.
    pub async fn load_ship_options(&mut self) -> &[String] {
        match self.source.fetch_ships().await {
            Ok(mut ships) => {
                ships.sort();
                ships.dedup();

                if ships.is_empty() {
                    self.notice = Some("No ships available from the API.".to_string());
                } else if self.selection.ships().is_empty() {
                    let default = self
                        .preferred_ship
                        .as_ref()
                        .filter(|preferred| ships.contains(preferred))
                        .unwrap_or(&ships[0])
                        .clone();
                    info!(ship = %default, "Selecting default ship");
                    self.selection.set_ships([default]);
                }
                self.ship_options = ships;
            }
            Err(err) => {
                warn!(%err, "Failed to fetch ship options");
                self.ship_options.clear();
                self.selection.clear_ships();
                self.notice = Some(format!("Failed to fetch ship options: {}", err));
            }
        }
        &self.ship_options
    }

    /// Classify the filter samples for the current selection.
    ///
    /// With ships selected this uses the displayed result and returns
    /// `None` until one is loaded. With no ship selected the all-ship
    /// endpoint is queried for the selected date range.
    pub async fn classify_filter_samples(&mut self) -> Option<Classification> {
        if !self.selection.ships().is_empty() {
            return self.result().map(|r| r.classify_filter_samples());
        }

        let range = self.selection.range().ok()?;
        match self.source.fetch_filter_sample_details(&range).await {
            Ok(records) => Some(crate::data::classify(&records)),
            Err(err) => {
                warn!(%err, "Failed to fetch filter sample details");
                self.notice = Some(format!("Failed to load filter samples: {}", err));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SamplePoint, SampleRecord};
    use crate::error::FetchError;
    use crate::source::{ShipSummary, StaticSource};
    use std::time::Duration;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, d)
    }

    fn with_purifier(n: u64) -> ShipSummary {
        ShipSummary {
            purifier_count: Some(n),
            ..Default::default()
        }
    }

    fn dashboard(source: StaticSource, ships: &[&str]) -> Dashboard {
        Dashboard::new(
            Arc::new(source),
            Selection::new(ships.iter().copied(), day(1), day(31)),
        )
    }

    #[test]
    fn test_tracker_only_latest_is_current() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue(0);
        assert!(tracker.is_current(first));
        let second = tracker.issue(1);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_refresh_applies_result() {
        let source = StaticSource::new("t").with_summary("A", with_purifier(2));
        let mut dashboard = dashboard(source, &["A"]);

        assert!(dashboard.refresh().await);
        let result = dashboard.result().unwrap();
        assert_eq!(result.purifier_count.get("A"), Some(&2));
        assert!(dashboard.notice().is_none());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let source = StaticSource::new("t")
            .with_summary("A", with_purifier(1))
            .with_summary("B", with_purifier(2));
        let mut dashboard = dashboard(source, &["A"]);

        let first = dashboard.begin_refresh().unwrap();
        dashboard.select_ships(["B"]);
        let second = dashboard.begin_refresh().unwrap();

        let second_done = second.run().await;
        let first_done = first.run().await;

        assert!(dashboard.complete(second_done));
        assert!(!dashboard.complete(first_done));
        assert_eq!(dashboard.result().unwrap().ships, vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_older_request_cannot_overwrite_newer() {
        let source = StaticSource::new("t")
            .with_summary("A", with_purifier(1))
            .with_summary("B", with_purifier(2))
            .with_delay("A", Duration::from_secs(5))
            .with_delay("B", Duration::from_secs(1));
        let mut dashboard = dashboard(source, &["A"]);

        let first = tokio::spawn(dashboard.begin_refresh().unwrap().run());
        dashboard.select_ships(["B"]);
        let second = tokio::spawn(dashboard.begin_refresh().unwrap().run());

        // Apply in arrival order: B lands first, A later
        let (tx, mut rx) = tokio::sync::mpsc::channel(2);
        for handle in [first, second] {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Ok(done) = handle.await {
                    let _ = tx.send(done).await;
                }
            });
        }
        drop(tx);

        let mut applied = Vec::new();
        while let Some(done) = rx.recv().await {
            let sequence = done.ticket.sequence();
            applied.push((sequence, dashboard.complete(done)));
        }

        assert_eq!(applied, vec![(2, true), (1, false)]);
        let result = dashboard.result().unwrap();
        assert_eq!(result.ships, vec!["B"]);
        assert_eq!(result.purifier_count.get("B"), Some(&2));
    }

    #[tokio::test]
    async fn test_incomplete_selection_awaits_input_and_invalidates_in_flight() {
        let source = StaticSource::new("t").with_summary("A", with_purifier(1));
        let mut dashboard = dashboard(source, &["A"]);

        let in_flight = dashboard.begin_refresh().unwrap();
        dashboard.select_ships(Vec::<String>::new());
        assert!(dashboard.begin_refresh().is_none());
        assert_eq!(
            dashboard.state(),
            &DashboardState::AwaitingInput(MissingInput::NoShips)
        );

        let done = in_flight.run().await;
        assert!(!dashboard.complete(done));
        assert!(dashboard.result().is_none());
    }

    #[tokio::test]
    async fn test_partial_failure_sets_notice() {
        let source = StaticSource::new("t")
            .with_summary("A", with_purifier(1))
            .with_failure("B", FetchError::Status(500));
        let mut dashboard = dashboard(source, &["A", "B"]);

        assert!(dashboard.refresh().await);
        let notice = dashboard.notice().unwrap();
        assert!(notice.starts_with(PARTIAL_FAILURE_NOTICE));
        assert!(notice.contains("B"));
        assert_eq!(dashboard.result().unwrap().loaded_ships(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_ship_list_failure_notice_survives_refresh() {
        let source = StaticSource::new("t").with_ship_list_error(FetchError::Timeout);
        let mut dashboard = Dashboard::new(Arc::new(source), Selection::default());

        dashboard.load_ship_options().await;
        assert!(!dashboard.refresh().await);

        assert_eq!(
            dashboard.state(),
            &DashboardState::AwaitingInput(MissingInput::NoShips)
        );
        assert_eq!(
            dashboard.notice(),
            Some("Failed to fetch ship options: Request timed out")
        );
    }

    #[tokio::test]
    async fn test_successful_refresh_clears_old_notice() {
        let source = StaticSource::new("t")
            .with_summary("A", with_purifier(1))
            .with_failure("B", FetchError::Status(500));
        let mut dashboard = dashboard(source, &["A", "B"]);

        dashboard.refresh().await;
        assert!(dashboard.notice().is_some());

        dashboard.select_ships(["A"]);
        dashboard.refresh().await;
        assert!(dashboard.notice().is_none());
    }

    #[tokio::test]
    async fn test_outdated_after_selection_change() {
        let source = StaticSource::new("t")
            .with_summary("A", with_purifier(1))
            .with_summary("B", with_purifier(2));
        let mut dashboard = dashboard(source, &["A"]);
        assert!(dashboard.is_outdated());

        dashboard.refresh().await;
        assert!(!dashboard.is_outdated());

        // selection changes while a refresh is in flight
        let pending = dashboard.begin_refresh().unwrap();
        dashboard.select_ships(["B"]);
        assert!(dashboard.complete(pending.run().await));
        assert_eq!(dashboard.result().unwrap().ships, vec!["A"]);
        assert!(dashboard.is_outdated());

        dashboard.refresh().await;
        assert!(!dashboard.is_outdated());
    }

    #[tokio::test]
    async fn test_load_ship_options_prefers_configured_ship() {
        let source = StaticSource::new("t")
            .with_summary("MSC ZOE", ShipSummary::default())
            .with_summary("MSC CATERINA", ShipSummary::default())
            .with_summary("MSC ANNA", ShipSummary::default());
        let mut dashboard = Dashboard::new(Arc::new(source), Selection::default())
            .with_preferred_ship("MSC CATERINA");

        let options = dashboard.load_ship_options().await.to_vec();
        assert_eq!(options, vec!["MSC ANNA", "MSC CATERINA", "MSC ZOE"]);
        assert_eq!(dashboard.selection().ships(), &["MSC CATERINA"]);
    }

    #[tokio::test]
    async fn test_load_ship_options_falls_back_to_first() {
        let source = StaticSource::new("t")
            .with_summary("B", ShipSummary::default())
            .with_summary("A", ShipSummary::default());
        let mut dashboard = Dashboard::new(Arc::new(source), Selection::default())
            .with_preferred_ship("MSC CATERINA");

        dashboard.load_ship_options().await;
        assert_eq!(dashboard.selection().ships(), &["A"]);
    }

    #[tokio::test]
    async fn test_load_ship_options_keeps_explicit_selection() {
        let source = StaticSource::new("t").with_summary("A", ShipSummary::default());
        let mut dashboard = dashboard(source, &["Z"]);

        dashboard.load_ship_options().await;
        assert_eq!(dashboard.selection().ships(), &["Z"]);
    }

    #[tokio::test]
    async fn test_load_ship_options_failure() {
        let source = StaticSource::new("t").with_ship_list_error(FetchError::Timeout);
        let mut dashboard = dashboard(source, &["A"]);

        assert!(dashboard.load_ship_options().await.is_empty());
        assert!(dashboard.selection().ships().is_empty());
        assert!(dashboard.notice().unwrap().contains("Request timed out"));
    }

    #[tokio::test]
    async fn test_classify_before_and_after_load() {
        let summary = ShipSummary {
            filter_sample_details: vec![
                SampleRecord::new("", SamplePoint::BeforeFilter, 0.0, 20.0, 0.0),
                SampleRecord::new("", SamplePoint::AfterFilter, 0.0, 1.0, 1.0),
            ],
            ..Default::default()
        };
        let source = StaticSource::new("t").with_summary("A", summary);
        let mut dashboard = dashboard(source, &["A"]);

        // not yet loaded
        assert!(dashboard.classify_filter_samples().await.is_none());

        dashboard.refresh().await;
        let classification = dashboard.classify_filter_samples().await.unwrap();
        assert_eq!(classification.exceeded_count, 1);
        assert_eq!(classification.normal_count, 1);
        assert_eq!(classification.exceeded_details[0].record.ship, "A");
    }

    #[tokio::test]
    async fn test_classify_without_ships_uses_all_ship_query() {
        let source = StaticSource::new("t").with_filter_samples(vec![SampleRecord::new(
            "Q",
            SamplePoint::AfterFilter,
            0.0,
            0.0,
            14.0,
        )]);
        let mut dashboard = dashboard(source, &[]);

        let classification = dashboard.classify_filter_samples().await.unwrap();
        assert_eq!(classification.exceeded_count, 1);
    }

    #[tokio::test]
    async fn test_empty_classification_differs_from_not_loaded() {
        let source = StaticSource::new("t").with_summary("A", ShipSummary::default());
        let mut dashboard = dashboard(source, &["A"]);

        assert_eq!(dashboard.classify_filter_samples().await, None);
        dashboard.refresh().await;
        let loaded = dashboard.classify_filter_samples().await;
        assert_eq!(loaded, Some(Classification::default()));
        assert!(loaded.unwrap().is_empty());
    }
}
