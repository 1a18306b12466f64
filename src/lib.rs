//! # shipwatch
//!
//! Aggregates ship maintenance sampling data and flags filter samples that
//! exceed the manufacturer's (MAN) particle count limits.
//!
//! A sampling data service reports, per ship and date range, sample type
//! counts, purifier and HCU counts and particle-count lists. This crate
//! fetches those summaries for several ships concurrently, merges them into
//! one ship-tagged view, and classifies filter samples against the limit
//! table.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Dashboard                           │
//! │  ┌──────────┐    ┌────────────┐    ┌──────────┐   ┌────────┐ │
//! │  │   app    │───▶│    data    │───▶│  report  │──▶│ stdout │ │
//! │  │ (state)  │    │ (aggregate │    │ (text /  │   │ / file │ │
//! │  └────┬─────┘    │  classify) │    │  json)   │   └────────┘ │
//! │       │          └────────────┘    └──────────┘              │
//! │       ▼                                                      │
//! │  ┌──────────┐                                                │
//! │  │  source  │◀── HttpSource | FileSource | StaticSource      │
//! │  │ (input)  │                                                │
//! │  └──────────┘                                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Selection, refresh sequencing and the displayed result
//! - **[`source`]**: Data source abstraction ([`SummarySource`] trait) with
//!   implementations for the HTTP service, JSON fixtures and in-memory data
//! - **[`data`]**: Records, aggregation into [`AggregatedResult`], MAN limit
//!   classification and chart series
//! - **[`report`]**: Text report and JSON export
//! - **[`config`]**: Layered [`Settings`]
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Last 30 days for the default ship
//! shipwatch
//!
//! # Two ships, explicit range, JSON on stdout
//! shipwatch --ships "MSC ANNA,MSC ZOE" --start 2024-01-01 --end 2024-03-31 --json
//!
//! # Offline, from a fixture file
//! shipwatch --file fixture.json --export report.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use shipwatch::{Dashboard, Selection, ShipSummary, StaticSource};
//!
//! # tokio_test::block_on(async {
//! let source = StaticSource::new("demo")
//!     .with_summary("A", ShipSummary { purifier_count: Some(3), ..Default::default() })
//!     .with_summary("B", ShipSummary { purifier_count: Some(1), ..Default::default() });
//!
//! let selection = Selection::new(
//!     ["A", "B"],
//!     NaiveDate::from_ymd_opt(2024, 1, 1),
//!     NaiveDate::from_ymd_opt(2024, 1, 31),
//! );
//! let mut dashboard = Dashboard::new(Arc::new(source), selection);
//!
//! assert!(dashboard.refresh().await);
//! let result = dashboard.result().unwrap();
//! assert_eq!(result.purifier_count["A"], 3);
//! # });
//! ```
//!
//! ### Overlapping refreshes
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use shipwatch::{Dashboard, Selection, ShipSummary, StaticSource};
//!
//! # tokio_test::block_on(async {
//! let source = StaticSource::new("demo")
//!     .with_summary("A", ShipSummary::default())
//!     .with_summary("B", ShipSummary::default());
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1);
//! let mut dashboard = Dashboard::new(Arc::new(source), Selection::new(["A"], day, day));
//!
//! let first = dashboard.begin_refresh().unwrap();
//! dashboard.select_ships(["B"]);
//! let second = dashboard.begin_refresh().unwrap();
//!
//! assert!(dashboard.complete(second.run().await));
//! // the older refresh finished last and is dropped
//! assert!(!dashboard.complete(first.run().await));
//! assert_eq!(dashboard.result().unwrap().ships, vec!["B"]);
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod source;

// Re-export main types for convenience
pub use app::{Dashboard, DashboardState, PendingRefresh, RequestTicket, RequestTracker};
pub use config::Settings;
pub use data::{
    aggregate, classify, AggregatedResult, Aggregation, Classification, DateRange, MicronSize,
    MissingInput, SamplePoint, SampleRecord, Selection,
};
pub use error::FetchError;
pub use report::Report;
pub use source::{FileSource, HttpSource, ShipSummary, StaticSource, SummarySource};
