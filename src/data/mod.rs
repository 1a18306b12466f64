//! Data models and processing for ship sampling data.
//!
//! This module turns validated per-ship summaries into a combined,
//! ship-tagged view and classifies filter samples against the MAN limits.
//!
//! ## Submodules
//!
//! - [`record`]: [`SampleRecord`] and [`SamplePoint`], normalized from the wire format
//! - [`range`]: inclusive [`DateRange`] and `YYYY-MM-DD` parsing
//! - [`selection`]: the versioned ship/date [`Selection`]
//! - [`aggregate`]: concurrent per-ship fetch and merge into [`AggregatedResult`]
//! - [`classify`]: MAN limit table and the normal/exceeded partition
//! - [`series`]: chart-ready rows derived from an [`AggregatedResult`]
//!
//! ## Data Flow
//!
//! ```text
//! Selection ──▶ aggregate() ──▶ SummarySource::fetch_summary() × N (concurrent)
//!                    │
//!                    ▼
//!              AggregatedResult ──▶ classify() ──▶ Classification
//!                    │
//!                    └──▶ series::* (chart rows)
//! ```

pub mod aggregate;
pub mod classify;
pub mod range;
pub mod record;
pub mod selection;
pub mod series;

pub use aggregate::{aggregate, merge, AggregatedResult, Aggregation, FetchFailure};
pub use classify::{
    classify, sample_label, violations, Classification, ExceededSample, Limits, Violation,
    AFTER_FILTER_LIMITS, BEFORE_FILTER_LIMITS,
};
pub use range::{parse_day, DateRange};
pub use record::{MicronSize, SamplePoint, SampleRecord};
pub use selection::{MissingInput, Selection};
