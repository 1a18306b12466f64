//! Classification of filter samples against the MAN particle-count limits.
//!
//! Only the 6 and 14 micron bands have limits; the 4 micron count is
//! reported but never compared. A sample exceeds when either band is
//! strictly above the limit for its sample point.

use serde::Serialize;

use super::record::{MicronSize, SamplePoint, SampleRecord};

/// Manufacturer limits for one sample point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Limits {
    pub six_micron: f64,
    pub fourteen_micron: f64,
}

impl Limits {
    pub fn for_size(&self, size: MicronSize) -> Option<f64> {
        match size {
            MicronSize::Four => None,
            MicronSize::Six => Some(self.six_micron),
            MicronSize::Fourteen => Some(self.fourteen_micron),
        }
    }
}

pub const BEFORE_FILTER_LIMITS: Limits = Limits {
    six_micron: 19.0,
    fourteen_micron: 15.0,
};

pub const AFTER_FILTER_LIMITS: Limits = Limits {
    six_micron: 16.0,
    fourteen_micron: 13.0,
};

impl SamplePoint {
    /// Limits applying to this sample point, if it is a filter stage.
    pub fn limits(&self) -> Option<Limits> {
        match self {
            SamplePoint::BeforeFilter => Some(BEFORE_FILTER_LIMITS),
            SamplePoint::AfterFilter => Some(AFTER_FILTER_LIMITS),
            SamplePoint::Other(_) => None,
        }
    }
}

/// One band that went over its limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Violation {
    pub size: MicronSize,
    pub actual: f64,
    pub limit: f64,
}

impl Violation {
    /// How far above the limit the reading is.
    pub fn excess(&self) -> f64 {
        self.actual - self.limit
    }
}

/// A sample that exceeded at least one limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceededSample {
    pub label: String,
    pub record: SampleRecord,
    pub violations: Vec<Violation>,
}

impl ExceededSample {
    pub fn violates(&self, size: MicronSize) -> bool {
        self.violations.iter().any(|v| v.size == size)
    }
}

/// Normal/exceeded partition of a sample sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub normal_count: usize,
    pub exceeded_count: usize,
    pub exceeded_details: Vec<ExceededSample>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.normal_count + self.exceeded_count
    }

    /// True when no samples were classified at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Two-slice distribution for a pie chart.
    pub fn pie(&self) -> [(&'static str, usize); 2] {
        [
            ("Normal Samples", self.normal_count),
            ("Exceeded Limit Samples", self.exceeded_count),
        ]
    }
}

/// Returns the limits `record` violates, in band order.
///
/// Records at an unrecognized sample point never violate anything.
pub fn violations(record: &SampleRecord) -> Vec<Violation> {
    let Some(limits) = record.sample_point.limits() else {
        return Vec::new();
    };

    [MicronSize::Six, MicronSize::Fourteen]
        .into_iter()
        .filter_map(|size| {
            let limit = limits.for_size(size)?;
            let actual = record.count(size);
            (actual > limit).then_some(Violation {
                size,
                actual,
                limit,
            })
        })
        .collect()
}

/// Display label: `"{ship} - {sample point} ({date or N/A})"`.
///
/// A date the service sent but that could not be parsed is shown as sent.
pub fn sample_label(record: &SampleRecord) -> String {
    let date = match (record.test_date, record.raw_test_date()) {
        (Some(d), _) => d.to_string(),
        (None, Some(raw)) => raw.to_string(),
        (None, None) => "N/A".to_string(),
    };
    format!("{} - {} ({})", record.ship, record.sample_point, date)
}

/// Partition `records` into normal and exceeded samples, preserving input order.
pub fn classify(records: &[SampleRecord]) -> Classification {
    let mut result = Classification::default();

    for record in records {
        let violations = violations(record);
        if violations.is_empty() {
            result.normal_count += 1;
        } else {
            result.exceeded_count += 1;
            result.exceeded_details.push(ExceededSample {
                label: sample_label(record),
                record: record.clone(),
                violations,
            });
        }
    }

    result
}
