//! Sample records as delivered by the sampling data service.
//!
//! The service is loosely typed: the same measurement can arrive with
//! `Particle_Count_*` or `Average_Particle_Count_*` names, counts may be
//! numbers, numeric strings or null, and dates come in several formats.
//! [`SampleRecord`] normalizes all of that once, at the boundary, and keeps
//! every field it does not understand in [`SampleRecord::extra`].

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SHIP_KEYS: &[&str] = &["Ship", "ship"];
const SAMPLE_POINT_KEYS: &[&str] = &["Sample_Point", "vlims_lo_samp_point_Desc", "sample_point"];
const DATE_KEYS: &[&str] = &["Test_Date", "Sample_Date"];

/// Particle size bands reported by the laboratory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MicronSize {
    #[serde(rename = "4 Micron")]
    Four,
    #[serde(rename = "6 Micron")]
    Six,
    #[serde(rename = "14 Micron")]
    Fourteen,
}

impl MicronSize {
    /// All sizes, smallest first.
    pub const ALL: [MicronSize; 3] = [MicronSize::Four, MicronSize::Six, MicronSize::Fourteen];

    pub fn microns(self) -> u32 {
        match self {
            MicronSize::Four => 4,
            MicronSize::Six => 6,
            MicronSize::Fourteen => 14,
        }
    }

    /// Returns the display label, e.g. `"6 Micron"`.
    pub fn label(self) -> &'static str {
        match self {
            MicronSize::Four => "4 Micron",
            MicronSize::Six => "6 Micron",
            MicronSize::Fourteen => "14 Micron",
        }
    }

    fn wire_keys(self) -> [&'static str; 2] {
        match self {
            MicronSize::Four => ["Particle_Count_4_Micron", "Average_Particle_Count_4_Micron"],
            MicronSize::Six => ["Particle_Count_6_Micron", "Average_Particle_Count_6_Micron"],
            MicronSize::Fourteen => {
                ["Particle_Count_14_Micron", "Average_Particle_Count_14_Micron"]
            }
        }
    }
}

impl fmt::Display for MicronSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a sample was drawn relative to the filter.
///
/// HCU records use free-form sample point names, so anything that is not
/// one of the two filter stages is kept as [`SamplePoint::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SamplePoint {
    BeforeFilter,
    AfterFilter,
    Other(String),
}

impl SamplePoint {
    /// Parse a wire label. Matching is case-insensitive and treats `_` as a space.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().replace('_', " ").to_ascii_uppercase();
        match normalized.as_str() {
            "BEFORE FILTER" => SamplePoint::BeforeFilter,
            "AFTER FILTER" => SamplePoint::AfterFilter,
            _ => SamplePoint::Other(label.trim().to_string()),
        }
    }

    /// Returns the label as the service spells it.
    pub fn label(&self) -> &str {
        match self {
            SamplePoint::BeforeFilter => "BEFORE FILTER",
            SamplePoint::AfterFilter => "AFTER FILTER",
            SamplePoint::Other(label) => label,
        }
    }

    pub fn is_filter_stage(&self) -> bool {
        !matches!(self, SamplePoint::Other(_))
    }
}

impl fmt::Display for SamplePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for SamplePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One filter or HCU measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    #[serde(rename = "Ship")]
    pub ship: String,
    #[serde(rename = "Sample_Point")]
    pub sample_point: SamplePoint,
    #[serde(rename = "Test_Date", skip_serializing_if = "Option::is_none")]
    pub test_date: Option<NaiveDate>,
    #[serde(rename = "Particle_Count_4_Micron")]
    pub count_4: f64,
    #[serde(rename = "Particle_Count_6_Micron")]
    pub count_6: f64,
    #[serde(rename = "Particle_Count_14_Micron")]
    pub count_14: f64,
    /// Fields the service sent that are not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SampleRecord {
    /// Create a record with the given counts and no extra fields.
    pub fn new(
        ship: impl Into<String>,
        sample_point: SamplePoint,
        count_4: f64,
        count_6: f64,
        count_14: f64,
    ) -> Self {
        Self {
            ship: ship.into(),
            sample_point,
            test_date: None,
            count_4,
            count_6,
            count_14,
            extra: Map::new(),
        }
    }

    /// Set the test date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.test_date = Some(date);
        self
    }

    /// Returns the count for one particle size.
    pub fn count(&self, size: MicronSize) -> f64 {
        match size {
            MicronSize::Four => self.count_4,
            MicronSize::Six => self.count_6,
            MicronSize::Fourteen => self.count_14,
        }
    }

    /// The date as sent by the service when it could not be parsed.
    pub fn raw_test_date(&self) -> Option<&str> {
        DATE_KEYS
            .iter()
            .find_map(|k| self.extra.get(*k).and_then(Value::as_str))
    }

    /// Build a record from a JSON value.
    ///
    /// Returns `None` if the value is not an object. Everything else is
    /// defaulted: missing counts become 0, a missing sample point becomes
    /// an empty [`SamplePoint::Other`].
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    fn from_map(mut map: Map<String, Value>) -> Self {
        let ship = take_first(&mut map, SHIP_KEYS)
            .and_then(|v| value_as_string(&v))
            .unwrap_or_default();

        let sample_point = take_first(&mut map, SAMPLE_POINT_KEYS)
            .and_then(|v| value_as_string(&v))
            .map(|s| SamplePoint::from_label(&s))
            .unwrap_or_else(|| SamplePoint::Other(String::new()));

        let date_key = DATE_KEYS
            .iter()
            .find(|k| map.get(**k).is_some_and(|v| !v.is_null()))
            .copied();
        let raw_date = take_first(&mut map, DATE_KEYS);
        let test_date = raw_date
            .as_ref()
            .and_then(value_as_string)
            .and_then(|s| parse_date(&s));
        // keep an unparseable date verbatim
        if test_date.is_none() {
            if let (Some(key), Some(raw)) = (date_key, raw_date) {
                map.insert(key.to_string(), raw);
            }
        }

        let mut counts = [0.0; 3];
        for (slot, size) in counts.iter_mut().zip(MicronSize::ALL) {
            *slot = lenient_count(take_first(&mut map, &size.wire_keys()).as_ref());
        }

        Self {
            ship,
            sample_point,
            test_date,
            count_4: counts[0],
            count_6: counts[1],
            count_14: counts[2],
            extra: map,
        }
    }
}

impl<'de> Deserialize<'de> for SampleRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SampleRecord::from_value(value)
            .ok_or_else(|| de::Error::custom("sample record must be a JSON object"))
    }
}

/// Remove every key in `keys` from the map and return the first non-null value found.
fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(value) = map.remove(*key) {
            if found.is_none() && !value.is_null() {
                found = Some(value);
            }
        }
    }
    found
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret a JSON value as a non-negative count, defaulting to 0.
pub(crate) fn lenient_count(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).map(|v| v.max(0.0)).unwrap_or(0.0)
}

/// Parse the date formats the service has been seen to emit.
///
/// `2024-03-01`, `2024-03-01T10:00:00` and RFC 3339 timestamps use their
/// leading date; RFC 2822 style (`Fri, 01 Mar 2024 00:00:00 GMT`) is parsed
/// in full.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(prefix) = s.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.date_naive())
}
