//! Response payloads of the sampling data service.
//!
//! The service answers `/api/ship-summary` with a JSON object holding any
//! subset of the category keys below. Nothing is mandatory: missing or
//! wrongly-typed categories come back empty, and list entries that are not
//! objects are skipped. Only a body that is not a JSON object at all is
//! treated as an error.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::data::SampleRecord;
use crate::error::FetchError;

/// The list-valued categories of a ship summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListCategory {
    HcuDetails,
    AverageHcuCounts,
    FilterAverageCounts,
    FilterSampleDetails,
}

impl ListCategory {
    pub const ALL: [ListCategory; 4] = [
        ListCategory::HcuDetails,
        ListCategory::AverageHcuCounts,
        ListCategory::FilterAverageCounts,
        ListCategory::FilterSampleDetails,
    ];

    /// JSON key of the category.
    pub fn key(self) -> &'static str {
        match self {
            ListCategory::HcuDetails => "hcu_details",
            ListCategory::AverageHcuCounts => "average_hcu_counts",
            ListCategory::FilterAverageCounts => "filter_average_counts",
            ListCategory::FilterSampleDetails => "filter_sample_details",
        }
    }
}

/// Validated per-ship response of `/api/ship-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShipSummary {
    /// Sample type -> number of samples.
    pub sample_type_count: BTreeMap<String, u64>,
    /// `None` when the category was absent from the response.
    pub purifier_count: Option<u64>,
    /// `None` when the category was absent from the response.
    pub hcu_count: Option<u64>,
    pub hcu_details: Vec<SampleRecord>,
    pub average_hcu_counts: Vec<SampleRecord>,
    pub filter_average_counts: Vec<SampleRecord>,
    pub filter_sample_details: Vec<SampleRecord>,
}

impl ShipSummary {
    /// Validate a response body for `ship`.
    ///
    /// The service nests per-ship values under the ship name
    /// (`{"purifier_count": {"SHIP": 3}}`); flat values (`{"purifier_count": 3}`)
    /// are accepted as well.
    pub fn from_response(ship: &str, body: Value) -> Result<Self, FetchError> {
        let Value::Object(mut body) = body else {
            return Err(FetchError::Parse(format!(
                "expected a JSON object for ship '{}', got {}",
                ship,
                json_kind(&body)
            )));
        };

        let mut summary = ShipSummary {
            sample_type_count: parse_type_counts(ship, body.remove("sample_type_count")),
            purifier_count: parse_scalar(ship, "purifier_count", body.remove("purifier_count")),
            hcu_count: parse_scalar(ship, "hcu_count", body.remove("hcu_count")),
            ..Default::default()
        };

        for category in ListCategory::ALL {
            *summary.list_mut(category) = parse_records(category.key(), body.remove(category.key()));
        }

        Ok(summary)
    }

    pub fn list(&self, category: ListCategory) -> &[SampleRecord] {
        match category {
            ListCategory::HcuDetails => &self.hcu_details,
            ListCategory::AverageHcuCounts => &self.average_hcu_counts,
            ListCategory::FilterAverageCounts => &self.filter_average_counts,
            ListCategory::FilterSampleDetails => &self.filter_sample_details,
        }
    }

    pub fn list_mut(&mut self, category: ListCategory) -> &mut Vec<SampleRecord> {
        match category {
            ListCategory::HcuDetails => &mut self.hcu_details,
            ListCategory::AverageHcuCounts => &mut self.average_hcu_counts,
            ListCategory::FilterAverageCounts => &mut self.filter_average_counts,
            ListCategory::FilterSampleDetails => &mut self.filter_sample_details,
        }
    }
}

/// Parse the body of `/api/ships`: either `{"ships": [...]}` or a bare array.
pub fn parse_ship_list(body: Value) -> Result<Vec<String>, FetchError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("ships") {
            Some(Value::Array(items)) => items,
            _ => return Err(FetchError::Parse("missing 'ships' array".to_string())),
        },
        other => {
            return Err(FetchError::Parse(format!(
                "expected ship list, got {}",
                json_kind(&other)
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .collect())
}

/// Parse a list of sample records, skipping entries that are not objects.
pub fn parse_records(category: &str, value: Option<Value>) -> Vec<SampleRecord> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let total = items.len();
            let records: Vec<SampleRecord> =
                items.into_iter().filter_map(SampleRecord::from_value).collect();
            if records.len() < total {
                warn!(
                    category,
                    skipped = total - records.len(),
                    "Skipping malformed entries"
                );
            }
            records
        }
        Some(other) => {
            warn!(category, kind = json_kind(&other), "Expected a list, ignoring category");
            Vec::new()
        }
    }
}

fn parse_type_counts(ship: &str, value: Option<Value>) -> BTreeMap<String, u64> {
    let map = match value {
        None | Some(Value::Null) => return BTreeMap::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            warn!(ship, kind = json_kind(&other), "Unexpected sample_type_count shape");
            return BTreeMap::new();
        }
    };

    // Nested form: {"SHIP": {"Oil": 3}}
    let nested = match map.get(ship) {
        Some(Value::Object(inner)) => Some(inner.clone()),
        _ => None,
    };
    let counts: Map<String, Value> = nested.unwrap_or(map);

    counts
        .into_iter()
        .filter_map(|(sample_type, v)| count_value(&v).map(|n| (sample_type, n)))
        .collect()
}

fn parse_scalar(ship: &str, category: &str, value: Option<Value>) -> Option<u64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.get(ship).and_then(count_value).unwrap_or(0)),
        Some(other) => match count_value(&other) {
            Some(n) => Some(n),
            None => {
                warn!(ship, category, kind = json_kind(&other), "Unexpected count shape");
                None
            }
        },
    }
}

/// Interpret a JSON value as a whole count.
fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SamplePoint;
    use serde_json::json;

    #[test]
    fn test_nested_service_response() {
        let body = json!({
            "sample_type_count": { "MSC ANNA": { "Oil Sample": 10, "Water Sample": 4 } },
            "purifier_count": { "MSC ANNA": 5 },
            "hcu_count": { "MSC ANNA": 3 },
            "hcu_details": [
                { "Ship": "MSC ANNA", "Sample_Point": "HCU 1",
                  "Particle_Count_4_Micron": 40, "Particle_Count_6_Micron": 20,
                  "Particle_Count_14_Micron": 8 }
            ],
            "filter_sample_details": [
                { "Ship": "MSC ANNA", "Sample_Point": "AFTER FILTER",
                  "Particle_Count_6_Micron": 17, "Particle_Count_14_Micron": 2 }
            ]
        });

        let summary = ShipSummary::from_response("MSC ANNA", body).unwrap();
        assert_eq!(summary.sample_type_count.get("Oil Sample"), Some(&10));
        assert_eq!(summary.sample_type_count.get("Water Sample"), Some(&4));
        assert_eq!(summary.purifier_count, Some(5));
        assert_eq!(summary.hcu_count, Some(3));
        assert_eq!(summary.hcu_details.len(), 1);
        assert_eq!(
            summary.filter_sample_details[0].sample_point,
            SamplePoint::AfterFilter
        );
        assert!(summary.average_hcu_counts.is_empty());
    }

    #[test]
    fn test_flat_response() {
        let body = json!({
            "sample_type_count": { "Oil": 10 },
            "purifier_count": 2,
            "hcu_count": "7"
        });

        let summary = ShipSummary::from_response("A", body).unwrap();
        assert_eq!(summary.sample_type_count.get("Oil"), Some(&10));
        assert_eq!(summary.purifier_count, Some(2));
        assert_eq!(summary.hcu_count, Some(7));
    }

    #[test]
    fn test_missing_categories_default() {
        let summary = ShipSummary::from_response("A", json!({})).unwrap();
        assert_eq!(summary, ShipSummary::default());
    }

    #[test]
    fn test_scalar_object_without_ship_is_zero() {
        let body = json!({ "purifier_count": { "OTHER": 9 } });
        let summary = ShipSummary::from_response("A", body).unwrap();
        assert_eq!(summary.purifier_count, Some(0));
        assert_eq!(summary.hcu_count, None);
    }

    #[test]
    fn test_wrong_shapes_are_ignored() {
        let body = json!({
            "sample_type_count": [1, 2],
            "purifier_count": true,
            "hcu_details": { "not": "a list" },
            "filter_sample_details": [ 5, { "Sample_Point": "BEFORE FILTER" }, "x" ]
        });

        let summary = ShipSummary::from_response("A", body).unwrap();
        assert!(summary.sample_type_count.is_empty());
        assert_eq!(summary.purifier_count, None);
        assert!(summary.hcu_details.is_empty());
        assert_eq!(summary.filter_sample_details.len(), 1);
    }

    #[test]
    fn test_non_object_body_is_an_error() {
        let err = ShipSummary::from_response("A", json!([1])).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_parse_ship_list() {
        assert_eq!(
            parse_ship_list(json!({ "ships": ["B", "A", 3, ""] })).unwrap(),
            vec!["B".to_string(), "A".to_string()]
        );
        assert_eq!(parse_ship_list(json!(["X"])).unwrap(), vec!["X".to_string()]);
        assert!(parse_ship_list(json!({ "vessels": [] })).is_err());
        assert!(parse_ship_list(json!("A,B")).is_err());
    }
}
