//! Text report and JSON export of an aggregated result.

use std::fmt;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::data::series::{
    average_hcu_groups, filter_average_lines, hcu_particle_groups, purifier_hcu_bars,
    sample_type_distribution, SamplePointGroup,
};
use crate::data::{AggregatedResult, Classification};

/// Printable summary of one dashboard refresh.
pub struct Report<'a> {
    result: &'a AggregatedResult,
    classification: &'a Classification,
    source: Option<&'a str>,
    notice: Option<&'a str>,
}

impl<'a> Report<'a> {
    pub fn new(result: &'a AggregatedResult, classification: &'a Classification) -> Self {
        Self {
            result,
            classification,
            source: None,
            notice: None,
        }
    }

    /// Name the data source in the report header.
    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    /// Build the JSON export document.
    pub fn to_json(&self) -> Value {
        let result = self.result;
        let mut export = Map::new();

        let mut summary = Map::new();
        summary.insert("ships".to_string(), json!(result.ships));
        summary.insert("loaded_ships".to_string(), json!(result.loaded_ships()));
        summary.insert("failed_ships".to_string(), json!(result.failed_ships()));
        summary.insert("start_date".to_string(), json!(result.range.start_param()));
        summary.insert("end_date".to_string(), json!(result.range.end_param()));
        summary.insert("issued_at".to_string(), json!(result.issued_at.to_rfc3339()));
        summary.insert(
            "normal_samples".to_string(),
            json!(self.classification.normal_count),
        );
        summary.insert(
            "exceeded_samples".to_string(),
            json!(self.classification.exceeded_count),
        );
        if let Some(source) = self.source {
            summary.insert("source".to_string(), json!(source));
        }
        if let Some(notice) = self.notice {
            summary.insert("notice".to_string(), json!(notice));
        }
        export.insert("summary".to_string(), Value::Object(summary));

        export.insert(
            "sample_type_distribution".to_string(),
            json!(sample_type_distribution(result)),
        );
        export.insert("purifier_hcu".to_string(), json!(purifier_hcu_bars(result)));
        export.insert("hcu_details".to_string(), json!(hcu_particle_groups(result)));
        export.insert(
            "average_hcu_counts".to_string(),
            json!(average_hcu_groups(result)),
        );
        export.insert(
            "filter_averages".to_string(),
            Value::Array(
                filter_average_lines(result)
                    .iter()
                    .map(|row| {
                        json!({
                            "micron": row.micron.label(),
                            "ships": row.ships,
                        })
                    })
                    .collect(),
            ),
        );

        let exceeded: Vec<Value> = self
            .classification
            .exceeded_details
            .iter()
            .map(|sample| {
                json!({
                    "label": sample.label,
                    "ship": sample.record.ship,
                    "sample_point": sample.record.sample_point.label(),
                    "test_date": sample.record.test_date,
                    "violations": sample.violations.iter().map(|v| {
                        json!({
                            "size": v.size.label(),
                            "actual": v.actual,
                            "limit": v.limit,
                        })
                    }).collect::<Vec<_>>(),
                })
            })
            .collect();
        export.insert("exceeded_samples".to_string(), Value::Array(exceeded));
        export.insert("failures".to_string(), json!(result.failures));

        Value::Object(export)
    }

    /// Write the JSON export to `path`.
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;

        writeln!(f, "Ships: {}", result.ships.join(", "))?;
        writeln!(f, "Range: {}", result.range)?;
        if let Some(source) = self.source {
            writeln!(f, "Source: {}", source)?;
        }
        if let Some(notice) = self.notice {
            writeln!(f, "Notice: {}", notice)?;
        }

        writeln!(f)?;
        writeln!(f, "Sample types")?;
        let types = sample_type_distribution(result);
        if types.is_empty() {
            writeln!(f, "  no data")?;
        }
        for entry in &types {
            writeln!(f, "  {:<30} {:>8}", entry.name, entry.value)?;
        }

        writeln!(f)?;
        writeln!(f, "Purifier / HCU samples")?;
        let bars = purifier_hcu_bars(result);
        if bars.is_empty() {
            writeln!(f, "  no data")?;
        }
        for bar in &bars {
            writeln!(f, "  {:<30} {:>8}", bar.name, bar.value)?;
        }

        writeln!(f)?;
        writeln!(f, "HCU particle counts (4 / 6 / 14 micron)")?;
        write_groups(f, &hcu_particle_groups(result))?;

        writeln!(f)?;
        writeln!(f, "Average HCU particle counts (4 / 6 / 14 micron)")?;
        write_groups(f, &average_hcu_groups(result))?;

        writeln!(f)?;
        writeln!(f, "Filter averages (before -> after)")?;
        for row in filter_average_lines(result) {
            writeln!(f, "  {}", row.micron.label())?;
            for ship in &row.ships {
                writeln!(f, "    {:<26} {} -> {}", ship.ship, ship.before, ship.after)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Filter samples vs MAN limits")?;
        for (name, count) in self.classification.pie() {
            writeln!(f, "  {:<30} {:>8}", name, count)?;
        }
        for sample in &self.classification.exceeded_details {
            let detail: Vec<String> = sample
                .violations
                .iter()
                .map(|v| format!("{} {} > {}", v.size.label(), v.actual, v.limit))
                .collect();
            writeln!(f, "    {}: {}", sample.label, detail.join(", "))?;
        }

        if !result.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed ships")?;
            for failure in &result.failures {
                writeln!(f, "  {}: {}", failure.ship, failure.error)?;
            }
        }
        Ok(())
    }
}

fn write_groups(f: &mut fmt::Formatter<'_>, groups: &[SamplePointGroup]) -> fmt::Result {
    if groups.is_empty() {
        return writeln!(f, "  no data");
    }
    for group in groups {
        writeln!(f, "  {}", group.sample_point)?;
        for ship in &group.ships {
            writeln!(
                f,
                "    {:<26} {} / {} / {}",
                ship.ship, ship.count_4, ship.count_6, ship.count_14
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{classify, merge, DateRange, SamplePoint, SampleRecord};
    use crate::error::FetchError;
    use crate::source::ShipSummary;
    use chrono::{NaiveDate, Utc};

    fn result() -> AggregatedResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let a = ShipSummary {
            sample_type_count: [("Oil".to_string(), 4)].into(),
            purifier_count: Some(2),
            filter_sample_details: vec![
                SampleRecord::new("", SamplePoint::BeforeFilter, 0.0, 20.0, 0.0)
                    .with_date(start),
                SampleRecord::new("", SamplePoint::AfterFilter, 0.0, 1.0, 1.0),
            ],
            ..Default::default()
        };
        merge(
            vec!["A".to_string(), "B".to_string()],
            DateRange::new(start, end).unwrap(),
            Utc::now(),
            vec![
                ("A".to_string(), Ok(a)),
                ("B".to_string(), Err(FetchError::Status(503))),
            ],
        )
    }

    #[test]
    fn test_text_report() {
        let result = result();
        let classification = classify(&result.filter_sample_details);
        let text = Report::new(&result, &classification)
            .with_source("memory: test")
            .with_notice(Some("Failed to load data for some ships. (B)"))
            .to_string();

        assert!(text.starts_with("Ships: A, B\nRange: 2024-01-01 .. 2024-01-31\n"));
        assert!(text.contains("Source: memory: test\n"));
        assert!(text.contains("Notice: Failed to load data for some ships. (B)"));
        assert!(text.contains("A - Purifier"));
        assert!(text.contains("A - BEFORE FILTER (2024-01-01): 6 Micron 20 > 19"));
        assert!(text.contains("B: API returned status 503"));
    }

    #[test]
    fn test_json_export() {
        let result = result();
        let classification = classify(&result.filter_sample_details);
        let json = Report::new(&result, &classification).to_json();

        assert_eq!(json["summary"]["loaded_ships"], json!(["A"]));
        assert_eq!(json["summary"]["failed_ships"], json!(["B"]));
        assert_eq!(json["summary"]["exceeded_samples"], json!(1));
        assert_eq!(json["summary"]["normal_samples"], json!(1));
        assert_eq!(json["sample_type_distribution"][0]["name"], json!("Oil"));
        assert_eq!(json["exceeded_samples"][0]["violations"][0]["limit"], json!(19.0));
        assert_eq!(json["failures"][0]["ship"], json!("B"));
        assert!(json["summary"].get("notice").is_none());
    }

    #[test]
    fn test_export_to_file() {
        let result = result();
        let classification = Classification::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        Report::new(&result, &classification)
            .export_to_file(&path)
            .unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"]["start_date"], json!("2024-01-01"));
    }

    #[test]
    fn test_export_to_missing_dir_fails() {
        let result = result();
        let classification = Classification::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("export.json");

        assert!(Report::new(&result, &classification)
            .export_to_file(&path)
            .is_err());
    }
}
