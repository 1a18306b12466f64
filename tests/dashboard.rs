//! End-to-end dashboard runs over fixture files and in-memory sources.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use tempfile::NamedTempFile;

use shipwatch::data::series::{filter_average_lines, purifier_hcu_bars};
use shipwatch::{
    aggregate, Aggregation, Dashboard, DashboardState, FetchError, FileSource, MissingInput,
    Report, Selection, ShipSummary, StaticSource,
};

fn day(d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 3, d)
}

fn fixture() -> NamedTempFile {
    let content = json!({
        "ships": {
            "MSC CATERINA": {
                "sample_type_count": { "Lube Oil": 6, "Fuel Oil": 2 },
                "purifier_count": 4,
                "hcu_count": 1,
                "filter_average_counts": [
                    { "Sample_Point": "BEFORE FILTER", "Average_Particle_Count_4_Micron": 120,
                      "Average_Particle_Count_6_Micron": 40, "Average_Particle_Count_14_Micron": 12 },
                    { "Sample_Point": "AFTER FILTER", "Average_Particle_Count_4_Micron": 30,
                      "Average_Particle_Count_6_Micron": 9, "Average_Particle_Count_14_Micron": 2 }
                ],
                "filter_sample_details": [
                    { "Sample_Point": "BEFORE FILTER", "Test_Date": "2024-03-02",
                      "Particle_Count_6_Micron": 19, "Particle_Count_14_Micron": 15 },
                    { "Sample_Point": "AFTER FILTER", "Test_Date": "2024-03-03",
                      "Particle_Count_6_Micron": 17, "Particle_Count_14_Micron": 2 },
                    { "Sample_Point": "AFTER FILTER", "Test_Date": "2023-12-01",
                      "Particle_Count_6_Micron": 99 }
                ]
            },
            "MSC ANNA": {
                "sample_type_count": { "Lube Oil": 1 },
                "filter_sample_details": [
                    { "Sample_Point": "OVERFLOW", "Test_Date": "2024-03-04",
                      "Particle_Count_6_Micron": 500 }
                ]
            }
        }
    });
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[tokio::test]
async fn test_fixture_run_with_default_ship() {
    let file = fixture();
    let source = Arc::new(FileSource::new(file.path()));
    let mut dashboard = Dashboard::new(source, Selection::new(Vec::<String>::new(), day(1), day(31)))
        .with_preferred_ship("MSC CATERINA");

    let options = dashboard.load_ship_options().await.to_vec();
    assert_eq!(options, vec!["MSC ANNA", "MSC CATERINA"]);
    assert_eq!(dashboard.selection().ships(), &["MSC CATERINA"]);

    assert!(dashboard.refresh().await);
    let result = dashboard.result().unwrap();

    // out-of-range sample dropped
    assert_eq!(result.filter_sample_details.len(), 2);

    let classification = dashboard.classify_filter_samples().await.unwrap();
    // 19 and 15 sit exactly on the before-filter limits
    assert_eq!(classification.normal_count, 1);
    assert_eq!(classification.exceeded_count, 1);
    assert_eq!(
        classification.exceeded_details[0].label,
        "MSC CATERINA - AFTER FILTER (2024-03-03)"
    );

    let rows = filter_average_lines(&result);
    assert_eq!(rows[0].ships[0].before, 120.0);
    assert_eq!(rows[2].ships[0].after, 2.0);

    let text = Report::new(&result, &classification).to_string();
    assert!(text.contains("Ships: MSC CATERINA"));
    assert!(text.contains("MSC CATERINA - Purifier"));
}

#[tokio::test]
async fn test_fixture_run_multiple_ships() {
    let file = fixture();
    let source = Arc::new(FileSource::new(file.path()));
    let selection = Selection::new(["MSC ANNA", "MSC CATERINA", "MSC NOBODY"], day(1), day(31));
    let mut dashboard = Dashboard::new(source, selection);

    assert!(dashboard.refresh().await);
    let result = dashboard.result().unwrap();

    assert_eq!(result.loaded_ships(), vec!["MSC ANNA", "MSC CATERINA"]);
    assert_eq!(result.failures[0].error, FetchError::NotFound("MSC NOBODY".into()));
    assert_eq!(result.sample_type_count["Lube Oil"]["MSC ANNA"], 1);
    assert_eq!(result.sample_type_count["Lube Oil"]["MSC CATERINA"], 6);
    assert_eq!(result.purifier_count["MSC ANNA"], 0);

    let bars: Vec<String> = purifier_hcu_bars(&result).into_iter().map(|b| b.name).collect();
    assert_eq!(bars, vec!["MSC CATERINA - Purifier", "MSC CATERINA - HCU"]);

    // unknown sample points are never flagged
    let classification = dashboard.classify_filter_samples().await.unwrap();
    assert_eq!(classification.exceeded_count, 1);
    assert_eq!(classification.normal_count, 2);
}

#[tokio::test]
async fn test_all_ship_classification_from_fixture() {
    let file = fixture();
    let source = Arc::new(FileSource::new(file.path()));
    let mut dashboard = Dashboard::new(source, Selection::new(Vec::<String>::new(), day(1), day(31)));

    let classification = dashboard.classify_filter_samples().await.unwrap();
    assert_eq!(classification.total(), 3);
    assert_eq!(classification.exceeded_count, 1);
}

#[tokio::test]
async fn test_missing_input_issues_no_requests() {
    let source = StaticSource::new("t").with_summary("A", ShipSummary::default());

    let inverted = Selection::new(["A"], day(9), day(1));
    match aggregate(&source, &inverted).await {
        Aggregation::AwaitingInput(missing) => assert_eq!(missing, MissingInput::InvertedRange),
        other => panic!("unexpected {:?}", other),
    }

    let no_end = Selection::new(["A"], day(1), None);
    assert_eq!(
        aggregate(&source, &no_end).await,
        Aggregation::AwaitingInput(MissingInput::NoEndDate)
    );
    assert!(source.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_output_order_ignores_completion_order() {
    let summary = |n| ShipSummary {
        purifier_count: Some(n),
        ..Default::default()
    };
    let source = Arc::new(
        StaticSource::new("t")
            .with_summary("SLOW", summary(1))
            .with_summary("FAST", summary(2))
            .with_delay("SLOW", Duration::from_secs(3))
            .with_failure("DEAD", FetchError::Timeout),
    );
    let mut dashboard = Dashboard::new(
        source.clone(),
        Selection::new(["SLOW", "DEAD", "FAST"], day(1), day(2)),
    );

    let started = tokio::time::Instant::now();
    assert!(dashboard.refresh().await);
    // concurrent: total time is the slowest ship, not the sum
    assert!(started.elapsed() < Duration::from_secs(4));

    let DashboardState::Ready(result) = dashboard.state() else {
        panic!("expected a result");
    };
    assert_eq!(result.ships, vec!["SLOW", "DEAD", "FAST"]);
    assert_eq!(result.loaded_ships(), vec!["SLOW", "FAST"]);
    assert_eq!(result.failed_ships(), vec!["DEAD"]);
    assert_eq!(source.requests().len(), 3);
}
