use std::fs;

use healthvision_core::{
    BinaryDistribution, DatasetInsights, InsightsConfig, InsightsError, LoadState, RowPolicy,
    SmokingDistribution, VisitBucket,
};
use healthvision_csv::{aggregate_csv_reader, aggregate_csv_str};
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn aggregate(text: &str) -> DatasetInsights {
    aggregate_csv_str(text, &InsightsConfig::default()).expect("aggregation failed")
}

#[test]
fn sample_dataset_matches_golden() {
    let dataset =
        fs::read_to_string(fixture_path("healthvision_sample.csv")).expect("sample dataset");

    let insights = aggregate(&dataset);
    let actual = serde_json::to_value(&insights).expect("serialize insights");

    let expected = fs::read_to_string(fixture_path("healthvision_sample_insights.json"))
        .expect("golden insights");
    let expected: Value = serde_json::from_str(&expected).expect("golden is valid JSON");

    assert_eq!(actual, expected);
}

#[test]
fn reader_and_str_entry_points_agree() {
    let path = fixture_path("healthvision_sample.csv");
    let from_file = aggregate_csv_reader(
        fs::File::open(&path).expect("open sample"),
        &InsightsConfig::default(),
    )
    .expect("aggregate from reader");
    let from_str = aggregate(&fs::read_to_string(&path).expect("read sample"));

    assert_eq!(from_file, from_str);
}

#[test]
fn visits_and_risk_from_minimal_header() {
    let insights = aggregate("patients_visited,target_urgent_followup\n3,0\n3,1\n5,0\n");

    assert_eq!(
        insights.visits,
        vec![
            VisitBucket { visits: 3, patients: 2 },
            VisitBucket { visits: 5, patients: 1 },
        ]
    );
    assert_eq!(insights.risk, BinaryDistribution { negative: 2, positive: 1 });
    let risk: Vec<_> = insights
        .risk_chart()
        .into_iter()
        .map(|datum| (datum.label, datum.count))
        .collect();
    assert_eq!(
        risk,
        vec![("Low Risk".to_string(), 2), ("High Risk".to_string(), 1)]
    );
}

#[test]
fn missing_required_column_is_a_schema_failure() {
    let result = aggregate_csv_str(
        "patients_visited,heart_disease\n3,0\n4,1\n",
        &InsightsConfig::default(),
    );

    match result {
        Err(InsightsError::Schema { missing }) => {
            assert_eq!(missing, vec!["target_urgent_followup".to_string()]);
        }
        other => panic!("expected schema failure, got {other:?}"),
    }
}

#[test]
fn smoking_values_are_case_insensitive_and_unknowns_still_count_elsewhere() {
    let insights = aggregate(
        "patients_visited,target_urgent_followup,smoking_status\n\
         1,0,Never\n\
         2,1,FORMER\n\
         3,0,current\n\
         4,1,unknown\n",
    );

    assert_eq!(
        insights.smoking,
        SmokingDistribution { never: 1, former: 1, current: 1 }
    );
    assert_eq!(insights.risk.total(), 4);
    assert_eq!(insights.visits.len(), 4);
}

#[test]
fn header_only_dataset_is_empty_but_not_an_error() {
    let insights = aggregate("patients_visited,target_urgent_followup,heart_disease\n");

    assert!(insights.is_empty());
    assert!(insights.visits.is_empty());
    assert_eq!(insights.risk, BinaryDistribution::default());
    assert_eq!(insights.smoking_chart().len(), 3);
    assert!(insights.smoking_chart().iter().all(|datum| datum.count == 0));

    assert!(matches!(
        LoadState::from_result(Ok(insights)),
        LoadState::Empty { .. }
    ));
}

#[test]
fn completely_blank_input_is_empty() {
    assert!(aggregate("").is_empty());
}

#[test]
fn missing_optional_columns_yield_zero_distributions() {
    let insights = aggregate("target_urgent_followup,patients_visited\n1,2\n0,2\n");

    assert_eq!(insights.heart_disease, BinaryDistribution::default());
    assert_eq!(insights.diabetes, BinaryDistribution::default());
    assert_eq!(insights.smoking, SmokingDistribution::default());
    assert_eq!(insights.visits, vec![VisitBucket { visits: 2, patients: 2 }]);
}

#[test]
fn short_rows_are_skipped_for_every_tally() {
    let insights = aggregate(
        "heart_disease,smoking_status,patients_visited,target_urgent_followup\n\
         1,never\n\
         0,former,2,1\n",
    );

    assert_eq!(insights.rows_total, 2);
    assert_eq!(insights.rows_skipped, 1);
    assert_eq!(insights.heart_disease, BinaryDistribution { negative: 1, positive: 0 });
    assert_eq!(insights.smoking, SmokingDistribution { never: 0, former: 1, current: 0 });
}

#[test]
fn per_field_policy_keeps_optional_tallies_for_bad_numeric_rows() {
    let text = "patients_visited,target_urgent_followup,diabetes\n\
                abc,1,1\n\
                2,?,0\n\
                3,0,1\n";

    let insights = aggregate(text);

    assert_eq!(insights.visits.iter().map(|b| b.patients).sum::<u64>(), 2);
    assert_eq!(insights.risk, BinaryDistribution { negative: 1, positive: 1 });
    assert_eq!(insights.diabetes, BinaryDistribution { negative: 1, positive: 2 });
    assert_eq!(insights.rows_skipped, 0);
}

#[test]
fn strict_policy_drops_rows_with_bad_required_fields() {
    let text = "patients_visited,target_urgent_followup,diabetes\n\
                abc,1,1\n\
                2,?,0\n\
                3,0,1\n";
    let config = InsightsConfig {
        row_policy: RowPolicy::Strict,
        ..InsightsConfig::default()
    };

    let insights = aggregate_csv_str(text, &config).expect("strict aggregation");

    assert_eq!(insights.visits, vec![VisitBucket { visits: 3, patients: 1 }]);
    assert_eq!(insights.risk, BinaryDistribution { negative: 1, positive: 0 });
    assert_eq!(insights.diabetes, BinaryDistribution { negative: 0, positive: 1 });
    assert_eq!(insights.rows_total, 3);
    assert_eq!(insights.rows_skipped, 2);
}

#[test]
fn strict_policy_on_sample_dataset() {
    let dataset =
        fs::read_to_string(fixture_path("healthvision_sample.csv")).expect("sample dataset");
    let config = InsightsConfig {
        row_policy: RowPolicy::Strict,
        ..InsightsConfig::default()
    };

    let insights = aggregate_csv_str(&dataset, &config).expect("strict aggregation");

    assert_eq!(insights.rows_skipped, 2);
    assert_eq!(insights.risk, BinaryDistribution { negative: 5, positive: 4 });
    assert_eq!(insights.smoking, SmokingDistribution { never: 4, former: 3, current: 2 });
    assert_eq!(insights.diabetes, BinaryDistribution { negative: 5, positive: 5 });
}

#[test]
fn custom_delimiter_and_column_names() {
    let mut config = InsightsConfig {
        delimiter: ';',
        ..InsightsConfig::default()
    };
    config.columns.visits = "Visits".to_string();
    config.columns.urgent_followup = "Followup".to_string();

    let insights =
        aggregate_csv_str("visits;followup\n2;1\n2;0\n9;1\n", &config).expect("aggregation");

    assert_eq!(
        insights.visits,
        vec![
            VisitBucket { visits: 2, patients: 2 },
            VisitBucket { visits: 9, patients: 1 },
        ]
    );
    assert_eq!(insights.risk, BinaryDistribution { negative: 1, positive: 2 });
}

#[test]
fn testable_properties_hold_on_sample_dataset() {
    let dataset =
        fs::read_to_string(fixture_path("healthvision_sample.csv")).expect("sample dataset");
    let first = aggregate(&dataset);
    let second = aggregate(&dataset);

    assert_eq!(first, second, "aggregation must be idempotent");
    assert!(first
        .visits
        .windows(2)
        .all(|pair| pair[0].visits < pair[1].visits));

    // 12 records: one short row, one non-numeric visit count, one follow-up of 2.
    let histogram_total: u64 = first.visits.iter().map(|bucket| bucket.patients).sum();
    assert_eq!(histogram_total, 10);
    assert_eq!(first.risk.total(), 10);
}

#[test]
fn unterminated_quote_stays_on_its_own_line() {
    let insights = aggregate(
        "patients_visited,target_urgent_followup,name\n\
         1,0,\"Ana\n\
         2,1,Bo\n\
         3,0,Cy\n\
         4,1,Di\n",
    );

    assert_eq!(insights.rows_total, 4);
    assert_eq!(insights.rows_skipped, 0);
    assert_eq!(
        insights.visits.iter().map(|bucket| bucket.visits).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(insights.risk, BinaryDistribution { negative: 2, positive: 2 });
}

#[test]
fn quoted_fields_are_not_unwrapped() {
    let insights = aggregate("patients_visited,target_urgent_followup\n\"3\",0\n3,\"1\"\n5,1\n");

    assert_eq!(
        insights.visits,
        vec![
            VisitBucket { visits: 3, patients: 1 },
            VisitBucket { visits: 5, patients: 1 },
        ]
    );
    assert_eq!(insights.risk, BinaryDistribution { negative: 1, positive: 1 });
}

#[test]
fn invalid_utf8_row_is_skipped_and_later_rows_still_count() {
    let bytes: &[u8] = b"patients_visited,target_urgent_followup,smoking_status\n\
                         1,0,never\n\
                         2,1,\xffcurrent\n\
                         3,1,former\n";

    let insights =
        aggregate_csv_reader(bytes, &InsightsConfig::default()).expect("aggregate bytes");

    assert_eq!(insights.rows_total, 3);
    assert_eq!(insights.rows_skipped, 1);
    assert_eq!(
        insights.visits,
        vec![
            VisitBucket { visits: 1, patients: 1 },
            VisitBucket { visits: 3, patients: 1 },
        ]
    );
    assert_eq!(insights.risk, BinaryDistribution { negative: 1, positive: 1 });
    assert_eq!(insights.smoking, SmokingDistribution { never: 1, former: 1, current: 0 });
}

#[test]
fn fractional_visit_counts_are_left_out_of_the_histogram() {
    let insights = aggregate("patients_visited,target_urgent_followup\n2.5,0\n4.0,1\n4,0\n");

    assert_eq!(insights.visits, vec![VisitBucket { visits: 4, patients: 2 }]);
    assert_eq!(insights.risk.total(), 3);
}
