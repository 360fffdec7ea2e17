//! Core types for the HealthVision insights dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod records;
pub mod report;
pub mod session;

/// Header names the aggregator looks for.
///
/// Matching is case-insensitive and ignores surrounding whitespace and BOMs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnNames {
    pub visits: String,
    pub urgent_followup: String,
    pub heart_disease: String,
    pub smoking_status: String,
    pub diabetes: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            visits: "patients_visited".to_string(),
            urgent_followup: "target_urgent_followup".to_string(),
            heart_disease: "heart_disease".to_string(),
            smoking_status: "smoking_status".to_string(),
            diabetes: "diabetes".to_string(),
        }
    }
}

/// How a row with an unparseable required field is credited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// Each tally takes whatever fields of the row are valid for it.
    #[default]
    PerField,
    /// A row counts nowhere unless both required fields are numeric.
    Strict,
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsightsConfig {
    pub columns: ColumnNames,
    /// Single-byte field delimiter.
    pub delimiter: char,
    pub row_policy: RowPolicy,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            delimiter: ',',
            row_policy: RowPolicy::PerField,
        }
    }
}

/// One `{label, count}` pair handed to the charting layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartDatum {
    pub label: String,
    pub count: u64,
}

impl ChartDatum {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Histogram bucket: how many patients had exactly `visits` visits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitBucket {
    pub visits: i64,
    pub patients: u64,
}

/// Counts for a 0/1 flag column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BinaryDistribution {
    pub negative: u64,
    pub positive: u64,
}

impl BinaryDistribution {
    /// Credit a parsed flag. Values other than 0 and 1 are ignored.
    pub fn record(&mut self, flag: f64) {
        if flag == 0.0 {
            self.negative += 1;
        } else if flag == 1.0 {
            self.positive += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.negative + self.positive
    }

    pub fn to_chart(&self, negative_label: &str, positive_label: &str) -> Vec<ChartDatum> {
        vec![
            ChartDatum::new(negative_label, self.negative),
            ChartDatum::new(positive_label, self.positive),
        ]
    }
}

/// Recognised smoking categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SmokingStatus {
    Never,
    Former,
    Current,
}

impl SmokingStatus {
    /// Case-insensitive parse; anything unrecognised yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "never" => Some(Self::Never),
            "former" => Some(Self::Former),
            "current" => Some(Self::Current),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Never => "Never Smoked",
            Self::Former => "Former Smoker",
            Self::Current => "Current Smoker",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SmokingDistribution {
    pub never: u64,
    pub former: u64,
    pub current: u64,
}

impl SmokingDistribution {
    pub fn record(&mut self, status: SmokingStatus) {
        match status {
            SmokingStatus::Never => self.never += 1,
            SmokingStatus::Former => self.former += 1,
            SmokingStatus::Current => self.current += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.never + self.former + self.current
    }

    /// Always in never/former/current order.
    pub fn to_chart(&self) -> Vec<ChartDatum> {
        vec![
            ChartDatum::new(SmokingStatus::Never.label(), self.never),
            ChartDatum::new(SmokingStatus::Former.label(), self.former),
            ChartDatum::new(SmokingStatus::Current.label(), self.current),
        ]
    }
}

/// Running visit-count histogram. Keys stay ordered so emission needs no sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitHistogram {
    buckets: BTreeMap<i64, u64>,
}

impl VisitHistogram {
    pub fn record(&mut self, visits: i64) {
        *self.buckets.entry(visits).or_insert(0) += 1;
    }

    pub fn into_buckets(self) -> Vec<VisitBucket> {
        self.buckets
            .into_iter()
            .map(|(visits, patients)| VisitBucket { visits, patients })
            .collect()
    }
}

/// The five distributions produced from one dataset load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetInsights {
    /// Ascending by visit count. Only whole-number values are bucketed
    /// (`4.0` counts as 4); fractional or non-numeric values are left out, so
    /// the bucket total equals the number of rows with a whole visit count.
    pub visits: Vec<VisitBucket>,
    pub risk: BinaryDistribution,
    pub heart_disease: BinaryDistribution,
    pub smoking: SmokingDistribution,
    pub diabetes: BinaryDistribution,
    /// Data rows read, excluding the header and blank lines.
    pub rows_total: u64,
    /// Rows that contributed to no tally because they were malformed.
    pub rows_skipped: u64,
}

impl DatasetInsights {
    /// Header-only result: every output present and zeroed.
    pub fn empty() -> Self {
        Self {
            visits: Vec::new(),
            risk: BinaryDistribution::default(),
            heart_disease: BinaryDistribution::default(),
            smoking: SmokingDistribution::default(),
            diabetes: BinaryDistribution::default(),
            rows_total: 0,
            rows_skipped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows_total == 0
    }

    pub fn visit_chart(&self) -> Vec<ChartDatum> {
        self.visits
            .iter()
            .map(|bucket| ChartDatum::new(bucket.visits.to_string(), bucket.patients))
            .collect()
    }

    pub fn risk_chart(&self) -> Vec<ChartDatum> {
        self.risk.to_chart("Low Risk", "High Risk")
    }

    pub fn heart_chart(&self) -> Vec<ChartDatum> {
        self.heart_disease.to_chart("No Heart Disease", "Heart Disease")
    }

    pub fn smoking_chart(&self) -> Vec<ChartDatum> {
        self.smoking.to_chart()
    }

    pub fn diabetes_chart(&self) -> Vec<ChartDatum> {
        self.diabetes.to_chart("No Diabetes", "Diabetic")
    }
}

/// Errors surfaced while loading or aggregating a dataset, or talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("Could not retrieve {resource}{}: {reason}", status_suffix(.status))]
    Retrieval {
        resource: String,
        status: Option<u16>,
        reason: String,
    },
    #[error("Required columns not found in CSV: {}", missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("Dataset contains a header but no data rows")]
    EmptyDataset,
    #[error("Could not read dataset: {0}")]
    Parse(String),
    #[error("Backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },
    #[error("Invalid backend payload: {0}")]
    InvalidRecord(String),
    #[error("Session store error: {0}")]
    Session(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}

impl InsightsError {
    /// Message shown in place of the charts.
    pub fn display_message(&self) -> String {
        match self {
            Self::Retrieval { status: Some(code), .. } => {
                format!("CSV load error: {code}")
            }
            Self::Retrieval { .. } => "Failed to load CSV data".to_string(),
            Self::Schema { .. } => "Required columns not found in CSV".to_string(),
            Self::EmptyDataset => "No patient rows found in the dataset".to_string(),
            other => other.to_string(),
        }
    }
}

/// Outcome of one dataset load, as consumed by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready { insights: DatasetInsights },
    Empty { insights: DatasetInsights, message: String },
    Failed { kind: FailureKind, message: String },
}

/// Which of the failure families a `Failed` load belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Retrieval,
    Schema,
    Other,
}

impl LoadState {
    /// Collapse an aggregation result into something the view can render.
    pub fn from_result(result: Result<DatasetInsights, InsightsError>) -> Self {
        match result {
            Ok(insights) if insights.is_empty() => Self::Empty {
                message: InsightsError::EmptyDataset.display_message(),
                insights,
            },
            Ok(insights) => Self::Ready { insights },
            Err(InsightsError::EmptyDataset) => Self::Empty {
                message: InsightsError::EmptyDataset.display_message(),
                insights: DatasetInsights::empty(),
            },
            Err(err) => {
                let kind = match err {
                    InsightsError::Retrieval { .. } => FailureKind::Retrieval,
                    InsightsError::Schema { .. } => FailureKind::Schema,
                    _ => FailureKind::Other,
                };
                Self::Failed {
                    kind,
                    message: err.display_message(),
                }
            }
        }
    }

    pub fn insights(&self) -> Option<&DatasetInsights> {
        match self {
            Self::Ready { insights } | Self::Empty { insights, .. } => Some(insights),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_distribution_ignores_other_flags() {
        let mut dist = BinaryDistribution::default();
        for flag in [0.0, 1.0, 1.0, 2.0, -1.0, 0.5] {
            dist.record(flag);
        }
        assert_eq!(dist, BinaryDistribution { negative: 1, positive: 2 });
        assert_eq!(dist.total(), 3);
    }

    #[test]
    fn smoking_status_parse_is_case_insensitive() {
        assert_eq!(SmokingStatus::parse(" Never "), Some(SmokingStatus::Never));
        assert_eq!(SmokingStatus::parse("FORMER"), Some(SmokingStatus::Former));
        assert_eq!(SmokingStatus::parse("current"), Some(SmokingStatus::Current));
        assert_eq!(SmokingStatus::parse("unknown"), None);
    }

    #[test]
    fn histogram_emits_ascending_buckets() {
        let mut histogram = VisitHistogram::default();
        for visits in [7, 2, 7, 10, 2, 2] {
            histogram.record(visits);
        }
        let buckets = histogram.into_buckets();
        assert_eq!(
            buckets,
            vec![
                VisitBucket { visits: 2, patients: 3 },
                VisitBucket { visits: 7, patients: 2 },
                VisitBucket { visits: 10, patients: 1 },
            ]
        );
    }

    #[test]
    fn load_state_distinguishes_failures() {
        let retrieval = LoadState::from_result(Err(InsightsError::Retrieval {
            resource: "dataset.csv".to_string(),
            status: Some(404),
            reason: "Not Found".to_string(),
        }));
        assert_eq!(
            retrieval,
            LoadState::Failed {
                kind: FailureKind::Retrieval,
                message: "CSV load error: 404".to_string(),
            }
        );

        let schema = LoadState::from_result(Err(InsightsError::Schema {
            missing: vec!["target_urgent_followup".to_string()],
        }));
        assert!(matches!(
            schema,
            LoadState::Failed { kind: FailureKind::Schema, .. }
        ));

        let empty = LoadState::from_result(Ok(DatasetInsights::empty()));
        assert!(matches!(empty, LoadState::Empty { .. }));
        assert!(empty.insights().is_some());
    }

    #[test]
    fn chart_labels_follow_fixed_order() {
        let mut insights = DatasetInsights::empty();
        insights.smoking = SmokingDistribution { never: 4, former: 2, current: 1 };
        let labels: Vec<_> = insights
            .smoking_chart()
            .into_iter()
            .map(|datum| datum.label)
            .collect();
        assert_eq!(labels, ["Never Smoked", "Former Smoker", "Current Smoker"]);
        assert_eq!(insights.risk_chart()[0].label, "Low Risk");
        assert_eq!(insights.diabetes_chart()[1].label, "Diabetic");
    }
}
