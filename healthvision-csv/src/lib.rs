//! CSV dataset to `DatasetInsights` aggregation.

use std::io;

use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};
use healthvision_core::{
    BinaryDistribution, ColumnNames, DatasetInsights, InsightsConfig, InsightsError, RowPolicy,
    SmokingDistribution, SmokingStatus, VisitHistogram,
};

/// Positions of the columns the aggregator reads, resolved from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub visits: usize,
    pub urgent_followup: usize,
    pub heart_disease: Option<usize>,
    pub smoking_status: Option<usize>,
    pub diabetes: Option<usize>,
}

impl ColumnLayout {
    /// Minimum field count a row needs to cover both required columns.
    pub fn required_width(&self) -> usize {
        self.visits.max(self.urgent_followup) + 1
    }
}

/// Aggregate a dataset held in memory.
pub fn aggregate_csv_str(
    text: &str,
    config: &InsightsConfig,
) -> Result<DatasetInsights, InsightsError> {
    aggregate_csv_reader(text.as_bytes(), config)
}

/// Aggregate a dataset from any byte source.
///
/// Every physical line is one row split on the delimiter; quote characters
/// carry no meaning. Input without even a header line yields an empty result rather than an
/// error, matching a header-only file.
pub fn aggregate_csv_reader<R: io::Read>(
    source: R,
    config: &InsightsConfig,
) -> Result<DatasetInsights, InsightsError> {
    let delimiter = delimiter_byte(config.delimiter)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        // Quotes are literal text; a stray `"` must not pull later lines into one field.
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let mut records = reader.records();
    let header = match records.next() {
        Some(header) => header.map_err(|err| InsightsError::Parse(err.to_string()))?,
        None => {
            tracing::debug!("dataset has no header line");
            return Ok(DatasetInsights::empty());
        }
    };

    let layout = resolve_columns(&header, &config.columns)?;
    let mut aggregate = Aggregate::new(layout, config.row_policy);

    for (index, record) in records.enumerate() {
        // Line numbers are 1-based and the header occupies line 1.
        let line = index + 2;
        match record {
            Ok(record) => aggregate.push(line, &record),
            Err(err) if matches!(err.kind(), ErrorKind::Utf8 { .. }) => {
                tracing::debug!(line, "skipping row with invalid UTF-8");
                aggregate.skip();
            }
            Err(err) => return Err(InsightsError::Parse(err.to_string())),
        }
    }

    let insights = aggregate.finalize();
    tracing::info!(
        rows = insights.rows_total,
        skipped = insights.rows_skipped,
        buckets = insights.visits.len(),
        "aggregated dataset"
    );
    Ok(insights)
}

/// Locate the configured columns in a header record.
///
/// Fails with `InsightsError::Schema` naming every missing required column.
pub fn resolve_columns(
    header: &StringRecord,
    columns: &ColumnNames,
) -> Result<ColumnLayout, InsightsError> {
    let normalized: Vec<String> = header.iter().map(normalize_header).collect();
    let find = |name: &str| {
        let wanted = normalize_header(name);
        normalized.iter().position(|candidate| *candidate == wanted)
    };

    let visits = find(&columns.visits);
    let urgent_followup = find(&columns.urgent_followup);

    match (visits, urgent_followup) {
        (Some(visits), Some(urgent_followup)) => Ok(ColumnLayout {
            visits,
            urgent_followup,
            heart_disease: find(&columns.heart_disease),
            smoking_status: find(&columns.smoking_status),
            diabetes: find(&columns.diabetes),
        }),
        _ => {
            let mut missing = Vec::new();
            if visits.is_none() {
                missing.push(columns.visits.clone());
            }
            if urgent_followup.is_none() {
                missing.push(columns.urgent_followup.clone());
            }
            tracing::warn!(?missing, "dataset header lacks required columns");
            Err(InsightsError::Schema { missing })
        }
    }
}

struct Aggregate {
    layout: ColumnLayout,
    policy: RowPolicy,
    visits: VisitHistogram,
    risk: BinaryDistribution,
    heart_disease: BinaryDistribution,
    smoking: SmokingDistribution,
    diabetes: BinaryDistribution,
    rows_total: u64,
    rows_skipped: u64,
}

impl Aggregate {
    fn new(layout: ColumnLayout, policy: RowPolicy) -> Self {
        Self {
            layout,
            policy,
            visits: VisitHistogram::default(),
            risk: BinaryDistribution::default(),
            heart_disease: BinaryDistribution::default(),
            smoking: SmokingDistribution::default(),
            diabetes: BinaryDistribution::default(),
            rows_total: 0,
            rows_skipped: 0,
        }
    }

    fn skip(&mut self) {
        self.rows_total += 1;
        self.rows_skipped += 1;
    }

    fn push(&mut self, line: usize, record: &StringRecord) {
        if record.len() < self.layout.required_width() {
            tracing::debug!(line, fields = record.len(), "skipping short row");
            self.skip();
            return;
        }

        let visits = record.get(self.layout.visits).and_then(parse_visit_count);
        let followup = record.get(self.layout.urgent_followup).and_then(parse_number);

        if self.policy == RowPolicy::Strict && (visits.is_none() || followup.is_none()) {
            tracing::debug!(line, "skipping row with non-numeric required field");
            self.skip();
            return;
        }
        self.rows_total += 1;

        match visits {
            Some(visits) => self.visits.record(visits),
            None => tracing::debug!(line, "visit count is not a whole number"),
        }
        if let Some(flag) = followup {
            self.risk.record(flag);
        }

        if let Some(flag) = optional_field(record, self.layout.heart_disease).and_then(parse_number)
        {
            self.heart_disease.record(flag);
        }
        if let Some(status) =
            optional_field(record, self.layout.smoking_status).and_then(SmokingStatus::parse)
        {
            self.smoking.record(status);
        }
        if let Some(flag) = optional_field(record, self.layout.diabetes).and_then(parse_number) {
            self.diabetes.record(flag);
        }
    }

    fn finalize(self) -> DatasetInsights {
        DatasetInsights {
            visits: self.visits.into_buckets(),
            risk: self.risk,
            heart_disease: self.heart_disease,
            smoking: self.smoking,
            diabetes: self.diabetes,
            rows_total: self.rows_total,
            rows_skipped: self.rows_skipped,
        }
    }
}

fn optional_field(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index.and_then(|index| record.get(index))
}

fn normalize_header(raw: &str) -> String {
    raw.trim_matches(|c: char| c == '\u{feff}' || c.is_whitespace())
        .to_lowercase()
}

fn delimiter_byte(delimiter: char) -> Result<u8, InsightsError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(InsightsError::Parse(format!(
            "delimiter must be a single ASCII character, got {delimiter:?}"
        )))
    }
}

/// Permissive numeric parse: blank and non-finite values are rejected.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Visit counts must be whole numbers; `4.0` is accepted as `4`.
fn parse_visit_count(raw: &str) -> Option<i64> {
    let value = parse_number(raw)?;
    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}
