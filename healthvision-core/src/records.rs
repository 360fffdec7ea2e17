//! Typed payloads exchanged with the HealthVision backend.
//!
//! Every endpoint gets its own record so callers never inspect raw JSON.
//! Optional fields default when the backend omits them; `validate` methods
//! reject payloads that parse but make no sense.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::InsightsError;

/// Error body FastAPI sends with non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// One region the image model flagged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// `[x, y, width, height]` in image pixels.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagingRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub file_name: String,
    #[serde(default)]
    pub report: String,
    #[serde(default)]
    pub annotated_img: Option<String>,
    #[serde(default, deserialize_with = "findings_or_empty")]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ImagingRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarCase {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub analysis: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub body_location: Option<String>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub ai_analysis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub similar_cases: Vec<SimilarCase>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl VoiceRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// `GET /history`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HistoryResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub imaging: Vec<ImagingRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub voice: Vec<VoiceRecord>,
}

impl HistoryResponse {
    pub fn is_empty(&self) -> bool {
        self.imaging.is_empty() && self.voice.is_empty()
    }
}

/// `POST /api/predict-risk` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskPredictionRequest {
    pub patient_id: String,
}

/// SHAP contribution of one model feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    pub feature: String,
    pub impact: f64,
}

/// Patient row the backend fed into the model.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PatientRecord {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default, rename = "Patients_Name")]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub smoking_status: Option<String>,
    #[serde(default)]
    pub heart_disease: Option<f64>,
    #[serde(default)]
    pub diabetes: Option<f64>,
    #[serde(default)]
    pub hypertension: Option<f64>,
    #[serde(default)]
    pub patients_visited: Option<f64>,
    #[serde(default)]
    pub target_urgent_followup: Option<f64>,
    /// Remaining model features, shown verbatim in the details panel.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PatientRecord {
    /// `(label, value)` rows for the details panel, known fields first.
    pub fn detail_rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                rows.push((pretty_label(key), value));
            }
        };

        push("patient_id", self.patient_id.clone());
        push("patient_name", self.patient_name.clone());
        push("age", self.age.map(format_number));
        push("gender", self.gender.clone());
        push("smoking_status", self.smoking_status.clone());
        push("heart_disease", self.heart_disease.map(format_number));
        push("diabetes", self.diabetes.map(format_number));
        push("hypertension", self.hypertension.map(format_number));
        push("patients_visited", self.patients_visited.map(format_number));
        push(
            "target_urgent_followup",
            self.target_urgent_followup.map(format_number),
        );

        for (key, value) in &self.extra {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            rows.push((pretty_label(key), text));
        }
        rows
    }

    pub fn followup_recommendation(&self) -> &'static str {
        followup_recommendation(self.target_urgent_followup.unwrap_or(0.0))
    }
}

/// `POST /api/predict-risk` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskPrediction {
    pub prediction: u8,
    pub probability: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_factors: Vec<RiskFactor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub patient_data: Option<PatientRecord>,
}

impl RiskPrediction {
    pub fn validate(self) -> Result<Self, InsightsError> {
        if self.prediction > 1 {
            return Err(InsightsError::InvalidRecord(format!(
                "prediction must be 0 or 1, received {}",
                self.prediction
            )));
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(InsightsError::InvalidRecord(format!(
                "probability must lie in [0, 1], received {}",
                self.probability
            )));
        }
        Ok(self)
    }

    pub fn is_high_risk(&self) -> bool {
        self.prediction == 1
    }

    pub fn risk_label(&self) -> &'static str {
        if self.is_high_risk() {
            "High Risk"
        } else {
            "Low Risk"
        }
    }

    /// Probability rendered as a whole percentage.
    pub fn probability_percent(&self) -> String {
        format!("{:.0}%", self.probability * 100.0)
    }
}

/// `GET /api/model-metrics`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelMetrics {
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientSummary {
    pub patient_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub patient_name: String,
    #[serde(default, alias = "patients_visited")]
    pub visit_count: Option<u32>,
}

impl PatientSummary {
    /// Text shown in the patient picker once selected.
    pub fn display_name(&self) -> String {
        if self.patient_name.is_empty() {
            self.patient_id.clone()
        } else {
            format!("{} – {}", self.patient_id, self.patient_name)
        }
    }
}

/// `GET /api/patients/by-visits?count=N`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientsByVisits {
    #[serde(default)]
    pub requested_count: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub patients: Vec<PatientSummary>,
}

impl PatientsByVisits {
    pub fn validate(self) -> Result<Self, InsightsError> {
        if let Some(blank) = self.patients.iter().position(|p| p.patient_id.trim().is_empty()) {
            return Err(InsightsError::InvalidRecord(format!(
                "patient #{blank} has an empty patient_id"
            )));
        }
        Ok(self)
    }
}

/// `POST /voice/transcribe`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TranscriptionResponse {
    /// The backend reports soft failures in-band with an empty transcript.
    pub fn into_result(self) -> Result<String, InsightsError> {
        if let Some(error) = self.error {
            return Err(InsightsError::InvalidRecord(error));
        }
        if self.transcript.trim().is_empty() {
            let reason = self
                .warning
                .unwrap_or_else(|| "Transcription returned no text".to_string());
            return Err(InsightsError::InvalidRecord(reason));
        }
        Ok(self.transcript)
    }
}

/// `POST /voice/analyze` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceAnalysisRequest {
    pub transcript: String,
    pub patient_id: i64,
    #[serde(default)]
    pub image_report: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VoiceAnalysisResponse {
    #[serde(default)]
    pub analysis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub similar_cases: Vec<SimilarCase>,
}

/// `POST /analyze/image`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub report: String,
    #[serde(default)]
    pub annotated_image: Option<String>,
    #[serde(default, deserialize_with = "findings_or_empty")]
    pub annotations: Vec<Finding>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub yolo_explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchImageResult {
    pub filename: String,
    #[serde(default)]
    pub report: String,
    #[serde(default, deserialize_with = "findings_or_empty")]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub annotated_image: Option<String>,
}

/// `POST /analyze/images`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchImageAnalysis {
    #[serde(default)]
    pub images: Vec<BatchImageResult>,
    #[serde(default)]
    pub combined_report: String,
    #[serde(default, deserialize_with = "findings_or_empty")]
    pub combined_findings: Vec<Finding>,
}

/// Case-insensitive match on patient id or name. A blank query keeps everyone.
pub fn filter_patients<'a>(patients: &'a [PatientSummary], query: &str) -> Vec<&'a PatientSummary> {
    let query = query.trim().to_lowercase();
    patients
        .iter()
        .filter(|patient| {
            query.is_empty()
                || patient.patient_id.to_lowercase().contains(&query)
                || patient.patient_name.to_lowercase().contains(&query)
        })
        .collect()
}

pub fn followup_recommendation(flag: f64) -> &'static str {
    if flag == 0.0 {
        "No urgent follow-up is needed."
    } else if flag == 1.0 {
        "A follow-up scan is recommended."
    } else {
        "Urgent follow-up is advised."
    }
}

/// `heart_disease` -> `Heart Disease`
pub fn pretty_label(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Findings are stored as JSON text by some backends; accept a list, a
/// JSON-encoded string, or null.
fn findings_or_empty<'de, D>(deserializer: D) -> Result<Vec<Finding>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(text)) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        Some(other) => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}
