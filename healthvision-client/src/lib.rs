//! HTTP client for the HealthVision backend and its static datasets.

use healthvision_core::records::{
    ApiErrorBody, BatchImageAnalysis, HistoryResponse, ImageAnalysis, ModelMetrics,
    PatientsByVisits, RiskPrediction, RiskPredictionRequest, TranscriptionResponse,
    VoiceAnalysisRequest, VoiceAnalysisResponse,
};
use healthvision_core::{DatasetInsights, InsightsConfig, InsightsError, LoadState};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Environment variable overriding the backend base URL.
pub const API_BASE_ENV: &str = "HEALTHVISION_API_BASE";

/// A file queued for multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: mime.into(),
        }
    }

    fn into_part(self) -> Result<Part, InsightsError> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(|err| InsightsError::InvalidRecord(format!("invalid MIME type: {err}")))
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, InsightsError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing `reqwest::Client` (connection pool, proxies, timeouts).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, InsightsError> {
        let mut base_url = Url::parse(base_url).map_err(|err| {
            InsightsError::Parse(format!("invalid backend URL {base_url:?}: {err}"))
        })?;
        // `Url::join` replaces the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// Base URL from `HEALTHVISION_API_BASE`, falling back to localhost.
    pub fn from_env() -> Result<Self, InsightsError> {
        let base = std::env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(&base)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path or an absolute URL against the base.
    pub fn endpoint(&self, path: &str) -> Result<Url, InsightsError> {
        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute);
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| InsightsError::Parse(format!("invalid endpoint {path:?}: {err}")))
    }

    /// Download a dataset as text.
    ///
    /// Any transport failure or non-success status is a `Retrieval` error.
    pub async fn fetch_dataset(&self, resource: &str) -> Result<String, InsightsError> {
        let url = self.endpoint(resource)?;
        tracing::debug!(%url, "fetching dataset");

        let retrieval = |status: Option<u16>, reason: String| InsightsError::Retrieval {
            resource: resource.to_string(),
            status,
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| retrieval(None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(resource, status = status.as_u16(), "dataset request failed");
            return Err(retrieval(Some(status.as_u16()), status_reason(status)));
        }

        response
            .text()
            .await
            .map_err(|err| retrieval(Some(status.as_u16()), err.to_string()))
    }

    /// `GET /history`
    pub async fn history(&self) -> Result<HistoryResponse, InsightsError> {
        let request = self.http.get(self.endpoint("history")?);
        self.send_json("history", request).await
    }

    /// `DELETE /history/clear`
    pub async fn clear_history(&self) -> Result<(), InsightsError> {
        let request = self.http.delete(self.endpoint("history/clear")?);
        let _: serde_json::Value = self.send_json("history/clear", request).await?;
        tracing::info!("history cleared");
        Ok(())
    }

    /// `POST /api/predict-risk`
    pub async fn predict_risk(&self, patient_id: &str) -> Result<RiskPrediction, InsightsError> {
        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Err(InsightsError::InvalidRecord(
                "Please select a patient".to_string(),
            ));
        }
        let body = RiskPredictionRequest {
            patient_id: patient_id.to_string(),
        };
        let request = self
            .http
            .post(self.endpoint("api/predict-risk")?)
            .json(&body);
        let prediction: RiskPrediction = self.send_json("api/predict-risk", request).await?;
        prediction.validate()
    }

    /// `GET /api/model-metrics`
    pub async fn model_metrics(&self) -> Result<ModelMetrics, InsightsError> {
        let request = self.http.get(self.endpoint("api/model-metrics")?);
        self.send_json("api/model-metrics", request).await
    }

    /// `GET /api/patients/by-visits?count=N`
    pub async fn patients_by_visits(&self, count: u32) -> Result<PatientsByVisits, InsightsError> {
        let request = self
            .http
            .get(self.endpoint("api/patients/by-visits")?)
            .query(&[("count", count)]);
        let patients: PatientsByVisits = self.send_json("api/patients/by-visits", request).await?;
        patients.validate()
    }

    /// `POST /voice/transcribe` with a recorded clip.
    pub async fn transcribe(&self, audio: UploadFile) -> Result<String, InsightsError> {
        let form = Form::new().part("file", audio.into_part()?);
        let request = self
            .http
            .post(self.endpoint("voice/transcribe")?)
            .multipart(form);
        let response: TranscriptionResponse = self.send_json("voice/transcribe", request).await?;
        response.into_result()
    }

    /// `POST /voice/analyze`
    pub async fn analyze_transcript(
        &self,
        body: &VoiceAnalysisRequest,
    ) -> Result<VoiceAnalysisResponse, InsightsError> {
        if body.transcript.trim().is_empty() {
            return Err(InsightsError::InvalidRecord(
                "No transcript to analyze".to_string(),
            ));
        }
        let request = self.http.post(self.endpoint("voice/analyze")?).json(body);
        self.send_json("voice/analyze", request).await
    }

    /// `POST /analyze/image`
    pub async fn analyze_image(&self, image: UploadFile) -> Result<ImageAnalysis, InsightsError> {
        let form = Form::new().part("file", image.into_part()?);
        let request = self
            .http
            .post(self.endpoint("analyze/image")?)
            .multipart(form);
        self.send_json("analyze/image", request).await
    }

    /// `POST /analyze/images`
    pub async fn analyze_images(
        &self,
        images: Vec<UploadFile>,
    ) -> Result<BatchImageAnalysis, InsightsError> {
        let mut form = Form::new();
        for image in images {
            form = form.part("files", image.into_part()?);
        }
        let request = self
            .http
            .post(self.endpoint("analyze/images")?)
            .multipart(form);
        self.send_json("analyze/images", request).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, InsightsError> {
        let response = request
            .send()
            .await
            .map_err(|err| InsightsError::Retrieval {
                resource: endpoint.to_string(),
                status: None,
                reason: err.to_string(),
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| InsightsError::Retrieval {
                resource: endpoint.to_string(),
                status: Some(status.as_u16()),
                reason: err.to_string(),
            })?;

        decode_response(endpoint, status, &body)
    }
}

/// Turn a raw backend answer into a typed record or an error carrying the
/// backend's `detail`.
pub fn decode_response<T: DeserializeOwned>(
    endpoint: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<T, InsightsError> {
    if !status.is_success() {
        let detail = serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|error| error.detail)
            .unwrap_or_else(|| status_reason(status));
        tracing::warn!(endpoint, status = status.as_u16(), %detail, "backend request failed");
        return Err(InsightsError::Backend {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_slice(body)
        .map_err(|err| InsightsError::InvalidRecord(format!("{endpoint}: {err}")))
}

/// Fetch and aggregate a dataset, folding every failure into a `LoadState`.
///
/// This is the only place dataset errors are caught; the dashboard renders
/// whatever comes back.
pub async fn load_insights(
    client: &ApiClient,
    resource: &str,
    config: &InsightsConfig,
) -> LoadState {
    let result = fetch_and_aggregate(client, resource, config).await;
    if let Err(err) = &result {
        tracing::error!(resource, error = %err, "could not build dataset insights");
    }
    LoadState::from_result(result)
}

async fn fetch_and_aggregate(
    client: &ApiClient,
    resource: &str,
    config: &InsightsConfig,
) -> Result<DatasetInsights, InsightsError> {
    let text = client.fetch_dataset(resource).await?;
    healthvision_csv::aggregate_csv_str(&text, config)
}

fn status_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
