//! Session persistence port.
//!
//! Each view restores its last successful interaction from a fixed slot. The
//! store itself is injected so logic can be exercised without a browser.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::records::{Finding, PatientRecord, RiskPrediction, SimilarCase};
use crate::InsightsError;

/// Key-value storage scoped to one browsing session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, InsightsError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), InsightsError>;
    fn clear(&mut self, key: &str) -> Result<(), InsightsError>;
}

/// Storage slot owned by one feature area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionSlot {
    AppState,
    RiskResult,
    VoiceSession,
    ImageSession,
    LatestImagingContext,
}

impl SessionSlot {
    pub const ALL: [SessionSlot; 5] = [
        SessionSlot::AppState,
        SessionSlot::RiskResult,
        SessionSlot::VoiceSession,
        SessionSlot::ImageSession,
        SessionSlot::LatestImagingContext,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SessionSlot::AppState => "healthVisionState",
            SessionSlot::RiskResult => "risk_result",
            SessionSlot::VoiceSession => "voice_session",
            SessionSlot::ImageSession => "image_session",
            SessionSlot::LatestImagingContext => "latest_imaging_context",
        }
    }
}

/// Read and decode a slot.
///
/// A slot holding invalid JSON is treated as empty so a stale payload never
/// blocks a view from loading.
pub fn load_json<T, S>(store: &S, slot: SessionSlot) -> Result<Option<T>, InsightsError>
where
    T: DeserializeOwned,
    S: SessionStore + ?Sized,
{
    let Some(raw) = store.get(slot.key())? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!(slot = slot.key(), error = %err, "discarding unreadable session slot");
            Ok(None)
        }
    }
}

pub fn save_json<T, S>(store: &mut S, slot: SessionSlot, value: &T) -> Result<(), InsightsError>
where
    T: Serialize,
    S: SessionStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|err| InsightsError::Session(err.to_string()))?;
    store.set(slot.key(), &raw)
}

/// Drop every slot, e.g. on logout.
pub fn clear_all<S>(store: &mut S) -> Result<(), InsightsError>
where
    S: SessionStore + ?Sized,
{
    for slot in SessionSlot::ALL {
        store.clear(slot.key())?;
    }
    Ok(())
}

/// In-process store for tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, InsightsError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), InsightsError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), InsightsError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Last prediction shown by the risk view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskSession {
    pub patient_id: String,
    #[serde(default)]
    pub result: Option<RiskPrediction>,
    #[serde(default)]
    pub details: Option<PatientRecord>,
}

/// Transcript and analysis of the voice view.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSession {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub similar_cases: Vec<SimilarCase>,
}

/// Single-image result of the radiology upload view.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSession {
    #[serde(default)]
    pub report: String,
    #[serde(default)]
    pub annotated_image: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Finding>,
}

/// Imaging report forwarded to the voice analysis as context.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImagingContext {
    #[serde(default)]
    pub report: String,
}
