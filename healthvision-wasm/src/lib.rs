//! Framework-neutral WASM <-> JavaScript bridge.

use healthvision_core::{ColumnNames, InsightsConfig, LoadState, RowPolicy};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod storage;

#[cfg(target_arch = "wasm32")]
pub use storage::BrowserSessionStore;

#[derive(Deserialize, Default)]
struct JsInsightsConfig {
    #[serde(default)]
    delimiter: Option<char>,
    #[serde(default)]
    strict: Option<bool>,
    #[serde(default)]
    visits_column: Option<String>,
    #[serde(default)]
    followup_column: Option<String>,
    #[serde(default)]
    heart_disease_column: Option<String>,
    #[serde(default)]
    smoking_column: Option<String>,
    #[serde(default)]
    diabetes_column: Option<String>,
}

impl From<JsInsightsConfig> for InsightsConfig {
    fn from(cfg: JsInsightsConfig) -> Self {
        let mut base = InsightsConfig::default();
        if let Some(delimiter) = cfg.delimiter {
            base.delimiter = delimiter;
        }
        if let Some(strict) = cfg.strict {
            base.row_policy = if strict {
                RowPolicy::Strict
            } else {
                RowPolicy::PerField
            };
        }

        let ColumnNames {
            visits,
            urgent_followup,
            heart_disease,
            smoking_status,
            diabetes,
        } = &mut base.columns;
        for (slot, value) in [
            (visits, cfg.visits_column),
            (urgent_followup, cfg.followup_column),
            (heart_disease, cfg.heart_disease_column),
            (smoking_status, cfg.smoking_column),
            (diabetes, cfg.diabetes_column),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
        base
    }
}

/// Aggregate CSV text fetched by the host page.
///
/// Returns a serialized `LoadState`; dataset problems come back as a
/// `failed` or `empty` state, never as a thrown error.
#[wasm_bindgen]
pub fn aggregate_dataset(csv_text: &str, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsInsightsConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            InsightsConfig::from(cfg)
        }
        _ => InsightsConfig::default(),
    };

    let state = LoadState::from_result(healthvision_csv::aggregate_csv_str(csv_text, &cfg));

    to_value(&state).map_err(|err| JsValue::from_str(&format!("Could not serialize insights: {err}")))
}

/// Report state for a dataset request the host page could not complete.
#[wasm_bindgen]
pub fn retrieval_failure(resource: &str, status: Option<u16>) -> Result<JsValue, JsValue> {
    let state = LoadState::from_result(Err(healthvision_core::InsightsError::Retrieval {
        resource: resource.to_string(),
        status,
        reason: "request failed".to_string(),
    }));
    to_value(&state).map_err(|err| JsValue::from_str(&format!("Could not serialize state: {err}")))
}

/// Split a numbered AI answer into `###` sections.
#[wasm_bindgen]
pub fn label_report_sections(markdown: &str) -> String {
    healthvision_core::report::label_sections(markdown)
}

/// Forget every view's saved state.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn clear_session() -> Result<(), JsValue> {
    let mut store = BrowserSessionStore::open()?;
    healthvision_core::session::clear_all(&mut store)
        .map_err(|err| JsValue::from_str(&err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_config_overrides_only_given_fields() {
        let cfg = InsightsConfig::from(JsInsightsConfig {
            delimiter: Some(';'),
            strict: Some(true),
            followup_column: Some("urgent".to_string()),
            ..JsInsightsConfig::default()
        });

        assert_eq!(cfg.delimiter, ';');
        assert_eq!(cfg.row_policy, RowPolicy::Strict);
        assert_eq!(cfg.columns.urgent_followup, "urgent");
        assert_eq!(cfg.columns.visits, "patients_visited");
    }

    #[test]
    fn empty_js_config_is_default() {
        assert_eq!(
            InsightsConfig::from(JsInsightsConfig::default()),
            InsightsConfig::default()
        );
    }
}
