use healthvision_core::session::SessionStore;
use healthvision_core::InsightsError;
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// `SessionStore` backed by `window.sessionStorage`.
pub struct BrowserSessionStore {
    storage: Storage,
}

impl BrowserSessionStore {
    pub fn open() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let storage = window
            .session_storage()?
            .ok_or_else(|| JsValue::from_str("sessionStorage is unavailable"))?;
        Ok(Self { storage })
    }
}

fn js_error(err: JsValue) -> InsightsError {
    InsightsError::Session(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

impl SessionStore for BrowserSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, InsightsError> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), InsightsError> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn clear(&mut self, key: &str) -> Result<(), InsightsError> {
        self.storage.remove_item(key).map_err(js_error)
    }
}
