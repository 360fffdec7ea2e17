#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Node};

const STYLE_TAG_SELECTOR: &str = "style[data-healthvision-ui]";

/// Default CSS for the dashboard; override the custom properties to theme it.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --insights-font-family: 'Inter', system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
  --insights-card-bg: #ffffff;
  --insights-card-border: rgba(148, 163, 184, 0.28);
  --insights-radius: 14px;
  --insights-text: #1f2933;
  --insights-muted: #52606d;
  --insights-bar: #4a63ff;
  --insights-bar-track: rgba(74, 99, 255, 0.1);
  --insights-low: #4caf50;
  --insights-high: #e53935;
  --insights-heart-no: #64b5f6;
  --insights-heart-yes: #c62828;
  --insights-smoke-never: #ffb74d;
  --insights-smoke-former: #fb8c00;
  --insights-smoke-current: #e65100;
  --insights-diabetes-no: #81c784;
  --insights-diabetes-yes: #388e3c;
  --insights-error-bg: rgba(229, 57, 53, 0.1);
  --insights-error-text: #b42318;
}

.graph-root {
  font-family: var(--insights-font-family);
  color: var(--insights-text);
  display: flex;
  flex-direction: column;
  gap: 24px;
  padding: 24px;
}

.graph-root h2 {
  margin: 0;
}

.graph-subtitle {
  margin: 4px 0 0;
  color: var(--insights-muted);
}

.graph-loading,
.graph-empty {
  color: var(--insights-muted);
  padding: 16px 0;
}

.graph-error {
  background: var(--insights-error-bg);
  color: var(--insights-error-text);
  border-radius: 10px;
  padding: 12px 16px;
  font-weight: 600;
}

.graph-section + .graph-section {
  margin-top: 24px;
}

.graph-section-title {
  margin: 0 0 12px;
  font-size: 1.1rem;
}

.graph-row {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(280px, 1fr));
  gap: 18px;
}

.graph-box {
  background: var(--insights-card-bg);
  border: 1px solid var(--insights-card-border);
  border-radius: var(--insights-radius);
  padding: 16px 18px;
}

.graph-box h4 {
  margin: 0 0 12px;
}

.graph-toolbar {
  display: flex;
  justify-content: space-between;
  align-items: center;
  color: var(--insights-muted);
  font-size: 0.9rem;
}

.graph-toolbar button {
  border: 1px solid var(--insights-card-border);
  background: transparent;
  border-radius: 999px;
  padding: 6px 12px;
  cursor: pointer;
}

.bar-list {
  list-style: none;
  margin: 0;
  padding: 0;
  display: flex;
  flex-direction: column;
  gap: 8px;
}

.bar-row {
  display: grid;
  grid-template-columns: minmax(90px, 140px) 1fr auto;
  align-items: center;
  gap: 10px;
  font-size: 0.92rem;
}

.bar-label {
  overflow: hidden;
  text-overflow: ellipsis;
  white-space: nowrap;
}

.bar-track {
  background: var(--insights-bar-track);
  border-radius: 6px;
  height: 14px;
  overflow: hidden;
}

.bar-fill {
  background: var(--insights-bar);
  height: 100%;
  border-radius: 6px;
}

.bar-fill[data-tone="low"] { background: var(--insights-low); }
.bar-fill[data-tone="high"] { background: var(--insights-high); }
.bar-fill[data-tone="heart-no"] { background: var(--insights-heart-no); }
.bar-fill[data-tone="heart-yes"] { background: var(--insights-heart-yes); }
.bar-fill[data-tone="never"] { background: var(--insights-smoke-never); }
.bar-fill[data-tone="former"] { background: var(--insights-smoke-former); }
.bar-fill[data-tone="current"] { background: var(--insights-smoke-current); }
.bar-fill[data-tone="no-diabetes"] { background: var(--insights-diabetes-no); }
.bar-fill[data-tone="diabetic"] { background: var(--insights-diabetes-yes); }

.bar-count {
  font-variant-numeric: tabular-nums;
  font-weight: 600;
}

@media (max-width: 640px) {
  .graph-root {
    padding: 16px;
  }

  .bar-row {
    grid-template-columns: 1fr auto;
  }

  .bar-track {
    grid-column: 1 / -1;
  }
}
"#;

pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.query_selector(STYLE_TAG_SELECTOR)?.is_some() {
        return Ok(());
    }

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("Document has no <head>"))?;

    let style_el = document.create_element("style")?;
    style_el.set_attribute("data-healthvision-ui", "v1")?;
    style_el.set_text_content(Some(DEFAULT_STYLES));
    head.append_child(&style_el.clone().dyn_into::<Node>()?)?;

    Ok(())
}
