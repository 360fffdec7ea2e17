//! Insights dashboard component for WebAssembly hosts.

#[cfg(target_arch = "wasm32")]
mod styles;

use healthvision_core::ChartDatum;

/// Width of a bar relative to the largest one in its chart, in percent.
pub fn bar_width_percent(count: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        (count as f64 / max as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// `"3 (30%)"` style label; percentages are omitted for an empty chart.
pub fn format_count(count: u64, total: u64, with_share: bool) -> String {
    if with_share && total > 0 {
        format!("{count} ({:.0}%)", count as f64 / total as f64 * 100.0)
    } else {
        count.to_string()
    }
}

/// Colour token for a chart label; unknown labels use the default bar colour.
pub fn tone_for(label: &str) -> &'static str {
    match label {
        "Low Risk" => "low",
        "High Risk" => "high",
        "No Heart Disease" => "heart-no",
        "Heart Disease" => "heart-yes",
        "Never Smoked" => "never",
        "Former Smoker" => "former",
        "Current Smoker" => "current",
        "No Diabetes" => "no-diabetes",
        "Diabetic" => "diabetic",
        _ => "default",
    }
}

/// Largest count and sum of counts in one chart.
pub fn chart_totals(data: &[ChartDatum]) -> (u64, u64) {
    data.iter().fold((0, 0), |(max, total), datum| {
        (max.max(datum.count), total + datum.count)
    })
}

#[cfg(target_arch = "wasm32")]
mod wasm_ui {
    use crate::{bar_width_percent, chart_totals, format_count, styles, tone_for};
    use healthvision_core::{ChartDatum, DatasetInsights, LoadState};
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::prelude::*;
    use web_sys::{console, Document, Element, Window};
    use yew::prelude::*;

    #[derive(Properties, PartialEq)]
    pub struct InsightsViewProps {
        pub state: LoadState,
    }

    #[function_component(InsightsView)]
    fn insights_view(props: &InsightsViewProps) -> Html {
        use_effect_with((), |_| {
            if let Some(window) = web_sys::window() {
                if let Some(document) = window.document() {
                    if let Err(err) = styles::ensure_styles(&document) {
                        console::error_1(&err);
                    }
                }
            }
            || ()
        });

        let show_share = use_state(|| false);
        let on_toggle_share = {
            let show_share = show_share.clone();
            Callback::from(move |_| show_share.set(!*show_share))
        };

        let body = match &props.state {
            LoadState::Loading => html! { <div class="graph-loading">{"Loading graphs..."}</div> },
            LoadState::Failed { message, .. } => {
                html! { <div class="graph-error" role="alert">{ message.clone() }</div> }
            }
            LoadState::Empty { message, .. } => {
                html! { <div class="graph-empty">{ message.clone() }</div> }
            }
            LoadState::Ready { insights } => render_charts(insights, *show_share, on_toggle_share),
        };

        html! {
            <div class="card graph-root">
                <header>
                    <h2>{"Graphical Insights"}</h2>
                    <p class="graph-subtitle">
                        {"Visual showing how risk and key factors change across your patients."}
                    </p>
                </header>
                { body }
            </div>
        }
    }

    fn render_charts(insights: &DatasetInsights, show_share: bool, on_toggle: Callback<MouseEvent>) -> Html {
        let toggle_label = if show_share { "Show counts" } else { "Show percentages" };
        html! {
            <>
                <div class="graph-toolbar">
                    <span>{ format!("{} patients, {} skipped rows", insights.rows_total, insights.rows_skipped) }</span>
                    <button type="button" onclick={on_toggle}>{ toggle_label }</button>
                </div>
                <section class="graph-section">
                    <h3 class="graph-section-title">{"Patient Distribution Overview"}</h3>
                    <div class="graph-row">
                        { render_chart("Visit Count Distribution", &insights.visit_chart(), show_share) }
                        { render_chart("Risk Class Distribution", &insights.risk_chart(), show_share) }
                    </div>
                </section>
                <section class="graph-section">
                    <h3 class="graph-section-title">{"Health Indicators"}</h3>
                    <div class="graph-row">
                        { render_chart("Heart Disease Distribution", &insights.heart_chart(), show_share) }
                        { render_chart("Smoking Status", &insights.smoking_chart(), show_share) }
                        { render_chart("Diabetes Distribution", &insights.diabetes_chart(), show_share) }
                    </div>
                </section>
            </>
        }
    }

    fn render_chart(title: &str, data: &[ChartDatum], show_share: bool) -> Html {
        let (max, total) = chart_totals(data);
        html! {
            <div class="graph-box">
                <h4>{ title.to_string() }</h4>
                <ul class="bar-list">
                    { for data.iter().map(|datum| render_bar(datum, max, total, show_share)) }
                </ul>
            </div>
        }
    }

    fn render_bar(datum: &ChartDatum, max: u64, total: u64, show_share: bool) -> Html {
        let width = format!("width: {:.1}%", bar_width_percent(datum.count, max));
        html! {
            <li class="bar-row">
                <span class="bar-label">{ datum.label.clone() }</span>
                <span class="bar-track">
                    <span class="bar-fill" data-tone={tone_for(&datum.label)} style={width}></span>
                </span>
                <span class="bar-count">{ format_count(datum.count, total, show_share) }</span>
            </li>
        }
    }

    #[wasm_bindgen]
    pub fn mount_insights_view(selector: &str, state: JsValue) -> Result<(), JsValue> {
        let window: Window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document: Document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Could not access document"))?;

        let target: Element = document
            .query_selector(selector)
            .map_err(|err| JsValue::from_str(&format!("Invalid selector: {err:?}")))?
            .ok_or_else(|| JsValue::from_str("No element matches the selector"))?;

        let state: LoadState = from_value(state)?;

        yew::Renderer::<InsightsView>::with_root_and_props(target, InsightsViewProps { state })
            .render();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_ui::mount_insights_view;

#[cfg(not(target_arch = "wasm32"))]
pub fn mount_insights_view(_: &str, _: wasm_bindgen::JsValue) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "healthvision-ui only supports the wasm32 target",
    ))
}
