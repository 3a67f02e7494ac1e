// Gauge and bar-gauge panel transformers
use super::base::{as_number, base_variables, format_value, json_number, threshold_color};
use super::{TransformOptions, Transformer};
use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use serde_json::{Map, Value, json};

/// Single value against a configured min/max range, with the value's
/// position expressed as a clamped percentage.
pub struct GaugeTransformer;

impl Transformer for GaugeTransformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        _options: &TransformOptions,
    ) -> Map<String, Value> {
        let mut variables = base_variables("gauge", panel);

        let value = query_result.single_value();
        variables.insert("value".to_string(), value.clone());

        let (min, max) = gauge_range(panel);
        variables.insert("min".to_string(), json_number(min));
        variables.insert("max".to_string(), json_number(max));

        variables.insert(
            "formatted_value".to_string(),
            json!(format_value(&value, &panel.unit(), panel.decimals())),
        );

        match as_number(&value) {
            Some(n) => {
                variables.insert("percentage".to_string(), json!(percentage(n, min, max)));
                variables.insert("color".to_string(), json!(threshold_color(Some(n), panel)));
            }
            None => {
                variables.insert("percentage".to_string(), json!(0));
                variables.insert("color".to_string(), json!("green"));
            }
        }

        variables
    }
}

/// Like the gauge, but every non-time column of every frame becomes one
/// horizontal bar; the panel-level keys mirror the first bar.
pub struct BarGaugeTransformer;

impl Transformer for BarGaugeTransformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        _options: &TransformOptions,
    ) -> Map<String, Value> {
        let mut variables = base_variables("bargauge", panel);

        let (min, max) = gauge_range(panel);
        variables.insert("min".to_string(), json_number(min));
        variables.insert("max".to_string(), json_number(max));

        let unit = panel.unit();
        let decimals = panel.decimals();

        let mut bars = Vec::new();
        for frame in &query_result.frames {
            for value_field in frame.value_fields() {
                let Some(last) = value_field.values.last() else {
                    continue;
                };
                let Some(n) = as_number(last) else {
                    continue;
                };
                bars.push(json!({
                    "name": value_field.name,
                    "value": last,
                    "formatted_value": format_value(last, &unit, decimals),
                    "percentage": percentage(n, min, max),
                    "color": threshold_color(Some(n), panel),
                }));
            }
        }

        match bars.first().cloned() {
            Some(first) => {
                variables.insert("value".to_string(), first["value"].clone());
                variables.insert(
                    "formatted_value".to_string(),
                    first["formatted_value"].clone(),
                );
                variables.insert("percentage".to_string(), first["percentage"].clone());
                variables.insert("color".to_string(), first["color"].clone());
            }
            None => {
                variables.insert("value".to_string(), Value::Null);
                variables.insert("formatted_value".to_string(), json!("N/A"));
                variables.insert("percentage".to_string(), json!(0));
                variables.insert("color".to_string(), json!("green"));
            }
        }
        variables.insert("bars".to_string(), Value::Array(bars));

        variables
    }
}

fn gauge_range(panel: &Panel) -> (f64, f64) {
    let (min, max) = panel.min_max();
    (min.unwrap_or(0.0), max.unwrap_or(100.0))
}

/// Position of `value` within `[min, max]` as a whole-number percentage,
/// clamped to `[0, 100]`. A degenerate range maps to all-or-nothing.
fn percentage(value: f64, min: f64, max: f64) -> i64 {
    if max == min {
        return if value >= max { 100 } else { 0 };
    }
    let pct = (value - min) / (max - min) * 100.0;
    (pct.round() as i64).clamp(0, 100)
}
