// Multi-stat ("polystat") panel transformer
use super::base::{as_number, base_variables, format_value};
use super::{TransformOptions, Transformer};
use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use serde_json::{Map, Value, json};

/// One stat entry per frame, named through a Prometheus label lookup, with
/// an ok/warning/critical status derived from thresholds.
pub struct PolystatTransformer;

impl Transformer for PolystatTransformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        options: &TransformOptions,
    ) -> Map<String, Value> {
        let mut variables = base_variables("polystat", panel);

        let unit = panel.unit();
        let decimals = panel.decimals();

        let mut stats = Vec::new();
        for frame in &query_result.frames {
            let name = frame.display_name(&options.label_key);

            let value = frame
                .value_fields()
                .first()
                .and_then(|vf| vf.values.last())
                .cloned()
                .unwrap_or(Value::Null);

            stats.push(json!({
                "name": name,
                "value": value,
                "formatted_value": format_value(&value, &unit, decimals),
                "status": status(&value, panel),
            }));
        }

        variables.insert("stats".to_string(), Value::Array(stats));
        variables
    }
}

/// Status resolution, in order: textual states, the panel's
/// `globalThresholdsConfig` exact-value table, then standard threshold steps.
/// Without any thresholds a value of zero reads as a down service.
fn status(value: &Value, panel: &Panel) -> &'static str {
    if value.is_null() {
        return "ok";
    }

    let Some(number) = as_number(value) else {
        let text = text_of(value).to_lowercase();
        if ["error", "down", "fail", "critical"]
            .iter()
            .any(|s| text.contains(s))
        {
            return "critical";
        }
        if ["warn", "degraded"].iter().any(|s| text.contains(s)) {
            return "warning";
        }
        return "ok";
    };

    if let Some(global) = panel
        .options
        .get("globalThresholdsConfig")
        .and_then(Value::as_array)
    {
        for entry in global {
            if entry.get("value").and_then(Value::as_f64) == Some(number) {
                return match entry.get("state").and_then(Value::as_i64) {
                    Some(2) => "critical",
                    Some(1) => "warning",
                    _ => "ok",
                };
            }
        }
        return "ok";
    }

    let steps = panel.thresholds();
    if steps.is_empty() {
        return if number == 0.0 { "critical" } else { "ok" };
    }

    let mut color = "green".to_string();
    for step in &steps {
        let applies = match step.value {
            None => true,
            Some(step_value) => number >= step_value,
        };
        if applies {
            color = step.color.clone().unwrap_or_else(|| "green".to_string());
        }
    }

    let color = color.to_lowercase();
    if color.contains("red") {
        "critical"
    } else if color.contains("yellow") || color.contains("orange") {
        "warning"
    } else {
        "ok"
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
