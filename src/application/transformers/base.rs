// Shared formatting helpers for panel transformers
use crate::domain::panel::Panel;
use chrono::Utc;
use serde_json::{Map, Value, json};

/// Variables common to every panel type.
pub fn base_variables(panel_type: &str, panel: &Panel) -> Map<String, Value> {
    let mut variables = Map::new();
    variables.insert("panel_type".to_string(), json!(panel_type));
    variables.insert("title".to_string(), json!(panel.title));
    variables.insert("description".to_string(), json!(panel.description));
    variables.insert(
        "timestamp".to_string(),
        json!(Utc::now().format("%Y-%m-%d %H:%M UTC").to_string()),
    );
    variables.insert("unit".to_string(), json!(panel.unit()));
    variables
}

/// Numeric view of a JSON value. Booleans are not numbers here.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Wrap a float as a JSON number, collapsing integral values to integers so
/// templates render `42` rather than `42.0`.
pub fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Format a value with unit suffix and decimal handling.
///
/// Null renders as `"N/A"`. Floats honor an explicit decimal count; without
/// one, integral floats render as integers and the rest round to two places.
pub fn format_value(value: &Value, unit: &str, decimals: Option<i64>) -> String {
    let rendered = match value {
        Value::Null => return "N/A".to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                let f = n.as_f64().unwrap_or(0.0);
                if let Some(d) = decimals {
                    format!("{:.*}", d.max(0) as usize, f)
                } else if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    format!("{}", (f * 100.0).round() / 100.0)
                }
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };

    format!("{rendered}{}", unit_suffix(unit))
}

fn unit_suffix(unit: &str) -> String {
    match unit {
        "" => String::new(),
        "percent" | "percentunit" => "%".to_string(),
        "bytes" | "decbytes" => " B".to_string(),
        "bits" => " b".to_string(),
        "s" | "ms" | "ns" => unit.to_string(),
        other => format!(" {other}"),
    }
}

/// Collapse a Grafana color (name or hex-ish string) to a simple name.
pub fn color_name(color: Option<&str>) -> &'static str {
    let Some(color) = color.filter(|c| !c.is_empty()) else {
        return "green";
    };

    let lower = color.to_lowercase();
    if lower.contains("green") {
        "green"
    } else if lower.contains("yellow") || lower.contains("orange") {
        "yellow"
    } else if lower.contains("red") {
        "red"
    } else if lower.contains("blue") {
        "blue"
    } else {
        "green"
    }
}

/// Color for a value under the panel's threshold steps.
///
/// Steps are scanned in their given order; a step applies when its value is
/// null (baseline) or at most the measured value, and the last applicable
/// step wins.
pub fn threshold_color(value: Option<f64>, panel: &Panel) -> String {
    let Some(value) = value else {
        return "green".to_string();
    };

    let steps = panel.thresholds();
    if steps.is_empty() {
        return "green".to_string();
    }

    let mut color = "green";
    for step in &steps {
        let applies = match step.value {
            None => true,
            Some(step_value) => value >= step_value,
        };
        if applies {
            color = color_name(step.color.as_deref());
        }
    }
    color.to_string()
}
