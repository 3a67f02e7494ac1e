// Time series panel transformer
use super::base::{as_number, base_variables, format_value, json_number};
use super::{TransformOptions, Transformer};
use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use chrono::DateTime;
use serde_json::{Map, Value, json};

/// One series per non-time column of every frame, with per-series
/// statistics and a flat list of chart points. Also serves the legacy
/// `graph` and `barchart` panel types under their own names.
pub struct TimeSeriesTransformer {
    panel_type: &'static str,
}

impl TimeSeriesTransformer {
    pub fn new(panel_type: &'static str) -> Self {
        Self { panel_type }
    }
}

impl Transformer for TimeSeriesTransformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        options: &TransformOptions,
    ) -> Map<String, Value> {
        let mut variables = base_variables(self.panel_type, panel);

        let unit = panel.unit();
        let decimals = panel.decimals();

        let mut series_list = Vec::new();
        let mut chart_data = Vec::new();

        for frame in &query_result.frames {
            let time_values = frame.time_values();

            for value_field in frame.value_fields() {
                let name = value_field
                    .field
                    .labels
                    .get(&options.label_key)
                    .cloned()
                    .or_else(|| value_field.field.name.clone().filter(|n| !n.is_empty()))
                    .unwrap_or_else(|| "Value".to_string());

                let numeric: Vec<f64> =
                    value_field.values.iter().filter_map(as_number).collect();

                let current = numeric.last().copied();
                let min = numeric.iter().copied().reduce(f64::min);
                let max = numeric.iter().copied().reduce(f64::max);
                let avg = (!numeric.is_empty())
                    .then(|| numeric.iter().sum::<f64>() / numeric.len() as f64)
                    .map(|a| (a * 100.0).round() / 100.0);

                let points: Vec<Value> = time_values
                    .iter()
                    .zip(value_field.values)
                    .filter(|(_, v)| !v.is_null())
                    .map(|(t, v)| {
                        json!({
                            "time": format_timestamp(t),
                            "value": v,
                            "label": name,
                        })
                    })
                    .collect();

                let current_value = current.map(json_number).unwrap_or(Value::Null);
                series_list.push(json!({
                    "name": name,
                    "current": current_value,
                    "formatted_current": format_value(&current_value, &unit, decimals),
                    "min": min.map(json_number).unwrap_or(Value::Null),
                    "max": max.map(json_number).unwrap_or(Value::Null),
                    "avg": avg.map(json_number).unwrap_or(Value::Null),
                    "point_count": points.len(),
                }));
                chart_data.extend(points);
            }
        }

        if let Some(first) = series_list.first() {
            variables.insert("current_value".to_string(), first["current"].clone());
            variables.insert(
                "formatted_value".to_string(),
                first["formatted_current"].clone(),
            );
            variables.insert("min_value".to_string(), first["min"].clone());
            variables.insert("max_value".to_string(), first["max"].clone());
            variables.insert("avg_value".to_string(), first["avg"].clone());
        }

        variables.insert("series".to_string(), Value::Array(series_list));
        variables.insert("chart_data".to_string(), Value::Array(chart_data));

        variables
    }
}

/// Render a timestamp as `HH:MM` UTC. Values above 10^12 are taken to be
/// milliseconds, the rest seconds. Anything non-numeric passes through as
/// its string form.
fn format_timestamp(ts: &Value) -> String {
    match ts {
        Value::Null => String::new(),
        Value::Number(n) => {
            let Some(mut seconds) = n.as_f64() else {
                return n.to_string();
            };
            if seconds > 1_000_000_000_000.0 {
                seconds /= 1000.0;
            }
            match DateTime::from_timestamp(seconds as i64, 0) {
                Some(dt) => dt.format("%H:%M").to_string(),
                None => n.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
