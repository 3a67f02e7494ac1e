// Single-value ("stat") panel transformer
use super::base::{as_number, base_variables, format_value, threshold_color};
use super::{TransformOptions, Transformer};
use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use serde_json::{Map, Value, json};

/// Produces `value`, `formatted_value`, `color` and, when the first frame
/// carries more than one point, a `sparkline` series. Also the universal
/// fallback for unknown panel types.
pub struct StatTransformer;

impl Transformer for StatTransformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        _options: &TransformOptions,
    ) -> Map<String, Value> {
        let mut variables = base_variables("stat", panel);

        let value = query_result.single_value();
        variables.insert("value".to_string(), value.clone());
        variables.insert(
            "formatted_value".to_string(),
            json!(format_value(&value, &panel.unit(), panel.decimals())),
        );

        let color = match as_number(&value) {
            Some(n) => threshold_color(Some(n), panel),
            None => "green".to_string(),
        };
        variables.insert("color".to_string(), json!(color));

        let sparkline = extract_sparkline(query_result);
        if !sparkline.is_empty() {
            variables.insert("sparkline".to_string(), Value::Array(sparkline));
        }

        variables
    }
}

fn extract_sparkline(query_result: &QueryResult) -> Vec<Value> {
    let Some(frame) = query_result.frames.first() else {
        return Vec::new();
    };

    let time_values = frame.time_values();
    let value_fields = frame.value_fields();

    let Some(first) = value_fields.first() else {
        return Vec::new();
    };
    if time_values.is_empty() || first.values.len() <= 1 {
        return Vec::new();
    }

    time_values
        .iter()
        .zip(first.values)
        .filter(|(_, v)| !v.is_null())
        .map(|(t, v)| json!({"time": t, "value": v}))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn panel() -> Panel {
        Panel::from_response(&json!({
            "id": 1,
            "type": "stat",
            "title": "CPU Usage",
            "fieldConfig": {"defaults": {
                "unit": "percent",
                "thresholds": {"steps": [
                    {"value": null, "color": "green"},
                    {"value": 80, "color": "red"}
                ]}
            }}
        }))
    }

    fn result_with_series(values: Value) -> QueryResult {
        QueryResult::from_response(&json!({
            "results": {"A": {"frames": [{
                "schema": {"fields": [
                    {"name": "Time", "type": "time"},
                    {"name": "usage", "type": "number"}
                ]},
                "data": {"values": [[1700000000000i64, 1700000060000i64, 1700000120000i64], values]}
            }]}}
        }))
    }

    #[test]
    fn test_value_and_color() {
        let transformer = StatTransformer;
        let result = result_with_series(json!([70.0, 85.0, 92.5]));
        let vars = transformer.transform(&panel(), &result, &TransformOptions::default());

        assert_eq!(vars["value"], json!(92.5));
        assert_eq!(vars["formatted_value"], json!("92.5%"));
        assert_eq!(vars["color"], json!("red"));
        assert_eq!(vars["panel_type"], json!("stat"));
        assert_eq!(vars["title"], json!("CPU Usage"));
    }

    #[test]
    fn test_sparkline_drops_null_points() {
        let transformer = StatTransformer;
        let result = result_with_series(json!([70.0, null, 92.5]));
        let vars = transformer.transform(&panel(), &result, &TransformOptions::default());

        let sparkline = vars["sparkline"].as_array().unwrap();
        assert_eq!(sparkline.len(), 2);
        assert_eq!(sparkline[0]["value"], json!(70.0));
    }

    #[test]
    fn test_no_sparkline_for_single_point() {
        let transformer = StatTransformer;
        let result = QueryResult::from_response(&json!({
            "results": {"A": {"frames": [{
                "schema": {"fields": [
                    {"name": "Time", "type": "time"},
                    {"name": "usage"}
                ]},
                "data": {"values": [[1700000000000i64], [42.0]]}
            }]}}
        }));
        let vars = transformer.transform(&panel(), &result, &TransformOptions::default());
        assert!(!vars.contains_key("sparkline"));
    }

    #[test]
    fn test_empty_result() {
        let transformer = StatTransformer;
        let vars = transformer.transform(
            &panel(),
            &QueryResult::default(),
            &TransformOptions::default(),
        );

        assert_eq!(vars["value"], Value::Null);
        assert_eq!(vars["formatted_value"], json!("N/A"));
        assert_eq!(vars["color"], json!("green"));
    }
}
