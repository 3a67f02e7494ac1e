// Table panel transformer
use super::base::base_variables;
use super::{TransformOptions, Transformer};
use crate::domain::frame::DataFrame;
use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

/// Label columns listed here lead the Prometheus-shape table, in this order.
const PRIORITY_COLUMNS: [&str; 5] = ["service_name", "name", "instance", "job", "state"];

/// Rebuilds tabular rows out of column-major frame values.
///
/// Single-frame results transpose directly. Multi-frame results where the
/// fields carry Prometheus labels are reassembled into one row per frame,
/// with the label keys as columns.
pub struct TableTransformer {
    panel_type: &'static str,
}

impl TableTransformer {
    pub fn new(panel_type: &'static str) -> Self {
        Self { panel_type }
    }
}

impl Transformer for TableTransformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        options: &TransformOptions,
    ) -> Map<String, Value> {
        let mut variables = base_variables(self.panel_type, panel);

        let excluded = panel.excluded_fields();
        let renames = panel.field_renames();

        let (columns, rows) = if is_prometheus_shape(query_result) {
            prometheus_table(query_result, options, &excluded)
        } else {
            standard_table(query_result, &excluded, &renames)
        };

        variables.insert("row_count".to_string(), json!(rows.len()));
        variables.insert("columns".to_string(), json!(columns));
        variables.insert(
            "rows".to_string(),
            Value::Array(rows.into_iter().map(Value::from).collect()),
        );

        variables
    }
}

/// A multi-frame result whose first frame carries Prometheus labels is a set
/// of instant-query series, not a table split over frames. A single frame
/// with labels still goes through the standard path.
fn is_prometheus_shape(query_result: &QueryResult) -> bool {
    if query_result.frames.len() <= 1 {
        return false;
    }
    let Some(first) = query_result.frames.first() else {
        return false;
    };
    first
        .value_fields()
        .iter()
        .any(|vf| !vf.field.labels.is_empty())
}

fn standard_table(
    query_result: &QueryResult,
    excluded: &HashSet<String>,
    renames: &HashMap<String, String>,
) -> (Vec<String>, Vec<Vec<String>>) {
    let Some(frame) = query_result.frames.first() else {
        return (Vec::new(), Vec::new());
    };

    let names = frame.field_names();
    let kept: Vec<usize> = (0..names.len())
        .filter(|&i| !excluded.contains(&names[i]))
        .collect();

    let columns: Vec<String> = kept
        .iter()
        .map(|&i| {
            renames
                .get(&names[i])
                .filter(|r| !r.is_empty())
                .cloned()
                .unwrap_or_else(|| names[i].clone())
        })
        .collect();

    let row_count = kept
        .first()
        .and_then(|&i| frame.values.get(i))
        .map(Vec::len)
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(row_count);
    for row_idx in 0..row_count {
        let row = kept
            .iter()
            .map(|&col_idx| {
                frame
                    .values
                    .get(col_idx)
                    .and_then(|col| col.get(row_idx))
                    .map(format_cell)
                    .unwrap_or_default()
            })
            .collect();
        rows.push(row);
    }

    (columns, rows)
}

fn prometheus_table(
    query_result: &QueryResult,
    options: &TransformOptions,
    excluded: &HashSet<String>,
) -> (Vec<String>, Vec<Vec<String>>) {
    // Union of label keys across every frame's value fields.
    let mut seen: HashSet<&str> = HashSet::new();
    for frame in &query_result.frames {
        for vf in frame.value_fields() {
            for key in vf.field.labels.keys() {
                if key != "__name__" && !excluded.contains(key) {
                    seen.insert(key.as_str());
                }
            }
        }
    }

    let mut label_keys: Vec<String> = PRIORITY_COLUMNS
        .iter()
        .filter(|k| seen.remove(*k))
        .map(|k| k.to_string())
        .collect();
    let mut rest: Vec<String> = seen.into_iter().map(str::to_string).collect();
    rest.sort_unstable();
    label_keys.extend(rest);

    let include_value = !excluded.contains("Value");
    let mut columns = label_keys.clone();
    if include_value {
        columns.push("Value".to_string());
    }

    let mut rows = Vec::with_capacity(query_result.frames.len());
    for frame in &query_result.frames {
        rows.push(frame_row(frame, &label_keys, include_value));
    }

    // Keep the rows readable: order by the configured label column.
    if let Some(sort_idx) = label_keys.iter().position(|k| *k == options.label_key) {
        rows.sort_by_key(|row: &Vec<String>| row[sort_idx].to_lowercase());
    }

    (columns, rows)
}

fn frame_row(frame: &DataFrame, label_keys: &[String], include_value: bool) -> Vec<String> {
    let value_fields = frame.value_fields();

    let mut labels: HashMap<&str, &str> = HashMap::new();
    for vf in &value_fields {
        for (key, value) in &vf.field.labels {
            labels.entry(key.as_str()).or_insert(value.as_str());
        }
    }

    let mut row: Vec<String> = label_keys
        .iter()
        .map(|key| labels.get(key.as_str()).map(|v| v.to_string()).unwrap_or_default())
        .collect();

    if include_value {
        let value = value_fields
            .first()
            .and_then(|vf| vf.values.last())
            .cloned()
            .unwrap_or(Value::Null);
        row.push(format_cell(&value));
    }

    row
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(n) if n.is_f64() => {
            let f = n.as_f64().unwrap_or(0.0);
            if f.fract() == 0.0 {
                format!("{}", f as i64)
            } else {
                format!("{f:.2}")
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "Yes" } else { "No" }.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
