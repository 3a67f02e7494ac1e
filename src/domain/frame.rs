// Data frame domain model
use serde_json::Value;
use std::collections::BTreeMap;

/// Field names Grafana commonly uses for time columns.
pub const TIME_FIELD_NAMES: [&str; 4] = ["Time", "time", "timestamp", "Timestamp"];

/// Schema of one field (column) inside a data frame.
///
/// Parsed defensively: a malformed field descriptor yields an empty schema
/// rather than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchema {
    pub name: Option<String>,
    pub field_type: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl FieldSchema {
    pub fn from_value(raw: &Value) -> Self {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let field_type = raw
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let labels = raw
            .get("labels")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name,
            field_type,
            labels,
        }
    }

    /// Whether this field holds timestamps, by declared type or by name.
    pub fn is_time(&self) -> bool {
        if self.field_type.as_deref() == Some("time") {
            return true;
        }
        matches!(&self.name, Some(n) if TIME_FIELD_NAMES.contains(&n.as_str()))
    }
}

/// One non-time column of a frame, paired with its schema.
#[derive(Debug, Clone)]
pub struct ValueField<'a> {
    /// Field name, falling back to a positional placeholder.
    pub name: String,
    pub field: &'a FieldSchema,
    pub values: &'a [Value],
}

/// One named table/series returned by a query.
///
/// Values are column-major: `values[i]` holds every value of `fields[i]`
/// across all rows. The field/value correspondence is positional, so the
/// lengths may disagree and consumers bounds-check.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    pub name: String,
    pub fields: Vec<FieldSchema>,
    pub values: Vec<Vec<Value>>,
}

impl DataFrame {
    /// Parse a frame from either wire shape.
    ///
    /// Timeseries responses nest fields under `schema.fields` and values under
    /// `data.values`; table responses put both at the frame root. Each part is
    /// resolved independently so mixed payloads still parse.
    pub fn from_response(raw: &Value) -> Self {
        let schema = raw.get("schema");
        let data = raw.get("data");

        let fields = schema
            .and_then(|s| s.get("fields"))
            .and_then(Value::as_array)
            .filter(|arr| !arr.is_empty())
            .or_else(|| raw.get("fields").and_then(Value::as_array))
            .map(|arr| arr.iter().map(FieldSchema::from_value).collect())
            .unwrap_or_default();

        let values = data
            .and_then(|d| d.get("values"))
            .and_then(Value::as_array)
            .filter(|arr| !arr.is_empty())
            .or_else(|| raw.get("values").and_then(Value::as_array))
            .map(|arr| {
                arr.iter()
                    .map(|col| col.as_array().cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let name = schema
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .or_else(|| raw.get("name").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        Self {
            name,
            fields,
            values,
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| f.name.clone().unwrap_or_else(|| format!("field_{i}")))
            .collect()
    }

    pub fn values_by_field_name(&self, name: &str) -> Option<&[Value]> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .filter(|&i| i < self.values.len())
            .map(|i| self.values[i].as_slice())
    }

    /// Time column of the frame.
    ///
    /// Resolution order: a field with `type == "time"`, then the common time
    /// field names, then the first column if its first value looks like a
    /// unix timestamp. Empty when nothing matches.
    pub fn time_values(&self) -> &[Value] {
        for (i, field) in self.fields.iter().enumerate() {
            if field.field_type.as_deref() == Some("time") && i < self.values.len() {
                return &self.values[i];
            }
        }
        for name in TIME_FIELD_NAMES {
            if let Some(values) = self.values_by_field_name(name) {
                return values;
            }
        }
        if let Some(first_col) = self.values.first() {
            if let Some(first_val) = first_col.first().and_then(Value::as_f64) {
                if first_val > 1_000_000_000.0 {
                    return first_col;
                }
            }
        }
        &[]
    }

    /// All non-time columns in field order.
    pub fn value_fields(&self) -> Vec<ValueField<'_>> {
        let mut result = Vec::new();
        for (i, field) in self.fields.iter().enumerate() {
            if field.is_time() || i >= self.values.len() {
                continue;
            }
            result.push(ValueField {
                name: field.name.clone().unwrap_or_else(|| format!("field_{i}")),
                field,
                values: &self.values[i],
            });
        }
        result
    }

    /// Display name for the frame, preferring a Prometheus-style label.
    ///
    /// Falls back to the frame name unless that is a bare ref id, then to
    /// `"Unknown"`.
    pub fn display_name(&self, label_key: &str) -> String {
        for field in &self.fields {
            if matches!(&field.name, Some(n) if TIME_FIELD_NAMES.contains(&n.as_str())) {
                continue;
            }
            if let Some(label) = field.labels.get(label_key) {
                return label.clone();
            }
        }

        if !self.name.is_empty() && !["A", "B", "C", "D", "E"].contains(&self.name.as_str()) {
            return self.name.clone();
        }

        "Unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested_frame() -> Value {
        json!({
            "schema": {
                "name": "cpu",
                "fields": [
                    {"name": "Time", "type": "time"},
                    {"name": "usage", "type": "number"}
                ]
            },
            "data": {
                "values": [[1700000000000i64, 1700000060000i64], [42.5, 43.1]]
            }
        })
    }

    fn flat_frame() -> Value {
        json!({
            "name": "cpu",
            "fields": [
                {"name": "Time", "type": "time"},
                {"name": "usage", "type": "number"}
            ],
            "values": [[1700000000000i64, 1700000060000i64], [42.5, 43.1]]
        })
    }

    #[test]
    fn test_both_shapes_parse_identically() {
        let nested = DataFrame::from_response(&nested_frame());
        let flat = DataFrame::from_response(&flat_frame());

        assert_eq!(nested.name, flat.name);
        assert_eq!(nested.fields, flat.fields);
        assert_eq!(nested.values, flat.values);
    }

    #[test]
    fn test_mixed_shape_resolves_per_part() {
        // Name at root, fields under schema, values under data.
        let frame = DataFrame::from_response(&json!({
            "name": "memory",
            "schema": {"fields": [{"name": "used"}]},
            "data": {"values": [[100, 200]]}
        }));

        assert_eq!(frame.name, "memory");
        assert_eq!(frame.field_names(), vec!["used"]);
        assert_eq!(frame.values, vec![vec![json!(100), json!(200)]]);
    }

    #[test]
    fn test_field_names_placeholder_for_unnamed() {
        let frame = DataFrame::from_response(&json!({
            "fields": [{"type": "number"}, {"name": "x"}],
            "values": [[1], [2]]
        }));
        assert_eq!(frame.field_names(), vec!["field_0", "x"]);
    }

    #[test]
    fn test_time_values_by_type() {
        let frame = DataFrame::from_response(&nested_frame());
        assert_eq!(frame.time_values().len(), 2);
        assert_eq!(frame.time_values()[0], json!(1700000000000i64));
    }

    #[test]
    fn test_time_values_by_name() {
        let frame = DataFrame::from_response(&json!({
            "fields": [{"name": "timestamp"}, {"name": "v"}],
            "values": [[1, 2], [3, 4]]
        }));
        assert_eq!(frame.time_values(), &[json!(1), json!(2)]);
    }

    #[test]
    fn test_time_values_first_column_heuristic() {
        let frame = DataFrame::from_response(&json!({
            "fields": [{"name": "ts"}, {"name": "v"}],
            "values": [[1700000000i64, 1700000060i64], [3, 4]]
        }));
        assert_eq!(frame.time_values().len(), 2);

        // Small numbers do not look like timestamps.
        let frame = DataFrame::from_response(&json!({
            "fields": [{"name": "a"}, {"name": "b"}],
            "values": [[1, 2], [3, 4]]
        }));
        assert!(frame.time_values().is_empty());
    }

    #[test]
    fn test_value_fields_skip_time() {
        let frame = DataFrame::from_response(&nested_frame());
        let fields = frame.value_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "usage");
        assert_eq!(fields[0].values, &[json!(42.5), json!(43.1)]);
    }

    #[test]
    fn test_value_fields_bounds_checked() {
        // More fields than value columns.
        let frame = DataFrame::from_response(&json!({
            "fields": [{"name": "a"}, {"name": "b"}],
            "values": [[1]]
        }));
        assert_eq!(frame.value_fields().len(), 1);
    }

    #[test]
    fn test_display_name_from_labels() {
        let frame = DataFrame::from_response(&json!({
            "schema": {
                "name": "A",
                "fields": [
                    {"name": "Time", "type": "time"},
                    {"name": "Value", "labels": {"service_name": "api-gateway"}}
                ]
            },
            "data": {"values": [[], []]}
        }));
        assert_eq!(frame.display_name("service_name"), "api-gateway");
        // Missing label key falls through to the frame name, which is a
        // bare ref id here.
        assert_eq!(frame.display_name("job"), "Unknown");
    }

    #[test]
    fn test_display_name_from_frame_name() {
        let frame = DataFrame::from_response(&json!({
            "name": "node-exporter",
            "fields": [{"name": "Value"}],
            "values": [[1]]
        }));
        assert_eq!(frame.display_name("name"), "node-exporter");
    }
}
