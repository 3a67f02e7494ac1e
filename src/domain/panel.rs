// Panel and dashboard domain models
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// One (value, color) breakpoint of a threshold scale. A null value marks
/// the baseline step.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdStep {
    pub value: Option<f64>,
    pub color: Option<String>,
}

/// Display configuration of one dashboard panel.
#[derive(Debug, Clone)]
pub struct Panel {
    pub id: i64,
    pub panel_type: String,
    pub title: String,
    pub description: String,
    pub targets: Vec<Value>,
    pub options: Value,
    pub field_config: Value,
    pub datasource: Option<Value>,
    pub transformations: Vec<Value>,
}

impl Panel {
    pub fn from_response(raw: &Value) -> Self {
        Self {
            id: raw.get("id").and_then(Value::as_i64).unwrap_or(0),
            panel_type: raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            title: raw
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Untitled")
                .to_string(),
            description: raw
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            targets: raw
                .get("targets")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            options: raw.get("options").cloned().unwrap_or(Value::Null),
            field_config: raw.get("fieldConfig").cloned().unwrap_or(Value::Null),
            datasource: raw.get("datasource").filter(|d| !d.is_null()).cloned(),
            transformations: raw
                .get("transformations")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn defaults(&self) -> Option<&Value> {
        self.field_config.get("defaults")
    }

    pub fn unit(&self) -> String {
        self.defaults()
            .and_then(|d| d.get("unit"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn decimals(&self) -> Option<i64> {
        self.defaults()
            .and_then(|d| d.get("decimals"))
            .and_then(Value::as_i64)
    }

    pub fn thresholds(&self) -> Vec<ThresholdStep> {
        self.defaults()
            .and_then(|d| d.get("thresholds"))
            .and_then(|t| t.get("steps"))
            .and_then(Value::as_array)
            .map(|steps| {
                steps
                    .iter()
                    .map(|step| ThresholdStep {
                        value: step.get("value").and_then(Value::as_f64),
                        color: step
                            .get("color")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn min_max(&self) -> (Option<f64>, Option<f64>) {
        let min = self
            .defaults()
            .and_then(|d| d.get("min"))
            .and_then(Value::as_f64);
        let max = self
            .defaults()
            .and_then(|d| d.get("max"))
            .and_then(Value::as_f64);
        (min, max)
    }

    /// Field names hidden by `organize` transformations, across all of them.
    pub fn excluded_fields(&self) -> HashSet<String> {
        let mut excluded = HashSet::new();
        for options in self.organize_options() {
            if let Some(map) = options.get("excludeByName").and_then(Value::as_object) {
                for (name, is_excluded) in map {
                    if is_excluded.as_bool().unwrap_or(false) {
                        excluded.insert(name.clone());
                    }
                }
            }
        }
        excluded
    }

    /// Rename map from `organize` transformations, later entries winning.
    pub fn field_renames(&self) -> HashMap<String, String> {
        let mut renames = HashMap::new();
        for options in self.organize_options() {
            if let Some(map) = options.get("renameByName").and_then(Value::as_object) {
                for (name, renamed) in map {
                    if let Some(renamed) = renamed.as_str() {
                        renames.insert(name.clone(), renamed.to_string());
                    }
                }
            }
        }
        renames
    }

    fn organize_options(&self) -> impl Iterator<Item = &Value> {
        self.transformations
            .iter()
            .filter(|t| t.get("id").and_then(Value::as_str) == Some("organize"))
            .filter_map(|t| t.get("options"))
    }

    /// Datasource uid, from the panel default or the first target carrying one.
    pub fn datasource_uid(&self) -> Option<String> {
        if let Some(ds) = &self.datasource {
            if let Some(uid) = ds.get("uid").and_then(Value::as_str) {
                return Some(uid.to_string());
            }
        }
        for target in &self.targets {
            if let Some(uid) = target
                .get("datasource")
                .and_then(|ds| ds.get("uid"))
                .and_then(Value::as_str)
            {
                return Some(uid.to_string());
            }
        }
        None
    }
}

/// A dashboard and the panels it owns.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub uid: String,
    pub title: String,
    pub panels: Vec<Panel>,
    pub tags: Vec<String>,
}

impl Dashboard {
    /// Parse the `/api/dashboards/uid/<uid>` response. Panels nested inside
    /// collapsed rows are flattened into the panel list.
    pub fn from_response(response: &Value) -> Self {
        let dashboard = response.get("dashboard").cloned().unwrap_or(Value::Null);

        let mut panels = Vec::new();
        let raw_panels = dashboard
            .get("panels")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for raw in raw_panels {
            let is_row = raw.get("type").and_then(Value::as_str) == Some("row");
            match raw.get("panels").and_then(Value::as_array) {
                Some(nested) if is_row => {
                    panels.extend(nested.iter().map(Panel::from_response));
                }
                _ => panels.push(Panel::from_response(raw)),
            }
        }

        Self {
            uid: dashboard
                .get("uid")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: dashboard
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Untitled")
                .to_string(),
            panels,
            tags: dashboard
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn panel_by_id(&self, panel_id: i64) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == panel_id)
    }
}
