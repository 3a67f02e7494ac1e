// Query result domain model
use super::frame::DataFrame;
use serde_json::Value;

/// Outcome of one datasource query execution.
///
/// Frames are kept in response iteration order. When several queries report
/// errors the last one wins; frames from failed queries are dropped while
/// the rest are still collected.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub frames: Vec<DataFrame>,
    pub error: Option<String>,
}

impl QueryResult {
    /// Parse the `/api/ds/query` response, keyed by ref id.
    pub fn from_response(response: &Value) -> Self {
        let mut frames = Vec::new();
        let mut error = None;

        let results = response.get("results").and_then(Value::as_object);

        if let Some(results) = results {
            for (ref_id, result) in results {
                if let Some(err) = result.get("error") {
                    if !err.is_null() {
                        error = Some(
                            err.as_str()
                                .map(str::to_string)
                                .unwrap_or_else(|| err.to_string()),
                        );
                    }
                    continue;
                }

                let raw_frames = result
                    .get("frames")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();

                for raw in raw_frames {
                    let mut frame = DataFrame::from_response(raw);
                    if frame.name.is_empty() {
                        frame.name = ref_id.clone();
                    }
                    frames.push(frame);
                }
            }
        }

        Self { frames, error }
    }

    /// Representative single value: last element of the first frame's first
    /// non-time column. Null when there is no such value.
    pub fn single_value(&self) -> Value {
        let Some(frame) = self.frames.first() else {
            return Value::Null;
        };

        frame
            .value_fields()
            .first()
            .and_then(|vf| vf.values.last())
            .cloned()
            .unwrap_or(Value::Null)
    }
}
