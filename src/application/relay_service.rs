// Relay service - fetch a panel, query it, transform the result
use crate::application::grafana_repository::{GrafanaError, GrafanaRepository};
use crate::application::transformers::{TransformOptions, TransformerRegistry};
use crate::application::variables::substitute_variables;
use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One fetch-transform request. Instances are request-scoped; nothing is
/// cached across cycles.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub dashboard_uid: String,
    pub panel_id: i64,
    pub time_from: String,
    pub time_to: String,
    pub label_key: String,
    pub timezone: String,
    pub variables: HashMap<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("panel {0} not found in dashboard")]
    PanelNotFound(i64),

    #[error("{message}")]
    Query { title: String, message: String },

    #[error(transparent)]
    Grafana(#[from] GrafanaError),
}

#[derive(Clone)]
pub struct RelayService {
    repository: Arc<dyn GrafanaRepository>,
    registry: Arc<TransformerRegistry>,
}

impl RelayService {
    pub fn new(repository: Arc<dyn GrafanaRepository>, registry: Arc<TransformerRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// Run one full cycle: dashboard fetch, panel lookup, variable
    /// interpolation, query execution and transformation.
    ///
    /// An upstream query error short-circuits before any transformer runs.
    pub async fn panel_variables(
        &self,
        request: &RelayRequest,
    ) -> Result<Map<String, Value>, RelayError> {
        let dashboard = self.repository.get_dashboard(&request.dashboard_uid).await?;
        tracing::debug!(
            dashboard = %dashboard.title,
            panels = dashboard.panels.len(),
            tags = ?dashboard.tags,
            "fetched dashboard"
        );

        let panel = dashboard
            .panel_by_id(request.panel_id)
            .ok_or(RelayError::PanelNotFound(request.panel_id))?;

        tracing::info!(
            panel = %panel.title,
            panel_type = %panel.panel_type,
            datasource = ?panel.datasource_uid(),
            targets = panel.targets.len(),
            "found panel"
        );

        let queries = prepare_queries(panel, &request.variables);
        let result = if queries.is_empty() {
            QueryResult::default()
        } else {
            self.repository
                .query(queries, &request.time_from, &request.time_to)
                .await?
        };

        if let Some(error) = result.error {
            return Err(RelayError::Query {
                title: panel.title.clone(),
                message: error,
            });
        }

        tracing::info!(frames = result.frames.len(), "query returned");

        let transformer = self.registry.dispatch(&panel.panel_type);
        let options = TransformOptions {
            label_key: request.label_key.clone(),
            timezone: request.timezone.clone(),
        };
        Ok(transformer.transform(panel, &result, &options))
    }
}

/// Copy the panel's targets, fill in a missing per-target datasource from
/// the panel default, and interpolate template variables. The stored
/// targets are never mutated.
fn prepare_queries(panel: &Panel, variables: &HashMap<String, Value>) -> Vec<Value> {
    panel
        .targets
        .iter()
        .map(|target| {
            let mut query = target.clone();
            let has_datasource = query
                .get("datasource")
                .is_some_and(|ds| !ds.is_null());
            if !has_datasource {
                if let (Some(ds), Some(obj)) = (&panel.datasource, query.as_object_mut()) {
                    obj.insert("datasource".to_string(), ds.clone());
                }
            }
            substitute_variables(&query, variables)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::Dashboard;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeRepository {
        dashboard: Value,
        query_response: Value,
    }

    #[async_trait]
    impl GrafanaRepository for FakeRepository {
        async fn get_dashboard(&self, _uid: &str) -> Result<Dashboard, GrafanaError> {
            Ok(Dashboard::from_response(&self.dashboard))
        }

        async fn query(
            &self,
            _queries: Vec<Value>,
            _time_from: &str,
            _time_to: &str,
        ) -> Result<QueryResult, GrafanaError> {
            Ok(QueryResult::from_response(&self.query_response))
        }
    }

    fn service(repository: FakeRepository) -> RelayService {
        RelayService::new(Arc::new(repository), Arc::new(TransformerRegistry::new()))
    }

    fn request() -> RelayRequest {
        RelayRequest {
            dashboard_uid: "abc".to_string(),
            panel_id: 1,
            time_from: "now-1h".to_string(),
            time_to: "now".to_string(),
            label_key: "name".to_string(),
            timezone: "UTC".to_string(),
            variables: HashMap::new(),
        }
    }

    fn dashboard_with_panel(panel: Value) -> Value {
        json!({"dashboard": {"uid": "abc", "title": "D", "panels": [panel]}})
    }

    #[tokio::test]
    async fn test_happy_path_dispatches_by_panel_type() {
        let repository = FakeRepository {
            dashboard: dashboard_with_panel(json!({
                "id": 1,
                "type": "stat",
                "title": "CPU",
                "targets": [{"refId": "A", "expr": "up"}]
            })),
            query_response: json!({"results": {"A": {"frames": [{
                "schema": {"fields": [{"name": "v"}]},
                "data": {"values": [[7.0]]}
            }]}}}),
        };

        let vars = service(repository)
            .panel_variables(&request())
            .await
            .unwrap();

        assert_eq!(vars["panel_type"], json!("stat"));
        assert_eq!(vars["value"], json!(7.0));
    }

    #[tokio::test]
    async fn test_panel_not_found() {
        let repository = FakeRepository {
            dashboard: json!({"dashboard": {"uid": "abc", "panels": []}}),
            query_response: json!({}),
        };

        let err = service(repository)
            .panel_variables(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::PanelNotFound(1)));
    }

    #[tokio::test]
    async fn test_query_error_short_circuits() {
        let repository = FakeRepository {
            dashboard: dashboard_with_panel(json!({
                "id": 1,
                "type": "stat",
                "title": "CPU",
                "targets": [{"refId": "A"}]
            })),
            query_response: json!({"results": {"A": {"error": "datasource unreachable"}}}),
        };

        let err = service(repository)
            .panel_variables(&request())
            .await
            .unwrap_err();
        match err {
            RelayError::Query { title, message } => {
                assert_eq!(title, "CPU");
                assert_eq!(message, "datasource unreachable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_prepare_queries_fills_datasource_and_interpolates() {
        let panel = Panel::from_response(&json!({
            "id": 1,
            "type": "stat",
            "datasource": {"uid": "ds-1", "type": "prometheus"},
            "targets": [
                {"refId": "A", "expr": "up{env=\"$env\"}"},
                {"refId": "B", "datasource": {"uid": "ds-2"}}
            ]
        }));
        let variables = HashMap::from([("env".to_string(), json!("prod"))]);

        let queries = prepare_queries(&panel, &variables);

        assert_eq!(queries[0]["datasource"]["uid"], json!("ds-1"));
        assert_eq!(queries[0]["expr"], json!("up{env=\"prod\"}"));
        // A target's own datasource is kept.
        assert_eq!(queries[1]["datasource"]["uid"], json!("ds-2"));
        // The panel's stored targets are untouched.
        assert_eq!(panel.targets[0]["expr"], json!("up{env=\"$env\"}"));
        assert!(panel.targets[0].get("datasource").is_none());
    }
}
