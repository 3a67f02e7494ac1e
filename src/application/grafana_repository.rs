// Repository trait for the Grafana fetch boundary
use crate::domain::panel::Dashboard;
use crate::domain::query::QueryResult;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum GrafanaError {
    #[error("{0}")]
    Auth(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("Grafana API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("{0}")]
    Connection(String),
}

#[async_trait]
pub trait GrafanaRepository: Send + Sync {
    /// Fetch a dashboard by uid.
    async fn get_dashboard(&self, uid: &str) -> Result<Dashboard, GrafanaError>;

    /// Execute prepared query targets against `/api/ds/query`.
    async fn query(
        &self,
        queries: Vec<Value>,
        time_from: &str,
        time_to: &str,
    ) -> Result<QueryResult, GrafanaError>;
}
