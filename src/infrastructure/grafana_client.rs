// Grafana HTTP API adapter
use crate::application::grafana_repository::{GrafanaError, GrafanaRepository};
use crate::domain::panel::Dashboard;
use crate::domain::query::QueryResult;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct GrafanaClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl GrafanaClient {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, GrafanaError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http
            .request(method, &url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GrafanaError::Connection(format!("request to {url} timed out"))
            } else {
                GrafanaError::Connection(format!(
                    "failed to connect to {}: {e}",
                    self.base_url
                ))
            }
        })?;

        let status = response.status();
        match status.as_u16() {
            401 => return Err(GrafanaError::Auth("invalid or expired API key".to_string())),
            403 => {
                return Err(GrafanaError::Auth(
                    "API key does not have permission for this operation".to_string(),
                ));
            }
            404 => return Err(GrafanaError::NotFound(path.to_string())),
            _ if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(GrafanaError::Api {
                    status: status.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GrafanaError::Connection(format!("invalid response from {url}: {e}")))
    }
}

#[async_trait]
impl GrafanaRepository for GrafanaClient {
    async fn get_dashboard(&self, uid: &str) -> Result<Dashboard, GrafanaError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/dashboards/uid/{uid}"), None)
            .await?;
        Ok(Dashboard::from_response(&response))
    }

    async fn query(
        &self,
        queries: Vec<Value>,
        time_from: &str,
        time_to: &str,
    ) -> Result<QueryResult, GrafanaError> {
        let payload = json!({
            "from": time_from,
            "to": time_to,
            "queries": queries,
        });

        let response = self
            .request(reqwest::Method::POST, "/api/ds/query", Some(&payload))
            .await?;
        Ok(QueryResult::from_response(&response))
    }
}
