// TRMNL webhook adapter
use serde_json::{Map, Value, json};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TrmnlError {
    #[error("TRMNL webhook returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("TRMNL webhook request timed out after {0:?}")]
    Timeout(Duration),

    #[error("TRMNL webhook request failed: {0}")]
    Request(String),
}

/// Client for pushing merge variables to a TRMNL plugin webhook.
#[derive(Debug, Clone)]
pub struct TrmnlClient {
    webhook_url: String,
    http: reqwest::Client,
}

impl TrmnlClient {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, merge_variables: &Map<String, Value>) -> Result<(), TrmnlError> {
        let payload = json!({"merge_variables": merge_variables});

        tracing::info!(
            variables = merge_variables.len(),
            "sending data to TRMNL webhook"
        );

        let response = self
            .http
            .post(&self.webhook_url)
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrmnlError::Timeout(REQUEST_TIMEOUT)
                } else {
                    TrmnlError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 200 {
            tracing::info!("successfully sent data to TRMNL");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.chars().take(200).collect());

        Err(TrmnlError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    /// Push an error-state payload so the device shows what went wrong.
    pub async fn send_error(&self, error_message: &str, title: &str) -> Result<(), TrmnlError> {
        let mut variables = Map::new();
        variables.insert("panel_type".to_string(), json!("error"));
        variables.insert("title".to_string(), json!(title));
        variables.insert("error_message".to_string(), json!(error_message));
        self.send(&variables).await
    }
}
