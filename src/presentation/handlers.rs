// HTTP request handlers
use crate::application::relay_service::{RelayError, RelayRequest, RelayService};
use crate::infrastructure::config::Settings;
use crate::infrastructure::grafana_client::GrafanaClient;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request overrides for the environment configuration. TRMNL's plugin
/// settings post these as a JSON body; a plain GET relies on the
/// environment alone.
#[derive(Debug, Deserialize, Default)]
pub struct PanelRequestBody {
    #[serde(default)]
    pub grafana_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub dashboard_uid: Option<String>,
    #[serde(default)]
    pub panel_id: Option<Value>,
    #[serde(default)]
    pub time_from: Option<String>,
    #[serde(default)]
    pub time_to: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub grafana_url: String,
    pub api_key: String,
    pub relay: RelayRequest,
}

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Endpoint TRMNL polls for data. Body fields override environment
/// configuration field by field.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PanelRequestBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let resolved = match resolve_request(&state.settings, body) {
        Ok(resolved) => resolved,
        Err(details) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Missing or invalid configuration",
                    "details": details,
                })),
            )
                .into_response();
        }
    };

    tracing::info!(
        dashboard = %resolved.relay.dashboard_uid,
        panel = resolved.relay.panel_id,
        time_from = %resolved.relay.time_from,
        time_to = %resolved.relay.time_to,
        "handling data request"
    );

    if !state.rate_limiter.is_allowed(&resolved.grafana_url) {
        let retry_after = state.rate_limiter.retry_after(&resolved.grafana_url);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(json!({
                "error": "Rate limit exceeded",
                "retry_after": retry_after,
            })),
        )
            .into_response();
    }

    let repository = Arc::new(GrafanaClient::new(&resolved.grafana_url, &resolved.api_key));
    let service = RelayService::new(repository, state.registry.clone());

    match service.panel_variables(&resolved.relay).await {
        Ok(variables) => Json(Value::Object(variables)).into_response(),
        Err(error @ RelayError::PanelNotFound(_)) => {
            tracing::error!(%error, "panel lookup failed");
            error_response(StatusCode::NOT_FOUND, None, &error.to_string())
        }
        Err(RelayError::Query { title, message }) => {
            tracing::error!(%message, "query error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, Some(&title), &message)
        }
        Err(RelayError::Grafana(error)) => {
            tracing::error!(%error, "Grafana error");
            error_response(StatusCode::BAD_GATEWAY, None, &error.to_string())
        }
    }
}

fn error_response(status: StatusCode, title: Option<&str>, message: &str) -> Response {
    let mut payload = json!({
        "panel_type": "error",
        "error_message": message,
    });
    if let Some(title) = title {
        payload["title"] = json!(title);
    }
    (status, Json(payload)).into_response()
}

/// Merge the request body over the environment settings and validate the
/// result, collecting every problem rather than stopping at the first.
fn resolve_request(
    settings: &Settings,
    body: PanelRequestBody,
) -> Result<ResolvedRequest, Vec<String>> {
    let pick = |over: Option<String>, base: &str| {
        over.filter(|s| !s.is_empty())
            .unwrap_or_else(|| base.to_string())
    };

    let grafana_url = pick(body.grafana_url, &settings.grafana_url)
        .trim_end_matches('/')
        .to_string();
    let api_key = pick(body.api_key, &settings.grafana_api_key);
    let dashboard_uid = pick(body.dashboard_uid, &settings.dashboard_uid);

    let mut errors = Vec::new();
    if grafana_url.is_empty() {
        errors.push("grafana_url is required".to_string());
    }
    if api_key.is_empty() {
        errors.push("api_key is required".to_string());
    }
    if dashboard_uid.is_empty() {
        errors.push("dashboard_uid is required".to_string());
    }

    let panel_id = match &body.panel_id {
        Some(raw) => match coerce_panel_id(raw) {
            Some(id) => Some(id),
            None => {
                errors.push("panel_id must be an integer".to_string());
                None
            }
        },
        None => settings.panel_id,
    };
    if panel_id.is_none() && !errors.iter().any(|e| e.starts_with("panel_id")) {
        errors.push("panel_id is required".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ResolvedRequest {
        grafana_url,
        api_key,
        relay: RelayRequest {
            dashboard_uid,
            panel_id: panel_id.unwrap_or_default(),
            time_from: pick(body.time_from, &settings.time_from),
            time_to: pick(body.time_to, &settings.time_to),
            label_key: pick(body.label, &settings.label),
            timezone: pick(body.timezone, &settings.timezone),
            variables: parse_variables(body.variables),
        },
    })
}

fn coerce_panel_id(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Variables arrive either as a JSON object or as a JSON-encoded string.
/// Anything else degrades to no variables.
fn parse_variables(raw: Option<Value>) -> HashMap<String, Value> {
    let parsed = match raw {
        Some(Value::Object(map)) => Some(map),
        Some(Value::String(s)) if !s.is_empty() => serde_json::from_str::<Value>(&s)
            .ok()
            .and_then(|v| v.as_object().cloned()),
        _ => None,
    };

    parsed
        .map(|map| map.into_iter().collect())
        .unwrap_or_default()
}
