use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
#[error("configuration errors:\n{0}")]
pub struct ConfigError(pub String);

/// Service settings read from the environment. In HTTP mode every field may
/// be overridden per request; in push mode the Grafana and webhook settings
/// are required.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub grafana_url: String,
    #[serde(default)]
    pub grafana_api_key: String,
    #[serde(default)]
    pub dashboard_uid: String,
    #[serde(default)]
    pub panel_id: Option<i64>,
    #[serde(default = "default_time_from")]
    pub time_from: String,
    #[serde(default = "default_time_to")]
    pub time_to: String,
    #[serde(default)]
    pub trmnl_webhook_url: String,
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_time_from() -> String {
    "now-1h".to_string()
}

fn default_time_to() -> String {
    "now".to_string()
}

fn default_interval() -> u64 {
    300
}

fn default_label() -> String {
    "name".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::Environment::default())
        .build()?;

    let mut settings: Settings = settings.try_deserialize()?;
    settings.grafana_url = settings.grafana_url.trim_end_matches('/').to_string();
    Ok(settings)
}

impl Settings {
    /// Push mode needs the full Grafana and webhook configuration up front.
    pub fn validate_for_push(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.grafana_url.is_empty() {
            errors.push("GRAFANA_URL is required");
        }
        if self.grafana_api_key.is_empty() {
            errors.push("GRAFANA_API_KEY is required");
        }
        if self.dashboard_uid.is_empty() {
            errors.push("DASHBOARD_UID is required");
        }
        if self.panel_id.is_none() {
            errors.push("PANEL_ID is required");
        }
        if self.trmnl_webhook_url.is_empty() {
            errors.push("TRMNL_WEBHOOK_URL is required");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            let listing = errors
                .iter()
                .map(|e| format!("  - {e}"))
                .collect::<Vec<_>>()
                .join("\n");
            Err(ConfigError(listing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_for_push_lists_missing_fields() {
        let err = Settings::default().validate_for_push().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("GRAFANA_URL is required"));
        assert!(message.contains("TRMNL_WEBHOOK_URL is required"));
    }

    #[test]
    fn test_validate_for_push_accepts_complete_settings() {
        let settings = Settings {
            grafana_url: "https://grafana.example.com".to_string(),
            grafana_api_key: "glsa_xxx".to_string(),
            dashboard_uid: "abc".to_string(),
            panel_id: Some(3),
            trmnl_webhook_url: "https://usetrmnl.com/api/custom_plugins/x".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate_for_push().is_ok());
    }
}
