// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::application::relay_service::{RelayError, RelayRequest, RelayService};
use crate::application::transformers::TransformerRegistry;
use crate::infrastructure::config::{Settings, load_settings};
use crate::infrastructure::grafana_client::GrafanaClient;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::infrastructure::trmnl_client::TrmnlClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_data, health};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let settings = load_settings()?;
    let registry = Arc::new(TransformerRegistry::new());
    tracing::debug!(types = ?registry.supported_types(), "transformers registered");

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--once") {
        settings.validate_for_push()?;
        let ok = fetch_and_send(&settings, registry).await;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }
    if args.iter().any(|a| a == "--push") {
        settings.validate_for_push()?;
        run_push_loop(settings, registry).await;
        return Ok(());
    }

    serve(settings, registry).await
}

/// HTTP polling mode: TRMNL fetches merge variables from this service.
async fn serve(settings: Settings, registry: Arc<TransformerRegistry>) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        settings,
        registry,
        rate_limiter: RateLimiter::new(),
    });

    let router = Router::new()
        .route("/health", get(health))
        .route("/", get(get_data).post(get_data))
        .route("/api/data", get(get_data).post(get_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
    tracing::info!("starting grafana-trmnl-relay on {addr}");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

/// Push mode: fetch on an interval and deliver to the TRMNL webhook.
async fn run_push_loop(settings: Settings, registry: Arc<TransformerRegistry>) {
    tracing::info!(interval = settings.interval, "starting continuous push mode");

    loop {
        fetch_and_send(&settings, registry.clone()).await;
        tracing::info!("sleeping for {} seconds", settings.interval);
        tokio::time::sleep(Duration::from_secs(settings.interval)).await;
    }
}

async fn fetch_and_send(settings: &Settings, registry: Arc<TransformerRegistry>) -> bool {
    let repository = Arc::new(GrafanaClient::new(
        &settings.grafana_url,
        &settings.grafana_api_key,
    ));
    let service = RelayService::new(repository, registry);
    let trmnl = TrmnlClient::new(&settings.trmnl_webhook_url);

    let request = RelayRequest {
        dashboard_uid: settings.dashboard_uid.clone(),
        panel_id: settings.panel_id.unwrap_or_default(),
        time_from: settings.time_from.clone(),
        time_to: settings.time_to.clone(),
        label_key: settings.label.clone(),
        timezone: settings.timezone.clone(),
        variables: Default::default(),
    };

    tracing::info!(
        dashboard = %request.dashboard_uid,
        panel = request.panel_id,
        "fetching panel data"
    );

    let (error_title, error_message) = match service.panel_variables(&request).await {
        Ok(variables) => match trmnl.send(&variables).await {
            Ok(()) => return true,
            Err(error) => {
                tracing::error!(%error, "TRMNL error");
                return false;
            }
        },
        Err(error @ RelayError::PanelNotFound(_)) => {
            ("Configuration Error", error.to_string())
        }
        Err(RelayError::Query { title, message }) => {
            tracing::error!(%message, "query error");
            return send_error_payload(&trmnl, &title, &message).await;
        }
        Err(RelayError::Grafana(error)) => ("Grafana Error", error.to_string()),
    };

    tracing::error!(error = %error_message, "fetch failed");
    send_error_payload(&trmnl, error_title, &error_message).await
}

async fn send_error_payload(trmnl: &TrmnlClient, title: &str, message: &str) -> bool {
    if let Err(error) = trmnl.send_error(message, title).await {
        tracing::error!(%error, "failed to deliver error payload");
    }
    false
}
