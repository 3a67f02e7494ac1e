// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod grafana_client;
pub mod rate_limiter;
pub mod trmnl_client;
