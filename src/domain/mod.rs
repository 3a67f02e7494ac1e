// Domain layer - Grafana data models
pub mod frame;
pub mod panel;
pub mod query;
