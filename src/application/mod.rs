// Application layer - Use cases and transformation pipeline
pub mod grafana_repository;
pub mod relay_service;
pub mod transformers;
pub mod variables;
