// Application state for HTTP handlers
use crate::application::transformers::TransformerRegistry;
use crate::infrastructure::config::Settings;
use crate::infrastructure::rate_limiter::RateLimiter;
use std::sync::Arc;

pub struct AppState {
    pub settings: Settings,
    pub registry: Arc<TransformerRegistry>,
    pub rate_limiter: RateLimiter,
}
