use crate::application::SessionRegistry;
use crate::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, config: AppConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }
}
