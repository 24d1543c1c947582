use crate::store::SessionStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<SessionStore>>,
    /// Client used to reach the report generator
    pub http: reqwest::Client,
    pub report_generator_url: Option<String>,
}

impl AppState {
    pub fn new(report_generator_url: Option<String>) -> Self {
        Self {
            store: Arc::new(RwLock::new(SessionStore::new())),
            http: reqwest::Client::new(),
            report_generator_url,
        }
    }
}
