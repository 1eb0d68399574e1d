use std::sync::Arc;

use crate::config::Config;
use crate::image_client::IrisGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Edit-capable or generate-only strategy, chosen once at startup from config.
    pub generator: Arc<dyn IrisGenerator>,
}
