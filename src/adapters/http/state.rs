use std::sync::Arc;

use crate::application::services::AnalysisService;
use crate::config::UiConfig;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Decode, detect and annotate uploaded images.
    pub analysis: Arc<AnalysisService>,
    /// Confidence slider bounds; its default applies when a request omits the threshold.
    pub ui: Arc<UiConfig>,
}
