use crate::session::SessionOrchestrator;
use crate::transcript::TranscriptStore;
use crate::upload::UploadClient;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub store: Arc<TranscriptStore>,
    pub uploader: Arc<UploadClient>,
}
