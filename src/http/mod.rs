//! HTTP API server for external control (web frontend)
//!
//! This module provides a REST API for controlling the recording session:
//! - POST /session/start - Start the recording session
//! - POST /session/stop - Stop the recording session
//! - GET /session/status - Query session and connection state
//! - GET /transcript - Get transcript items and the interim caption
//! - POST /transcript/clear - Empty the transcript
//! - POST /transcript/seed-file - Transcribe a file and seed the transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
