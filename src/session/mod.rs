//! Recording session orchestration
//!
//! Ties the recording intent to the capture encoder and the duplex channel:
//! - At most one live encoder/channel pair per process
//! - Capture gated on the channel reaching `connected`
//! - Stop order: encoder first, then caller-initiated channel disconnect
//! - Substitutable event source (live websocket vs local simulator)

mod orchestrator;
mod simulator;
mod source;

pub use orchestrator::{SessionOptions, SessionOrchestrator, SessionStatus};
pub use simulator::SimulatedSource;
pub use source::{SourceEvent, TranscriptSource};
