use crate::channel::ChannelState;
use crate::transcript::TranscriptEvent;
use anyhow::Result;
use tokio::sync::mpsc;

/// One update on a source's event stream. Transcript events and connection
/// state changes share a single channel so the reconciler observes them in
/// the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Transcript(TranscriptEvent),
    State(ChannelState),
}

/// Anything that produces transcript events under a start/stop lifecycle.
///
/// The orchestrator depends only on this interface; the live websocket
/// channel and the local simulator both implement it, so the reconciler
/// cannot tell them apart.
#[async_trait::async_trait]
pub trait TranscriptSource: Send {
    /// Start producing events.
    ///
    /// Returns a channel receiver that will receive source events.
    async fn start(&mut self) -> Result<mpsc::Receiver<SourceEvent>>;

    /// Stop producing events. For the live channel this is the
    /// caller-initiated disconnect.
    async fn stop(&mut self) -> Result<()>;

    /// Get source name for logging
    fn name(&self) -> &str;
}
