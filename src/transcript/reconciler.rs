use crate::transcript::store::TranscriptStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum wall-clock spacing between consecutive interim caption updates.
pub const INTERIM_THROTTLE: Duration = Duration::from_millis(100);

/// One recognition result as delivered by the backend (or the simulator)
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    pub confidence: f32,
}

/// Folds the raw interim/final event stream into the transcript store.
///
/// Events are consumed one at a time in arrival order; the reconciler is
/// driven only from the session task, which keeps the store single-writer.
/// Interim updates are throttled; a held (pending) update is last-write-wins
/// and is flushed when the interval elapses, discarded by a final event, or
/// flushed by the caller on disconnect so nothing visible is lost on a drop.
pub struct Reconciler {
    store: Arc<TranscriptStore>,
    throttle: Duration,
    last_applied: Option<Instant>,
    pending: Option<String>,
}

impl Reconciler {
    pub fn new(store: Arc<TranscriptStore>) -> Self {
        Self::with_throttle(store, INTERIM_THROTTLE)
    }

    pub fn with_throttle(store: Arc<TranscriptStore>, throttle: Duration) -> Self {
        Self {
            store,
            throttle,
            last_applied: None,
            pending: None,
        }
    }

    pub async fn handle_event(&mut self, event: TranscriptEvent) {
        let text = event.text.trim();
        // Backends emit empty keep-alive style updates; ignore them entirely.
        if text.is_empty() {
            return;
        }

        if event.is_final {
            // Unconditional and atomic: the pending interim described text
            // now superseded by this item, so it is discarded, and the
            // caption clears in the same store step as the append.
            self.pending = None;
            self.store.append_final(text.to_string(), event.confidence).await;
            return;
        }

        let now = Instant::now();
        let due = self
            .last_applied
            .map_or(true, |last| now.duration_since(last) >= self.throttle);
        if due {
            self.pending = None;
            self.last_applied = Some(now);
            self.store.set_interim(text.to_string()).await;
        } else {
            self.pending = Some(text.to_string());
        }
    }

    /// When an interim update is being held, the instant it becomes due.
    /// The session task sleeps until this so a burst followed by silence
    /// still surfaces its last revision.
    pub fn pending_deadline(&self) -> Option<Instant> {
        match (&self.pending, self.last_applied) {
            (Some(_), Some(last)) => Some(last + self.throttle),
            _ => None,
        }
    }

    /// Apply the held interim update immediately. Called when the throttle
    /// deadline fires and when the channel drops out of `connected`.
    pub async fn flush_pending(&mut self) {
        if let Some(text) = self.pending.take() {
            self.last_applied = Some(Instant::now());
            self.store.set_interim(text).await;
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
