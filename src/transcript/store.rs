use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A committed transcript entry. Immutable once appended; the sequence is
/// append-only and only emptied by an explicit clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub id: Uuid,
    pub text: String,
    pub is_final: bool,
    pub confidence: f32,
    pub timestamp: Option<String>,
}

impl TranscriptItem {
    fn finalized(text: String, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            is_final: true,
            confidence,
            timestamp: Some(chrono::Local::now().format("%H:%M:%S").to_string()),
        }
    }
}

/// Word-level timing from an uploaded-file transcription, kept for
/// synchronized playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedSegment {
    pub transcript: String,
    pub words: Vec<TimedWord>,
}

/// Read view of the transcript state
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptSnapshot {
    pub items: Vec<TranscriptItem>,
    pub interim: String,
    pub timed_words: Vec<TimedWord>,
    pub timed_segments: Vec<TimedSegment>,
}

#[derive(Debug, Default)]
struct TranscriptState {
    items: Vec<TranscriptItem>,
    interim: String,
    timed_words: Vec<TimedWord>,
    timed_segments: Vec<TimedSegment>,
}

/// Owns the finalized transcript sequence and the single interim caption.
///
/// Mutation goes through the reconciler (or an explicit clear/seed), readers
/// come from the HTTP handlers. Appending a final item and clearing the
/// interim caption happen under one write lock, so no reader observes the
/// caption describing text that is already committed.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    inner: RwLock<TranscriptState>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized item and clear the interim caption in one step.
    pub async fn append_final(&self, text: String, confidence: f32) {
        let mut state = self.inner.write().await;
        state.items.push(TranscriptItem::finalized(text, confidence));
        state.interim.clear();
    }

    /// Replace the interim caption wholesale.
    pub async fn set_interim(&self, text: String) {
        let mut state = self.inner.write().await;
        state.interim = text;
    }

    pub async fn clear_interim(&self) {
        let mut state = self.inner.write().await;
        state.interim.clear();
    }

    /// Empty the whole transcript, including seeded timing data.
    pub async fn clear(&self) {
        let mut state = self.inner.write().await;
        *state = TranscriptState::default();
    }

    pub async fn snapshot(&self) -> TranscriptSnapshot {
        let state = self.inner.read().await;
        TranscriptSnapshot {
            items: state.items.clone(),
            interim: state.interim.clone(),
            timed_words: state.timed_words.clone(),
            timed_segments: state.timed_segments.clone(),
        }
    }

    pub async fn item_count(&self) -> usize {
        self.inner.read().await.items.len()
    }

    pub async fn interim(&self) -> String {
        self.inner.read().await.interim.clone()
    }

    /// Seed the transcript from a plain full-text result (upload
    /// collaborator), replacing whatever is present. The text is split into
    /// sentence items so the transcript reads like a live session.
    pub async fn seed_plain(&self, transcript: &str) {
        let sentences = split_sentences(transcript);
        let mut state = self.inner.write().await;
        *state = TranscriptState::default();
        if sentences.is_empty() {
            let trimmed = transcript.trim();
            if !trimmed.is_empty() {
                state.items.push(TranscriptItem::finalized(trimmed.to_string(), 1.0));
            }
            return;
        }
        for sentence in sentences {
            state.items.push(TranscriptItem::finalized(sentence, 1.0));
        }
    }

    /// Seed the transcript from a timed result, keeping word timings for
    /// playback sync alongside a single full-text item.
    pub async fn seed_timed(
        &self,
        transcript: &str,
        words: Vec<TimedWord>,
        segments: Vec<TimedSegment>,
    ) {
        let mut state = self.inner.write().await;
        *state = TranscriptState::default();
        state
            .items
            .push(TranscriptItem::finalized(transcript.trim().to_string(), 1.0));
        state.timed_words = words;
        state.timed_segments = segments;
    }
}

/// Split a full transcript into sentences on `.`, `!` and `?` boundaries
/// followed by whitespace (so "3.14" stays intact).
fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminators() {
        let parts = split_sentences("One. Two! Three? Four");
        assert_eq!(parts, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn decimal_points_do_not_split() {
        let parts = split_sentences("Pi is 3.14 exactly. Almost.");
        assert_eq!(parts, vec!["Pi is 3.14 exactly.", "Almost."]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(split_sentences("   ").is_empty());
    }
}
