use crate::transcript::TranscriptEvent;
use serde::Deserialize;

/// Inbound recognition message as sent by the backend over `/listen`.
/// Unknown fields are ignored; `confidence` may be absent or null.
#[derive(Debug, Deserialize)]
struct WireEvent {
    text: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse one inbound message payload.
///
/// Returns `None` for malformed payloads; the channel discards those
/// silently without touching its state.
pub fn parse_event(payload: &str) -> Option<TranscriptEvent> {
    let wire: WireEvent = serde_json::from_str(payload).ok()?;
    Some(TranscriptEvent {
        text: wire.text,
        is_final: wire.is_final,
        confidence: wire.confidence.unwrap_or(1.0),
    })
}
