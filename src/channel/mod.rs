//! Duplex channel to the transcription backend
//!
//! Outbound: raw linear16 PCM frames, one per binary message. Inbound: JSON
//! recognition events. The socket task owns the whole connect / drop /
//! reconnect-with-backoff state machine; connectivity is reported through
//! `ChannelState` transitions, never as errors across the channel boundary.

mod messages;
mod socket;

pub use messages::parse_event;
pub use socket::{ChannelConfig, ChannelState, FrameSink, TranscriptChannel};
