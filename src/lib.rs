pub mod audio;
pub mod channel;
pub mod config;
pub mod http;
pub mod session;
pub mod transcript;
pub mod upload;

pub use audio::{AudioFrame, CaptureConfig, CaptureError, MicCapture, LIVE_SAMPLE_RATE};
pub use channel::{ChannelConfig, ChannelState, FrameSink, TranscriptChannel};
pub use config::{AudioConfig, BackendConfig, Config};
pub use http::{create_router, AppState};
pub use session::{
    SessionOptions, SessionOrchestrator, SessionStatus, SimulatedSource, SourceEvent,
    TranscriptSource,
};
pub use transcript::{
    Reconciler, TranscriptEvent, TranscriptItem, TranscriptSnapshot, TranscriptStore,
};
pub use upload::{seed_transcript, UploadClient, UploadResponse};
