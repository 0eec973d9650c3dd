pub mod capture;
pub mod pcm;

pub use capture::{CaptureConfig, CaptureError, MicCapture};
pub use pcm::{AudioFrame, LIVE_SAMPLE_RATE};
