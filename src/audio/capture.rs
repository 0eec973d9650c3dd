use crate::audio::pcm::{self, AudioFrame};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Configuration for microphone capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Requested sample rate in Hz (the device's native rate wins; the
    /// actual rate is carried on every frame)
    pub sample_rate: u32,
    /// Device name, or "default" for the system default input device
    pub device: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: pcm::LIVE_SAMPLE_RATE,
            device: "default".to_string(),
        }
    }
}

/// Errors that can occur while acquiring the microphone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user declined microphone access
    PermissionDenied,
    /// No usable capture device
    DeviceUnavailable,
    /// Any other acquisition failure
    Unknown(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied => {
                write!(f, "Microphone access was denied. Check the system's microphone permissions.")
            }
            CaptureError::DeviceUnavailable => {
                write!(f, "No audio input device is available")
            }
            CaptureError::Unknown(msg) => write!(f, "Audio capture failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Captures microphone audio and emits fixed-format PCM frames.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated capture
/// thread; frames cross into async land over a bounded channel. `stop()`
/// flips the active flag before the stream is dropped, so a device callback
/// already in flight delivers nothing after teardown completes.
pub struct MicCapture {
    config: CaptureConfig,
    active: Arc<AtomicBool>,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        }
    }

    /// Acquire the input device and start producing frames.
    ///
    /// Resolves once the device callback is live (or acquisition failed).
    /// No retries happen here; retry policy belongs to the caller. Calling
    /// while already capturing is a caller error.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.active.load(Ordering::SeqCst) {
            return Err(CaptureError::Unknown("capture already started".to_string()));
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let active = Arc::clone(&self.active);
        let config = self.config.clone();
        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread(config, active, frame_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::Unknown(e.to_string()))?;

        self.thread = Some(thread);
        self.stop_tx = Some(stop_tx);

        match ready_rx.await {
            Ok(Ok(rate)) => {
                info!("Audio capture started at {} Hz", rate);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.join_thread();
                Err(e)
            }
            Err(_) => {
                self.join_thread();
                Err(CaptureError::Unknown(
                    "capture thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Stop producing frames and release the input device.
    ///
    /// Returns only after the capture thread has dropped the stream; no
    /// frame is delivered once this returns.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.stop_tx.take(); // dropping the sender unparks the capture thread
        self.join_thread();
    }

    pub fn is_capturing(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    config: CaptureConfig,
    active: Arc<AtomicBool>,
    frames: mpsc::Sender<AudioFrame>,
    ready: oneshot::Sender<Result<u32, CaptureError>>,
    stop: std::sync::mpsc::Receiver<()>,
) {
    match build_stream(&config, Arc::clone(&active), frames) {
        Ok((stream, rate)) => {
            if let Err(e) = stream.play() {
                let _ = ready.send(Err(CaptureError::Unknown(e.to_string())));
                return;
            }
            active.store(true, Ordering::SeqCst);
            if ready.send(Ok(rate)).is_err() {
                // Caller went away before acquisition resolved (stop raced
                // start); tear down without ever delivering a frame.
                active.store(false, Ordering::SeqCst);
                return;
            }
            // Park until stop() drops its sender.
            let _ = stop.recv();
            active.store(false, Ordering::SeqCst);
            drop(stream);
            debug!("Capture thread exited");
        }
        Err(e) => {
            let _ = ready.send(Err(e));
        }
    }
}

fn build_stream(
    config: &CaptureConfig,
    active: Arc<AtomicBool>,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();

    let device = if config.device == "default" {
        host.default_input_device()
            .ok_or(CaptureError::DeviceUnavailable)?
    } else {
        find_device(&host, &config.device)?
    };

    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device
        .default_input_config()
        .map_err(classify_config_error)?;
    let device_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;

    if device_rate != config.sample_rate {
        warn!(
            "Requested {} Hz but device uses {} Hz. Capturing at device rate.",
            config.sample_rate, device_rate
        );
    }
    info!("Capture device: {} ({} Hz, {} channels)", name, device_rate, channels);

    let started = std::time::Instant::now();
    let stream_config = supported.config();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if !active.load(Ordering::SeqCst) {
                    return;
                }
                deliver(&frames, pcm::downmix_to_mono_i16(data, channels), device_rate, started);
            },
            |err| warn!("Audio stream error: {}", err),
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !active.load(Ordering::SeqCst) {
                    return;
                }
                deliver(&frames, pcm::downmix_to_mono_f32(data, channels), device_rate, started);
            },
            |err| warn!("Audio stream error: {}", err),
            None,
        ),
        other => {
            return Err(CaptureError::Unknown(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(classify_build_error)?;

    Ok((stream, device_rate))
}

/// The device callback must never block; a full queue drops the frame.
fn deliver(
    frames: &mpsc::Sender<AudioFrame>,
    samples: Vec<i16>,
    sample_rate: u32,
    started: std::time::Instant,
) {
    if samples.is_empty() {
        return;
    }
    let frame = AudioFrame {
        samples,
        sample_rate,
        channels: 1,
        timestamp_ms: started.elapsed().as_millis() as u64,
    };
    let _ = frames.try_send(frame);
}

fn find_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, CaptureError> {
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::Unknown(e.to_string()))?;
    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_name {
                return Ok(device);
            }
        }
    }
    Err(CaptureError::DeviceUnavailable)
}

fn classify_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::DefaultStreamConfigError::BackendSpecific { err } => classify_backend_error(err),
        other => CaptureError::Unknown(other.to_string()),
    }
}

fn classify_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::BuildStreamError::BackendSpecific { err } => classify_backend_error(err),
        other => CaptureError::Unknown(other.to_string()),
    }
}

fn classify_backend_error(err: cpal::BackendSpecificError) -> CaptureError {
    let msg = err.description.to_lowercase();
    if msg.contains("permission") || msg.contains("denied") || msg.contains("not permitted") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Unknown(err.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_distinct() {
        assert_ne!(CaptureError::PermissionDenied, CaptureError::DeviceUnavailable);
        assert_ne!(
            CaptureError::DeviceUnavailable,
            CaptureError::Unknown("x".to_string())
        );
    }

    #[test]
    fn permission_error_is_actionable() {
        let msg = CaptureError::PermissionDenied.to_string();
        assert!(msg.to_lowercase().contains("permission"));
    }

    #[test]
    fn backend_errors_mentioning_permissions_are_classified() {
        let err = cpal::BackendSpecificError {
            description: "Access denied by user".to_string(),
        };
        assert_eq!(classify_backend_error(err), CaptureError::PermissionDenied);

        let err = cpal::BackendSpecificError {
            description: "something else broke".to_string(),
        };
        assert!(matches!(classify_backend_error(err), CaptureError::Unknown(_)));
    }
}
