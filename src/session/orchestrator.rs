use crate::audio::{pcm, AudioFrame, CaptureConfig, MicCapture};
use crate::channel::{ChannelConfig, ChannelState, FrameSink, TranscriptChannel};
use crate::config::{AudioConfig, BackendConfig};
use crate::session::{SimulatedSource, SourceEvent, TranscriptSource};
use crate::transcript::{Reconciler, TranscriptStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Options for starting a recording session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Use the local synthetic event generator instead of the live channel
    /// (no microphone, no backend)
    pub simulate: bool,
    /// Backend session id correlating the audio to server-side context
    /// (keyword biasing)
    pub remote_session_id: Option<String>,
}

/// Snapshot of the recording session for the status surface
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    pub simulated: bool,
    pub remote_session_id: Option<String>,
    /// Connection state of the live channel; absent for simulated sessions
    pub channel_state: Option<ChannelState>,
    pub capture_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionStatus {
    fn inactive() -> Self {
        Self {
            active: false,
            simulated: false,
            remote_session_id: None,
            channel_state: None,
            capture_error: None,
            started_at: None,
        }
    }
}

/// State owned per active session. Created on start, destroyed on stop; the
/// shutdown watch doubles as the generation token that makes late callbacks
/// from a torn-down session inert.
struct RecordingSession {
    options: SessionOptions,
    started_at: DateTime<Utc>,
    shutdown_tx: watch::Sender<bool>,
    channel_state: Option<watch::Receiver<ChannelState>>,
    capture_error: Arc<RwLock<Option<String>>>,
    drive: JoinHandle<()>,
}

/// Ties the user-visible recording intent to the capture and channel
/// lifecycles.
///
/// At most one live encoder/channel pair exists at a time; starting while
/// active is rejected. Capture starts only once the channel reports
/// `connected`, and teardown stops the encoder before disconnecting the
/// channel so no frame is produced for a socket already being closed.
pub struct SessionOrchestrator {
    backend: BackendConfig,
    audio: AudioConfig,
    store: Arc<TranscriptStore>,
    active: Mutex<Option<RecordingSession>>,
}

impl SessionOrchestrator {
    pub fn new(backend: BackendConfig, audio: AudioConfig, store: Arc<TranscriptStore>) -> Self {
        Self {
            backend,
            audio,
            store,
            active: Mutex::new(None),
        }
    }

    /// Start a recording session. Fails if one is already active.
    pub async fn start(&self, options: SessionOptions) -> Result<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            anyhow::bail!("a recording session is already active");
        }

        info!(
            "Starting recording session (source: {})",
            if options.simulate { "simulator" } else { "websocket" }
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let capture_error = Arc::new(RwLock::new(None));

        let (mut source, sink, channel_state): (
            Box<dyn TranscriptSource>,
            Option<FrameSink>,
            Option<watch::Receiver<ChannelState>>,
        ) = if options.simulate {
            (Box::new(SimulatedSource::new()), None, None)
        } else {
            let url = self.backend.listen_url(options.remote_session_id.as_deref());
            let channel = TranscriptChannel::new(ChannelConfig::new(url));
            let sink = channel.frame_sink();
            let state = channel.state_watch();
            (Box::new(channel), Some(sink), Some(state))
        };

        let events = source.start().await.context("failed to start event source")?;

        let drive = tokio::spawn(drive_session(
            source,
            events,
            sink,
            self.audio.clone(),
            Arc::clone(&self.store),
            Arc::clone(&capture_error),
            shutdown_rx,
        ));

        *active = Some(RecordingSession {
            options,
            started_at: Utc::now(),
            shutdown_tx,
            channel_state,
            capture_error,
            drive,
        });

        Ok(())
    }

    /// Stop the active session: the encoder is halted first, then the
    /// channel disconnects (caller-initiated, so no retry fires).
    pub async fn stop(&self) -> Result<()> {
        let session = {
            let mut active = self.active.lock().await;
            active.take().context("no recording session is active")?
        };

        info!("Stopping recording session");
        let _ = session.shutdown_tx.send(true);
        if let Err(e) = session.drive.await {
            error!("Session task panicked: {}", e);
        }

        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn status(&self) -> SessionStatus {
        let active = self.active.lock().await;
        match active.as_ref() {
            None => SessionStatus::inactive(),
            Some(session) => SessionStatus {
                active: true,
                simulated: session.options.simulate,
                remote_session_id: session.options.remote_session_id.clone(),
                channel_state: session.channel_state.as_ref().map(|rx| *rx.borrow()),
                capture_error: session.capture_error.read().await.clone(),
                started_at: Some(session.started_at),
            },
        }
    }
}

/// Per-session drive loop: the single consumer of the source's event stream
/// and the single writer behind the reconciler.
async fn drive_session(
    mut source: Box<dyn TranscriptSource>,
    mut events: mpsc::Receiver<SourceEvent>,
    sink: Option<FrameSink>,
    audio: AudioConfig,
    store: Arc<TranscriptStore>,
    capture_error: Arc<RwLock<Option<String>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut reconciler = Reconciler::new(store);
    let mut capture: Option<MicCapture> = None;
    let mut capture_frames: Option<mpsc::Receiver<AudioFrame>> = None;

    loop {
        let deadline = reconciler.pending_deadline();

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = async { tokio::time::sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                reconciler.flush_pending().await;
            }
            frame = async { capture_frames.as_mut().unwrap().recv().await }, if capture_frames.is_some() => {
                match frame {
                    Some(frame) => {
                        if let Some(sink) = &sink {
                            sink.send(pcm::encode_frame(&frame));
                        }
                    }
                    None => capture_frames = None,
                }
            }
            event = events.recv() => {
                match event {
                    Some(SourceEvent::Transcript(event)) => {
                        reconciler.handle_event(event).await;
                    }
                    Some(SourceEvent::State(state)) => {
                        info!("Channel state: {}", state);
                        match state {
                            ChannelState::Connected => {
                                if sink.is_some()
                                    && capture.is_none()
                                    && capture_error.read().await.is_none()
                                {
                                    let config = CaptureConfig {
                                        sample_rate: audio.sample_rate,
                                        device: audio.device.clone(),
                                    };
                                    let mut mic = MicCapture::new(config);
                                    // Race acquisition against stop: a stop
                                    // that wins leaves the late-resolving
                                    // capture inert.
                                    tokio::select! {
                                        changed = shutdown.changed() => {
                                            if changed.is_err() || *shutdown.borrow() {
                                                break;
                                            }
                                        }
                                        result = mic.start() => match result {
                                            Ok(frames) => {
                                                capture_frames = Some(frames);
                                                capture = Some(mic);
                                            }
                                            Err(e) => {
                                                warn!("Audio capture unavailable: {}", e);
                                                *capture_error.write().await = Some(e.to_string());
                                            }
                                        }
                                    }
                                }
                            }
                            ChannelState::Disconnected => {
                                // Never lose a throttled interim on a drop.
                                reconciler.flush_pending().await;
                            }
                            ChannelState::Error => {
                                if let Some(mut mic) = capture.take() {
                                    mic.stop();
                                }
                                capture_frames = None;
                            }
                            _ => {}
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Teardown order: encoder first, then the channel.
    if let Some(mut mic) = capture.take() {
        mic.stop();
    }
    if let Err(e) = source.stop().await {
        warn!("Failed to stop event source: {}", e);
    }
}
