use crate::channel::messages::parse_event;
use crate::session::{SourceEvent, TranscriptSource};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Connection state of the duplex channel.
///
/// `disconnected` is transient (a drop was observed and a retry decision is
/// being made); `error` is terminal for the session; `idle` is the resting
/// state before `connect` and after a caller-initiated disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Idle => "idle",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Disconnected => "disconnected",
            ChannelState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Configuration for the duplex transcript channel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Full websocket URL of the backend's listen endpoint
    pub url: String,
    /// Reconnect attempts after an involuntary drop before settling in
    /// the terminal error state
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential reconnect backoff
    pub reconnect_base_delay: Duration,
}

impl ChannelConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            max_reconnect_attempts: 3,
            reconnect_base_delay: Duration::from_millis(1000),
        }
    }

    /// Backoff delay before reconnect attempt number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.reconnect_base_delay * 2u32.pow(attempt)
    }
}

/// Cloneable handle for pushing outbound audio frames.
///
/// Frames are silently dropped unless the channel is currently connected;
/// audio is latency-sensitive, so nothing is buffered across a gap.
#[derive(Clone)]
pub struct FrameSink {
    frame_tx: mpsc::Sender<Vec<u8>>,
    state_rx: watch::Receiver<ChannelState>,
}

impl FrameSink {
    pub fn send(&self, frame: Vec<u8>) {
        if *self.state_rx.borrow() != ChannelState::Connected {
            return;
        }
        let _ = self.frame_tx.try_send(frame);
    }
}

/// Owns the websocket connection lifecycle to the transcription backend.
///
/// One background task runs the whole state machine: connect, forward
/// outbound frames, parse inbound events, detect drops, reconnect with
/// bounded exponential backoff, and classify caller-initiated closes. A new
/// socket is created per attempt and never reused.
pub struct TranscriptChannel {
    config: ChannelConfig,
    state_tx: Option<watch::Sender<ChannelState>>,
    state_rx: watch::Receiver<ChannelState>,
    frame_tx: mpsc::Sender<Vec<u8>>,
    frame_rx: Option<mpsc::Receiver<Vec<u8>>>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl TranscriptChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ChannelState::Idle);
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            state_tx: Some(state_tx),
            state_rx,
            frame_tx,
            frame_rx: Some(frame_rx),
            shutdown_tx,
            task: None,
        }
    }

    /// Observe connection state changes (used to gate capture start and for
    /// the status surface).
    pub fn state_watch(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    pub fn frame_sink(&self) -> FrameSink {
        FrameSink {
            frame_tx: self.frame_tx.clone(),
            state_rx: self.state_rx.clone(),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptSource for TranscriptChannel {
    async fn start(&mut self) -> Result<mpsc::Receiver<SourceEvent>> {
        let state_tx = self
            .state_tx
            .take()
            .context("channel already started")?;
        let frame_rx = self
            .frame_rx
            .take()
            .context("channel already started")?;
        let (events_tx, events_rx) = mpsc::channel(256);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let config = self.config.clone();
        self.task = Some(tokio::spawn(run_channel(
            config, state_tx, frame_rx, events_tx, shutdown_rx,
        )));
        Ok(events_rx)
    }

    /// Caller-initiated disconnect: close the socket, cancel any pending
    /// reconnect timer, settle in `idle`. Never triggers a retry.
    async fn stop(&mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "websocket"
    }
}

impl Drop for TranscriptChannel {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Resolves once a caller-initiated shutdown has been requested.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if *shutdown.borrow() {
        return;
    }
    while shutdown.changed().await.is_ok() {
        if *shutdown.borrow() {
            return;
        }
    }
    // Sender gone means the owning channel was dropped; treat as shutdown.
}

enum Drive {
    /// Connection dropped without caller request (stream end or close frame)
    Closed,
    /// Caller requested disconnect while connected
    Shutdown,
    /// Transport-level error; terminal, bypasses the retry path
    TransportError,
}

async fn run_channel(
    config: ChannelConfig,
    state_tx: watch::Sender<ChannelState>,
    mut frame_rx: mpsc::Receiver<Vec<u8>>,
    events_tx: mpsc::Sender<SourceEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        set_state(&state_tx, &events_tx, ChannelState::Connecting).await;
        info!("Connecting to {}", config.url);

        let connected = tokio::select! {
            _ = cancelled(&mut shutdown) => {
                set_state(&state_tx, &events_tx, ChannelState::Idle).await;
                return;
            }
            result = connect_async(config.url.as_str()) => result,
        };

        match connected {
            Ok((ws, _response)) => {
                attempt = 0;
                set_state(&state_tx, &events_tx, ChannelState::Connected).await;
                info!("Channel connected");

                // Frames queued while not connected are stale; drop them
                // before forwarding resumes.
                while frame_rx.try_recv().is_ok() {}

                match drive(ws, &mut frame_rx, &events_tx, &mut shutdown).await {
                    Drive::Shutdown => {
                        set_state(&state_tx, &events_tx, ChannelState::Idle).await;
                        info!("Channel closed by caller");
                        return;
                    }
                    Drive::TransportError => {
                        set_state(&state_tx, &events_tx, ChannelState::Error).await;
                        return;
                    }
                    Drive::Closed => {
                        warn!("Channel connection dropped");
                    }
                }
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
            }
        }

        // Involuntary drop path. The disconnected transition reaches the
        // reconciler through the same event stream as transcripts, so the
        // pending interim flush happens before any post-reconnect event.
        set_state(&state_tx, &events_tx, ChannelState::Disconnected).await;

        if attempt >= config.max_reconnect_attempts {
            error!(
                "Giving up after {} reconnect attempts",
                config.max_reconnect_attempts
            );
            set_state(&state_tx, &events_tx, ChannelState::Error).await;
            return;
        }

        let delay = config.backoff_delay(attempt);
        attempt += 1;
        info!("Reconnecting in {:?} (attempt {})", delay, attempt);

        tokio::select! {
            _ = cancelled(&mut shutdown) => {
                set_state(&state_tx, &events_tx, ChannelState::Idle).await;
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Pump one live socket until it closes, errors, or the caller disconnects.
async fn drive(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    frame_rx: &mut mpsc::Receiver<Vec<u8>>,
    events_tx: &mpsc::Sender<SourceEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Drive {
    let (mut sink, mut stream) = ws.split();
    let mut frames_open = true;

    loop {
        tokio::select! {
            _ = cancelled(shutdown) => {
                let _ = sink.close().await;
                return Drive::Shutdown;
            }
            frame = frame_rx.recv(), if frames_open => {
                match frame {
                    Some(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            return Drive::Closed;
                        }
                    }
                    // Frame sender gone; keep receiving transcripts.
                    None => frames_open = false,
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(payload))) => {
                    match parse_event(&payload) {
                        Some(event) => {
                            if events_tx.send(SourceEvent::Transcript(event)).await.is_err() {
                                // Consumer gone; nothing left to deliver to.
                                return Drive::Shutdown;
                            }
                        }
                        None => debug!("Discarding malformed message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Drive::Closed,
                Some(Ok(_)) => {} // binary/ping/pong from the backend: ignored
                Some(Err(e)) if is_connection_drop(&e) => {
                    warn!("Connection lost: {}", e);
                    return Drive::Closed;
                }
                Some(Err(e)) => {
                    error!("Transport error: {}", e);
                    return Drive::TransportError;
                }
            }
        }
    }
}

/// An abrupt connection loss surfaces as a read error but is still an
/// unexpected close (retry path), not a transport protocol failure.
fn is_connection_drop(err: &WsError) -> bool {
    matches!(
        err,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Io(_)
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

async fn set_state(
    state_tx: &watch::Sender<ChannelState>,
    events_tx: &mpsc::Sender<SourceEvent>,
    state: ChannelState,
) {
    let _ = state_tx.send(state);
    let _ = events_tx.send(SourceEvent::State(state)).await;
}
