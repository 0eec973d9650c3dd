use crate::session::{SourceEvent, TranscriptSource};
use crate::transcript::TranscriptEvent;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// Scripted lecture phrases the simulator types out.
const SCRIPT: [&str; 8] = [
    "Welcome back, today we continue with the spectral theorem.",
    "A symmetric matrix always admits an orthonormal basis of eigenvectors.",
    "Consider the quadratic form induced by the Hessian at a critical point.",
    "Positive definiteness tells us the critical point is a local minimum.",
    "We diagonalize by conjugating with the matrix of eigenvectors.",
    "The singular value decomposition generalizes this to rectangular matrices.",
    "Low rank approximation keeps only the largest singular values.",
    "Next lecture we apply this machinery to principal component analysis.",
];

/// How often the simulator emits the next interim revision.
const TICK: Duration = Duration::from_millis(150);

/// Local synthetic event generator used in place of the live channel.
///
/// Emits growing interim prefixes of each phrase at a fixed cadence, then a
/// final event for the whole phrase, looping over the script until stopped.
/// Feeds the same reconciler interface as the websocket channel, so sessions
/// behave identically without a backend or a microphone.
pub struct SimulatedSource {
    tick: Duration,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::with_tick(TICK)
    }

    pub fn with_tick(tick: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            tick,
            shutdown_tx,
            task: None,
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranscriptSource for SimulatedSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<SourceEvent>> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let mut shutdown = self.shutdown_tx.subscribe();
        let tick = self.tick;

        self.task = Some(tokio::spawn(async move {
            info!("Simulated transcript source started");
            'script: for phrase in SCRIPT.iter().cycle() {
                let words: Vec<&str> = phrase.split_whitespace().collect();
                for end in 1..=words.len() {
                    tokio::select! {
                        _ = shutdown.changed() => break 'script,
                        _ = tokio::time::sleep(tick) => {}
                    }
                    let event = TranscriptEvent {
                        text: words[..end].join(" "),
                        is_final: false,
                        confidence: 1.0,
                    };
                    if events_tx.send(SourceEvent::Transcript(event)).await.is_err() {
                        break 'script;
                    }
                }
                tokio::select! {
                    _ = shutdown.changed() => break 'script,
                    _ = tokio::time::sleep(tick) => {}
                }
                let event = TranscriptEvent {
                    text: phrase.to_string(),
                    is_final: true,
                    confidence: 1.0,
                };
                if events_tx.send(SourceEvent::Transcript(event)).await.is_err() {
                    break 'script;
                }
            }
            info!("Simulated transcript source stopped");
        }));

        Ok(events_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "simulator"
    }
}
