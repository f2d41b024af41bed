//! Background capture worker.
//!
//! Loops for its whole lifetime: wait for the gate to open, listen once,
//! enqueue the utterance. Recognition failures are retried; only shutdown
//! (or the main loop going away) ends the loop.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::events::{ConversationEvent, EventSender, Utterance};
use crate::audio::ListenGate;
use crate::stt::{RecognitionError, Recognizer};

/// How often a closed gate is re-checked.
pub const GATE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Pause before retrying after the input device failed.
pub const DEVICE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How long shutdown waits for an in-flight capture to finish.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct CaptureWorker {
    handle: JoinHandle<()>,
    gate: Arc<ListenGate>,
}

impl CaptureWorker {
    /// Start the capture thread.
    pub fn spawn<R>(recognizer: R, gate: Arc<ListenGate>, events: EventSender) -> io::Result<Self>
    where
        R: Recognizer + 'static,
    {
        let handle = thread::Builder::new().name("capture".into()).spawn({
            let gate = Arc::clone(&gate);
            move || run_capture_loop(recognizer, &gate, &events)
        })?;
        Ok(Self { handle, gate })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal shutdown and wait up to `grace` for the thread to exit.
    ///
    /// Returns `false` if the thread was still busy (typically blocked in a
    /// capture); it is then left detached and does not hold up process exit.
    pub fn shutdown(self, grace: Duration) -> bool {
        self.gate.shutdown();

        let deadline = Instant::now() + grace;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(grace_ms = grace.as_millis() as u64, "Capture worker did not stop in time");
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if self.handle.join().is_err() {
            error!("Capture worker panicked");
        }
        true
    }
}

fn run_capture_loop<R: Recognizer>(mut recognizer: R, gate: &ListenGate, events: &EventSender) {
    info!("Capture worker started");

    while gate.wait_until_open(GATE_POLL_INTERVAL) {
        let generation = gate.generation();
        match recognizer.listen() {
            Ok(text) => {
                let Some(utterance) = Utterance::new(&text) else {
                    continue;
                };
                // A capture that overlapped a closed gate, even one that has
                // since reopened, may contain the assistant's own voice.
                if !gate.is_open() || gate.generation() != generation {
                    debug!(text = %utterance, "Discarding capture that overlapped speech");
                    continue;
                }
                if events.send(ConversationEvent::UtteranceReady(utterance)).is_err() {
                    debug!("Conversation loop gone, stopping capture");
                    break;
                }
            }
            Err(RecognitionError::NotUnderstood) => {
                warn!("Sorry, I could not understand your command.");
            }
            Err(RecognitionError::Service(e)) => {
                error!(error = %e, "Speech recognition service error");
            }
            Err(RecognitionError::Device(e)) => {
                error!(error = %e, "Audio input failed, retrying");
                thread::sleep(DEVICE_RETRY_DELAY);
            }
            Err(RecognitionError::Interrupted) => {}
        }
    }

    info!("Capture worker stopped");
}
