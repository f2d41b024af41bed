//! Blocking microphone recognizer used by the capture worker.
//!
//! One `listen()` call opens the input device, calibrates against a second
//! of ambient noise, waits for a phrase, closes the device, and transcribes
//! the phrase with the configured STT adapter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::{debug, info};

use super::{RecognitionError, Recognizer, SttAdapter};
use crate::audio::{audio_ring_buffer, start_capture, AudioConsumer, ListenGate, CHUNK_SAMPLES};
use crate::vad::{energy, PhraseDetector, PhraseSettings};

/// How often the ring buffer is polled for a new chunk.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// No audio for this long means the device stopped delivering.
const STALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    /// Input device name; `None` uses the system default.
    pub input_device: Option<String>,
    /// Ambient noise sampled before each listen.
    pub ambient: Duration,
    pub phrase: PhraseSettings,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            input_device: None,
            ambient: Duration::from_secs(1),
            phrase: PhraseSettings::default(),
        }
    }
}

pub struct MicrophoneRecognizer {
    stt: SttAdapter,
    runtime: Handle,
    gate: Arc<ListenGate>,
    settings: RecognizerSettings,
}

impl MicrophoneRecognizer {
    pub fn new(
        stt: SttAdapter,
        runtime: Handle,
        gate: Arc<ListenGate>,
        settings: RecognizerSettings,
    ) -> Self {
        Self {
            stt,
            runtime,
            gate,
            settings,
        }
    }

    /// Wait for the next full chunk, giving up as soon as the gate closes
    /// (speech or shutdown) or the device stalls.
    fn next_chunk(&self, consumer: &mut AudioConsumer) -> Result<Vec<f32>, RecognitionError> {
        let started = Instant::now();
        loop {
            if !self.gate.is_open() {
                return Err(RecognitionError::Interrupted);
            }
            if let Some(chunk) = consumer.pop_chunk(CHUNK_SAMPLES) {
                return Ok(chunk);
            }
            if started.elapsed() > STALL_TIMEOUT {
                return Err(RecognitionError::Device(
                    "input stream stopped delivering audio".into(),
                ));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn record_phrase(&self) -> Result<Vec<f32>, RecognitionError> {
        let (producer, mut consumer) = audio_ring_buffer(None);
        let stream = start_capture(producer, self.settings.input_device.as_deref())
            .map_err(|e| RecognitionError::Device(format!("{e:#}")))?;

        info!("Listening for your command...");

        let chunk_ms = self.settings.phrase.chunk.as_millis().max(1);
        let ambient_chunks = self.settings.ambient.as_millis().div_ceil(chunk_ms) as usize;
        let mut ambient = Vec::with_capacity(ambient_chunks);
        for _ in 0..ambient_chunks {
            ambient.push(self.next_chunk(&mut consumer)?);
        }
        let threshold = energy::calibrate(ambient.iter().map(Vec::as_slice));
        debug!(threshold, "Calibrated for ambient noise");

        let mut detector = PhraseDetector::new(&self.settings.phrase, threshold);
        let phrase = loop {
            let chunk = self.next_chunk(&mut consumer)?;
            if let Some(phrase) = detector.push(&chunk) {
                break phrase;
            }
        };

        drop(stream);
        debug!(samples = phrase.len(), "Phrase captured");
        Ok(phrase)
    }
}

impl Recognizer for MicrophoneRecognizer {
    fn listen(&mut self) -> Result<String, RecognitionError> {
        let audio = self.record_phrase()?;

        let text = self
            .runtime
            .block_on(self.stt.transcribe(&audio))
            .map_err(|e| RecognitionError::Service(format!("{e:#}")))?;

        let text = normalize_transcript(&text).ok_or(RecognitionError::NotUnderstood)?;
        info!(text = %text, "You said");
        Ok(text)
    }
}

/// Lowercase a transcript and strip surrounding whitespace and punctuation
/// ("Exit." -> "exit"); `None` when nothing was said.
pub fn normalize_transcript(raw: &str) -> Option<String> {
    let text = raw
        .trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .to_lowercase();
    (!text.is_empty()).then_some(text)
}
