//! Text-to-speech: synthesis engines, playback, and the blocking
//! `Synthesizer` the conversation loop speaks through.
//!
//! Engines:
//! - espeak-ng (local, no key)
//! - OpenAI TTS API
//! - Custom OpenAI-compatible speech endpoint

pub mod cloud;
pub mod espeak;
pub mod playback;

use std::future::Future;
use std::pin::Pin;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use playback::AudioPlayer;

/// Common trait for all TTS engines (dyn-compatible).
pub trait TtsEngine: Send + Sync {
    /// Synthesize text to mono f32 PCM samples at [`Self::sample_rate`].
    fn speak(&self, text: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<f32>>> + Send + '_>>;

    /// Sample rate of the audio returned by `speak`.
    fn sample_rate(&self) -> u32;

    /// Display name for this engine (e.g. "OpenAI TTS (nova)").
    fn name(&self) -> String;
}

/// Turns a response into audible speech, blocking until playback ends.
pub trait Synthesizer {
    fn speak(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Options shared by the TTS engine constructors.
#[derive(Debug, Clone, Default)]
pub struct TtsOptions<'a> {
    pub voice: Option<&'a str>,
    pub speed: Option<f32>,
    pub api_key: Option<&'a str>,
    pub endpoint: Option<&'a str>,
}

/// Create a TTS engine from config values.
///
/// `adapter` is one of: "espeak-local", "openai-tts", "custom-tts".
pub fn create_tts_engine(adapter: &str, opts: &TtsOptions<'_>) -> anyhow::Result<Box<dyn TtsEngine>> {
    let voice = opts.voice.unwrap_or(cloud::DEFAULT_VOICE);
    let speed = opts.speed.unwrap_or(1.0);
    match adapter {
        "espeak-local" => {
            let voice = opts.voice.unwrap_or(espeak::DEFAULT_VOICE);
            Ok(Box::new(espeak::EspeakTts::new(voice, speed)?))
        }
        "openai-tts" => {
            let key = opts
                .api_key
                .ok_or_else(|| anyhow::anyhow!("OpenAI TTS requires an API key"))?;
            Ok(Box::new(cloud::OpenAiTts::new(key, voice, speed)))
        }
        "custom-tts" => {
            let url = opts
                .endpoint
                .ok_or_else(|| anyhow::anyhow!("Custom TTS requires an endpoint URL"))?;
            Ok(Box::new(cloud::OpenAiTts::with_endpoint(
                url,
                opts.api_key,
                voice,
                speed,
            )))
        }
        other => anyhow::bail!("Unknown TTS adapter: {}", other),
    }
}

/// Engine + speaker. Lives on the main thread (the rodio stream is not `Send`).
pub struct SpeechOutput {
    engine: Box<dyn TtsEngine>,
    player: AudioPlayer,
    runtime: Handle,
}

impl SpeechOutput {
    pub fn new(engine: Box<dyn TtsEngine>, player: AudioPlayer, runtime: Handle) -> Self {
        info!(engine = %engine.name(), "Speech output ready");
        Self {
            engine,
            player,
            runtime,
        }
    }
}

impl Synthesizer for SpeechOutput {
    fn speak(&mut self, text: &str) -> anyhow::Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let samples = self.runtime.block_on(self.engine.speak(text))?;
        debug!(samples = samples.len(), "Playing synthesized speech");
        self.player.play(&samples, self.engine.sample_rate())
    }
}

/// Used when no speech output could be set up: replies are logged and shown
/// in the window but not spoken.
#[derive(Debug, Default)]
pub struct TextOnly {
    spoken: usize,
}

impl TextOnly {
    pub fn new(reason: &anyhow::Error) -> Self {
        warn!("Speech output unavailable, replies will be text only: {:#}", reason);
        Self::default()
    }

    /// Replies delivered so far.
    pub fn replies(&self) -> usize {
        self.spoken
    }
}

impl Synthesizer for TextOnly {
    fn speak(&mut self, text: &str) -> anyhow::Result<()> {
        if !text.trim().is_empty() {
            info!(text, "Reply (not spoken)");
            self.spoken += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_adapter_is_rejected() {
        let err = create_tts_engine("kokoro", &TtsOptions::default()).err().unwrap();
        assert!(err.to_string().contains("kokoro"));
    }

    #[test]
    fn text_only_never_fails() {
        let mut voice = TextOnly::new(&anyhow::anyhow!("no output device"));
        assert!(voice.speak("Hello! How can I help you?").is_ok());
        assert!(voice.speak("  ").is_ok());
        assert_eq!(voice.replies(), 1);
    }

    #[test]
    fn missing_espeak_is_an_error_not_a_panic() {
        // Either espeak-ng is installed or construction reports it missing.
        match create_tts_engine("espeak-local", &TtsOptions::default()) {
            Ok(engine) => {
                assert_eq!(engine.sample_rate(), espeak::ESPEAK_SAMPLE_RATE);
                assert!(engine.name().contains(espeak::DEFAULT_VOICE));
            }
            Err(e) => assert!(e.to_string().contains("espeak-ng not found")),
        }
    }

    #[test]
    fn openai_requires_key() {
        assert!(create_tts_engine("openai-tts", &TtsOptions::default()).is_err());
    }

    #[test]
    fn custom_requires_endpoint() {
        let opts = TtsOptions {
            api_key: Some("sk-test"),
            ..TtsOptions::default()
        };
        assert!(create_tts_engine("custom-tts", &opts).is_err());
    }

    #[test]
    fn engine_name_includes_voice() {
        let opts = TtsOptions {
            voice: Some("shimmer"),
            api_key: Some("sk-test"),
            ..TtsOptions::default()
        };
        let engine = create_tts_engine("openai-tts", &opts).unwrap();
        assert_eq!(engine.name(), "OpenAI TTS (shimmer)");
        assert_eq!(engine.sample_rate(), 24_000);
    }
}
