//! Speech-to-text: adapters plus the blocking microphone recognizer.
//!
//! `SttEngine` turns 16 kHz mono audio into text. Implementations:
//! - Local whisper.cpp inference (behind the `whisper` feature)
//! - OpenAI Whisper API (cloud)
//! - Custom OpenAI-compatible endpoint (cloud)
//!
//! `Recognizer` is the seam the capture worker listens through.

pub mod cloud;
pub mod recognizer;
pub mod whisper;

use std::path::Path;

pub use recognizer::MicrophoneRecognizer;

/// Why a capture attempt produced no utterance.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// Audio was captured but no words were recognized.
    #[error("speech was not understood")]
    NotUnderstood,

    /// The transcription backend failed.
    #[error("recognition service error: {0}")]
    Service(String),

    /// The input device could not be opened or stopped delivering audio.
    #[error("audio device error: {0}")]
    Device(String),

    /// The gate closed (speech or shutdown) while waiting for speech.
    #[error("capture interrupted by closed gate")]
    Interrupted,
}

/// One blocking listen: wait for a phrase and return its lowercased text.
pub trait Recognizer: Send {
    fn listen(&mut self) -> Result<String, RecognitionError>;
}

/// Common trait for all STT engines.
#[allow(async_fn_in_trait)]
pub trait SttEngine: Send + Sync {
    /// Transcribe 16 kHz mono f32 audio to text.
    async fn transcribe(&self, audio: &[f32]) -> anyhow::Result<String>;
}

/// Enum dispatch over the STT backends (async trait methods are not
/// dyn-compatible).
pub enum SttAdapter {
    Whisper(whisper::WhisperStt),
    OpenAi(cloud::OpenAiStt),
    Custom(cloud::CustomApiStt),
}

impl SttAdapter {
    pub async fn transcribe(&self, audio: &[f32]) -> anyhow::Result<String> {
        match self {
            Self::Whisper(e) => e.transcribe(audio).await,
            Self::OpenAi(e) => e.transcribe(audio).await,
            Self::Custom(e) => e.transcribe(audio).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Whisper(_) => "whisper-local",
            Self::OpenAi(_) => "openai-cloud",
            Self::Custom(_) => "custom-cloud",
        }
    }
}

/// Create an STT engine from config values.
///
/// `adapter` is one of: "whisper-local", "openai-cloud", "custom-cloud".
/// The whisper model must already be on disk (see [`whisper::ensure_model`]).
pub fn create_stt_engine(
    adapter: &str,
    data_dir: &Path,
    model_size: &str,
    api_key: Option<&str>,
    endpoint: Option<&str>,
) -> anyhow::Result<SttAdapter> {
    match adapter {
        "whisper-local" => {
            let model_path = whisper::model_path(data_dir, model_size);
            Ok(SttAdapter::Whisper(whisper::WhisperStt::new(&model_path)?))
        }
        "openai-cloud" => {
            let key = api_key
                .ok_or_else(|| anyhow::anyhow!("OpenAI STT requires an API key"))?;
            Ok(SttAdapter::OpenAi(cloud::OpenAiStt::new(key)))
        }
        "custom-cloud" => {
            let url = endpoint
                .ok_or_else(|| anyhow::anyhow!("Custom STT requires an endpoint URL"))?;
            Ok(SttAdapter::Custom(cloud::CustomApiStt::new(
                url,
                api_key.map(str::to_string),
            )))
        }
        other => anyhow::bail!("Unknown STT adapter: {}", other),
    }
}
