//! Cloud TTS over the OpenAI `audio/speech` protocol.
//!
//! The same client serves OpenAI itself and any compatible self-hosted
//! endpoint. Audio is requested as raw 24 kHz 16-bit mono PCM so it can be
//! played without a decoder.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use super::TtsEngine;

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Voice used when none is configured.
pub const DEFAULT_VOICE: &str = "nova";

/// Sample rate of the `pcm` response format.
const PCM_SAMPLE_RATE: u32 = 24_000;

pub struct OpenAiTts {
    url: String,
    api_key: Option<String>,
    voice: String,
    model: String,
    speed: f32,
    client: reqwest::Client,
}

impl OpenAiTts {
    pub fn new(api_key: &str, voice: &str, speed: f32) -> Self {
        Self::with_endpoint(OPENAI_SPEECH_URL, Some(api_key), voice, speed)
    }

    pub fn with_endpoint(url: &str, api_key: Option<&str>, voice: &str, speed: f32) -> Self {
        Self {
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
            voice: voice.to_string(),
            model: "tts-1".to_string(),
            speed: speed.clamp(0.25, 4.0),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "speed": self.speed,
            "response_format": "pcm",
        })
    }
}

/// Little-endian i16 PCM to f32 samples. A trailing odd byte is ignored.
pub(crate) fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

impl TtsEngine for OpenAiTts {
    fn speak(&self, text: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<f32>>> + Send + '_>> {
        let text = text.to_string();
        Box::pin(async move {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }

            info!(voice = %self.voice, text_len = text.len(), "TTS request");

            let mut req = self.client.post(&self.url).json(&self.request_body(&text));
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("TTS request failed: {}", e))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("TTS API error {}: {}", status, body);
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read TTS response: {}", e))?;

            let samples = pcm16_to_f32(&bytes);
            info!(samples = samples.len(), "TTS synthesis complete");
            Ok(samples)
        })
    }

    fn sample_rate(&self) -> u32 {
        PCM_SAMPLE_RATE
    }

    fn name(&self) -> String {
        format!("OpenAI TTS ({})", self.voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_conversion() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x01];
        let samples = pcm16_to_f32(&bytes);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn speed_is_clamped_to_api_range() {
        let tts = OpenAiTts::new("sk-test", "nova", 10.0);
        assert_eq!(tts.request_body("hi")["speed"], 4.0);
        let tts = OpenAiTts::new("sk-test", "nova", 0.0);
        assert_eq!(tts.request_body("hi")["speed"], 0.25);
    }

    #[test]
    fn request_asks_for_raw_pcm() {
        let tts = OpenAiTts::with_endpoint("http://localhost:8000/v1/audio/speech", None, "alloy", 1.0);
        let body = tts.request_body("Hello there");
        assert_eq!(body["response_format"], "pcm");
        assert_eq!(body["voice"], "alloy");
        assert_eq!(body["input"], "Hello there");
    }
}
