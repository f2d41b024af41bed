//! Cloud STT adapters (OpenAI Whisper API, custom endpoint).
//!
//! Both speak the OpenAI `audio/transcriptions` multipart protocol; the
//! custom adapter just points it somewhere else.

use reqwest::multipart;
use tracing::debug;

use super::SttEngine;

const OPENAI_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Encode f32 audio samples as 16-bit PCM mono WAV bytes.
pub(crate) fn encode_wav(audio: &[f32], sample_rate: u32) -> Vec<u8> {
    let bytes_per_sample: u16 = 2;
    let num_channels: u16 = 1;
    let data_size = audio.len() as u32 * bytes_per_sample as u32;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * num_channels as u32 * bytes_per_sample as u32;
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&(num_channels * bytes_per_sample).to_le_bytes());
    buf.extend_from_slice(&(bytes_per_sample * 8).to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in audio {
        let pcm = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&pcm.to_le_bytes());
    }

    buf
}

/// POST one WAV clip to an OpenAI-compatible transcription endpoint.
async fn post_transcription(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    audio: &[f32],
) -> anyhow::Result<String> {
    let wav = encode_wav(audio, 16_000);
    debug!(bytes = wav.len(), url, "Sending audio for transcription");

    let file_part = multipart::Part::bytes(wav)
        .file_name("audio.wav")
        .mime_str("audio/wav")?;
    let form = multipart::Form::new()
        .text("model", "whisper-1")
        .text("language", "en")
        .part("file", file_part);

    let mut req = client.post(url).multipart(form);
    if let Some(key) = api_key {
        req = req.bearer_auth(key);
    }

    let resp = req.send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("STT API error {}: {}", status, body);
    }

    let json: serde_json::Value = resp.json().await?;
    Ok(transcript_text(&json))
}

fn transcript_text(json: &serde_json::Value) -> String {
    json["text"].as_str().unwrap_or("").trim().to_string()
}

/// OpenAI Whisper API STT adapter.
pub struct OpenAiStt {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiStt {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl SttEngine for OpenAiStt {
    async fn transcribe(&self, audio: &[f32]) -> anyhow::Result<String> {
        post_transcription(&self.client, OPENAI_TRANSCRIPTIONS_URL, Some(&self.api_key), audio)
            .await
    }
}

/// User-configured custom STT endpoint.
pub struct CustomApiStt {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CustomApiStt {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

impl SttEngine for CustomApiStt {
    async fn transcribe(&self, audio: &[f32]) -> anyhow::Result<String> {
        post_transcription(&self.client, &self.endpoint, self.api_key.as_deref(), audio).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_describes_16bit_mono() {
        let wav = encode_wav(&[0.0; 100], 16_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]),
            16_000
        );
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
        assert_eq!(wav.len(), 44 + 200);
    }

    #[test]
    fn wav_samples_are_clamped() {
        let wav = encode_wav(&[2.0, -2.0], 16_000);
        assert_eq!(i16::from_le_bytes([wav[44], wav[45]]), 32767);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), -32767);
    }

    #[test]
    fn transcript_is_trimmed() {
        let json = serde_json::json!({ "text": "  Who is Ada Lovelace \n" });
        assert_eq!(transcript_text(&json), "Who is Ada Lovelace");
        assert_eq!(transcript_text(&serde_json::json!({})), "");
    }
}
