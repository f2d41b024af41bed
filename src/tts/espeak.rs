//! Offline speech through the espeak-ng command-line synthesizer.
//!
//! espeak-ng writes a WAV file to stdout; the header is parsed here and the
//! samples are converted to mono f32 at [`ESPEAK_SAMPLE_RATE`]. Needs no
//! network and no API key.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Command;

use tracing::{debug, info};

use super::TtsEngine;
use crate::audio::capture::{resample_linear, to_mono};

/// A female US English voice.
pub const DEFAULT_VOICE: &str = "en-us+f3";

/// Speaking rate in words per minute at speed 1.0.
pub const DEFAULT_RATE_WPM: u32 = 150;

/// espeak-ng's native output rate.
pub const ESPEAK_SAMPLE_RATE: u32 = 22_050;

const MIN_RATE_WPM: u32 = 80;
const MAX_RATE_WPM: u32 = 450;

/// Executables tried in order.
const CANDIDATES: [&str; 2] = ["espeak-ng", "espeak"];

pub struct EspeakTts {
    program: PathBuf,
    voice: String,
    rate_wpm: u32,
}

impl EspeakTts {
    /// Locate espeak-ng on PATH. `speed` scales the default rate.
    pub fn new(voice: &str, speed: f32) -> anyhow::Result<Self> {
        let program = find_espeak().ok_or_else(|| {
            anyhow::anyhow!("espeak-ng not found. Install espeak-ng or choose a cloud TTS adapter")
        })?;
        info!(program = %program.display(), voice, "Using espeak-ng");
        Ok(Self::with_program(program, voice, speed))
    }

    pub(crate) fn with_program(program: PathBuf, voice: &str, speed: f32) -> Self {
        Self {
            program,
            voice: voice.to_string(),
            rate_wpm: rate_for_speed(speed),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--stdout".to_string(),
            "-v".to_string(),
            self.voice.clone(),
            "-s".to_string(),
            self.rate_wpm.to_string(),
        ]
    }
}

fn find_espeak() -> Option<PathBuf> {
    CANDIDATES.iter().find_map(|name| {
        let ok = Command::new(name)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        ok.then(|| PathBuf::from(name))
    })
}

fn rate_for_speed(speed: f32) -> u32 {
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    ((DEFAULT_RATE_WPM as f32 * speed).round() as u32).clamp(MIN_RATE_WPM, MAX_RATE_WPM)
}

/// Decoded 16-bit PCM WAV.
#[derive(Debug, PartialEq)]
pub(crate) struct Wav {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples in -1.0..1.0.
    pub samples: Vec<f32>,
}

fn u16_at(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn u32_at(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

/// Parse a RIFF/WAVE byte stream. A streamed header whose data size runs
/// past the end is clamped to the bytes actually present.
pub(crate) fn decode_wav(bytes: &[u8]) -> anyhow::Result<Wav> {
    if bytes.get(0..4) != Some(b"RIFF".as_slice()) || bytes.get(8..12) != Some(b"WAVE".as_slice()) {
        anyhow::bail!("not a WAV stream");
    }

    let mut format: Option<(u16, u32)> = None;
    let mut offset = 12;
    while let (Some(id), Some(size)) = (bytes.get(offset..offset + 4), u32_at(bytes, offset + 4)) {
        let body = offset + 8;
        match id {
            b"fmt " => {
                let channels = u16_at(bytes, body + 2).unwrap_or(0);
                let sample_rate = u32_at(bytes, body + 4).unwrap_or(0);
                let bits = u16_at(bytes, body + 14).unwrap_or(0);
                if bits != 16 || channels == 0 || sample_rate == 0 {
                    anyhow::bail!("unsupported WAV format: {channels} ch, {sample_rate} Hz, {bits} bit");
                }
                format = Some((channels, sample_rate));
            }
            b"data" => {
                let (channels, sample_rate) =
                    format.ok_or_else(|| anyhow::anyhow!("WAV data before format chunk"))?;
                let end = body.saturating_add(size as usize).min(bytes.len());
                let samples = bytes[body.min(end)..end]
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
                    .collect();
                return Ok(Wav {
                    sample_rate,
                    channels,
                    samples,
                });
            }
            _ => {}
        }
        offset = body.saturating_add(size as usize + (size as usize & 1));
    }
    anyhow::bail!("WAV stream has no data chunk")
}

/// Downmix and resample to espeak's nominal rate.
fn to_output(wav: Wav) -> Vec<f32> {
    let mono = to_mono(&wav.samples, wav.channels);
    resample_linear(&mono, wav.sample_rate, ESPEAK_SAMPLE_RATE)
}

impl TtsEngine for EspeakTts {
    fn speak(&self, text: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<f32>>> + Send + '_>> {
        let text = text.to_string();
        Box::pin(async move {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }

            let output = tokio::process::Command::new(&self.program)
                .args(self.args())
                .arg(&text)
                .output()
                .await
                .map_err(|e| anyhow::anyhow!("espeak-ng at {} failed to execute: {}", self.program.display(), e))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!("espeak-ng failed: {}", stderr.trim());
            }

            let samples = to_output(decode_wav(&output.stdout)?);
            debug!(samples = samples.len(), "espeak-ng synthesis complete");
            Ok(samples)
        })
    }

    fn sample_rate(&self) -> u32 {
        ESPEAK_SAMPLE_RATE
    }

    fn name(&self) -> String {
        format!("espeak-ng ({})", self.voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::cloud::encode_wav;

    #[test]
    fn rate_follows_speed() {
        assert_eq!(rate_for_speed(1.0), 150);
        assert_eq!(rate_for_speed(1.5), 225);
        assert_eq!(rate_for_speed(0.1), MIN_RATE_WPM);
        assert_eq!(rate_for_speed(10.0), MAX_RATE_WPM);
        assert_eq!(rate_for_speed(f32::NAN), 150);
    }

    #[test]
    fn command_line_writes_wav_to_stdout() {
        let tts = EspeakTts::with_program(PathBuf::from("espeak-ng"), DEFAULT_VOICE, 1.0);
        assert_eq!(tts.args(), vec!["--stdout", "-v", "en-us+f3", "-s", "150"]);
        assert_eq!(tts.name(), "espeak-ng (en-us+f3)");
    }

    #[test]
    fn decodes_pcm_wav() {
        let wav = decode_wav(&encode_wav(&[0.0, 0.5, -0.5], 22_050)).unwrap();
        assert_eq!(wav.sample_rate, 22_050);
        assert_eq!(wav.channels, 1);
        assert_eq!(wav.samples.len(), 3);
        assert!((wav.samples[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn streamed_header_is_clamped() {
        let mut bytes = encode_wav(&[0.25; 4], 22_050);
        // Streaming writers leave the size fields at their maximum.
        bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        let wav = decode_wav(&bytes).unwrap();
        assert_eq!(wav.samples.len(), 4);
    }

    #[test]
    fn rejects_non_wav() {
        assert!(decode_wav(b"ID3\x04 not a wav file").is_err());
        assert!(decode_wav(&[]).is_err());
    }

    #[test]
    fn other_rates_are_resampled() {
        let wav = Wav {
            sample_rate: 44_100,
            channels: 2,
            samples: vec![0.0; 441 * 2],
        };
        assert_eq!(to_output(wav).len(), 220);
    }
}
