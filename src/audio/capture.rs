//! Microphone capture via cpal.
//!
//! Opens the default (or named) input device at its native sample rate,
//! downmixes to mono, resamples to 16 kHz and pushes fixed-size chunks into
//! the ring buffer. A stream lives only as long as one capture attempt, so
//! the microphone is closed while the assistant is speaking.

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use tracing::{debug, error};

use super::ring_buffer::AudioProducer;

/// Target sample rate for the recognizer.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Chunk size in samples (80 ms at 16 kHz).
pub const CHUNK_SAMPLES: usize = 1280;

/// List available input device names.
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for dev in devices {
            if let Ok(name) = dev.name() {
                names.push(name);
            }
        }
    }
    names
}

struct CaptureConfig {
    device: cpal::Device,
    stream_config: StreamConfig,
    native_rate: u32,
}

fn resolve_device(device_name: Option<&str>) -> anyhow::Result<CaptureConfig> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .with_context(|| format!("Input device not found: {name}"))?,
        None => host
            .default_input_device()
            .context("No default input device available")?,
    };

    let default_config = device
        .default_input_config()
        .context("Failed to get default input config")?;

    let native_rate = default_config.sample_rate().0;
    let channels = default_config.channels();

    debug!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        native_rate,
        channels,
        "Opening input device"
    );

    Ok(CaptureConfig {
        device,
        stream_config: StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(native_rate),
            buffer_size: cpal::BufferSize::Default,
        },
        native_rate,
    })
}

/// Linear resampler over mono samples.
pub(crate) fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let frac = (src_idx - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }
    output
}

/// Average interleaved channels down to mono.
pub(crate) fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Open the input device and start streaming into `producer`.
///
/// The returned `Stream` must be kept alive for capture to continue; dropping
/// it closes the device.
pub fn start_capture(mut producer: AudioProducer, device_name: Option<&str>) -> anyhow::Result<Stream> {
    let cfg = resolve_device(device_name)?;
    let native_rate = cfg.native_rate;
    let channels = cfg.stream_config.channels;

    let mut chunk_buf: Vec<f32> = Vec::with_capacity(CHUNK_SAMPLES * 2);

    let stream = cfg
        .device
        .build_input_stream(
            &cfg.stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = to_mono(data, channels);
                let resampled = resample_linear(&mono, native_rate, TARGET_SAMPLE_RATE);

                chunk_buf.extend_from_slice(&resampled);
                while chunk_buf.len() >= CHUNK_SAMPLES {
                    let chunk: Vec<f32> = chunk_buf.drain(..CHUNK_SAMPLES).collect();
                    // A full buffer means the recognizer fell behind; the
                    // newest audio is dropped.
                    producer.push_slice(&chunk);
                }
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    Ok(stream)
}
