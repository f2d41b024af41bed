//! Audio playback via rodio.
//!
//! Plays mono f32 PCM through the default output device and blocks until
//! the sink drains.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

pub struct AudioPlayer {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl AudioPlayer {
    /// Open the default audio output device at `volume` (0.0..=1.0).
    pub fn new(volume: f32) -> anyhow::Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| anyhow::anyhow!("Failed to open audio output: {}", e))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| anyhow::anyhow!("Failed to create audio sink: {}", e))?;
        sink.set_volume(volume.clamp(0.0, 1.0));

        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }

    /// Play mono samples at `sample_rate`, blocking until done.
    pub fn play(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.sink
            .append(SamplesBuffer::new(1, sample_rate, samples.to_vec()));
        self.sink.sleep_until_end();
        Ok(())
    }
}
