//! Lock-free SPSC ring buffer between the cpal callback and the recognizer.
//!
//! The cpal input callback is the only producer; the capture worker thread
//! is the only consumer. Samples are 16 kHz mono f32.

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

/// Default capacity: ~10 seconds of 16 kHz mono audio.
const DEFAULT_CAPACITY: usize = 160_000;

/// Producer half, owned by the cpal audio callback.
pub struct AudioProducer {
    inner: ringbuf::HeapProd<f32>,
}

/// Consumer half, owned by the capture worker.
pub struct AudioConsumer {
    inner: ringbuf::HeapCons<f32>,
}

/// Create a matched producer/consumer pair.
pub fn audio_ring_buffer(capacity: Option<usize>) -> (AudioProducer, AudioConsumer) {
    let cap = capacity.unwrap_or(DEFAULT_CAPACITY);
    let rb = HeapRb::<f32>::new(cap);
    let (prod, cons) = rb.split();
    (AudioProducer { inner: prod }, AudioConsumer { inner: cons })
}

impl AudioProducer {
    /// Push samples, returning how many fit. Overflow drops the newest audio.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }
}

// Safety: the ringbuf producer is designed to be used from a single thread.
// cpal callbacks run on a dedicated audio thread, so this is fine.
unsafe impl Send for AudioProducer {}

impl AudioConsumer {
    /// Number of samples currently available for reading.
    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Pop exactly `len` samples, or nothing if fewer are buffered.
    pub fn pop_chunk(&mut self, len: usize) -> Option<Vec<f32>> {
        if len == 0 || self.available() < len {
            return None;
        }
        let mut chunk = vec![0.0f32; len];
        let read = self.inner.pop_slice(&mut chunk);
        chunk.truncate(read);
        Some(chunk)
    }
}

unsafe impl Send for AudioConsumer {}
