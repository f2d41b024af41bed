//! Microphone capture, ring buffer, and the shared listen gate.

pub mod capture;
pub mod gate;
pub mod ring_buffer;

pub use capture::{list_devices, start_capture, CHUNK_SAMPLES, TARGET_SAMPLE_RATE};
pub use gate::{GateState, ListenGate};
pub use ring_buffer::{audio_ring_buffer, AudioConsumer, AudioProducer};
