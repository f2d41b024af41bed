//! Voice activity detection for the microphone recognizer.
//!
//! Energy-based: a chunk counts as speech when its mean absolute amplitude
//! exceeds a threshold calibrated against ambient noise.

pub mod energy;
pub mod phrase;

pub use phrase::{PhraseDetector, PhraseSettings};
