//! Voice Ganga: a desktop voice assistant.
//!
//! A background worker listens to the microphone while the listen gate is
//! open; the window loop answers each utterance with a Wikipedia summary, a
//! web search, or a small chat model, and speaks the reply.

pub mod audio;
pub mod avatar;
pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod logger;
pub mod stt;
pub mod tts;
pub mod vad;
