//! Capture/dialogue coordination.
//!
//! The capture worker produces utterances on a background thread; the
//! conversation session consumes them one frame at a time on the main
//! thread, closing the listen gate while it answers.

pub mod events;
pub mod session;
pub mod worker;

pub use events::{channel, ConversationEvent, EventReceiver, EventSender, Utterance};
pub use session::{Conversation, ConversationState, ExitReason, Tick};
pub use worker::{CaptureWorker, SHUTDOWN_GRACE};
