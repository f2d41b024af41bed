//! Atomic listen gate.
//!
//! Thread-safe state shared between the capture worker and the main loop
//! using `AtomicU8`. The gate is open only while `Listening`; the capture
//! worker must not start a new microphone capture in any other state.
//! `ShuttingDown` is terminal. Every successful close bumps a generation
//! counter so a capture can tell whether the gate closed while it ran.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Conversation-facing audio states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateState {
    /// Gate open: the capture worker may listen.
    Listening = 0,
    /// Gate closed, an utterance is being routed.
    Processing = 1,
    /// Gate closed, the response is being spoken.
    Speaking = 2,
    /// Shutdown requested. Never left once entered.
    ShuttingDown = 3,
}

impl GateState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Listening,
            1 => Self::Processing,
            2 => Self::Speaking,
            _ => Self::ShuttingDown,
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listening => write!(f, "listening"),
            Self::Processing => write!(f, "processing"),
            Self::Speaking => write!(f, "speaking"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

/// Shared listen gate, shareable via `Arc`.
#[derive(Debug)]
pub struct ListenGate {
    state: AtomicU8,
    generation: AtomicU64,
}

impl ListenGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current state.
    pub fn current_state(&self) -> GateState {
        GateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True when the capture worker may start a capture.
    pub fn is_open(&self) -> bool {
        self.current_state() == GateState::Listening
    }

    pub fn is_shut_down(&self) -> bool {
        self.current_state() == GateState::ShuttingDown
    }

    /// Close the gate (Listening -> Processing).
    pub fn close(&self) -> bool {
        let closed = self.transition(GateState::Listening, GateState::Processing);
        if closed {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        closed
    }

    /// Number of times the gate has been closed.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Processing -> Speaking.
    pub fn begin_speaking(&self) -> bool {
        self.transition(GateState::Processing, GateState::Speaking)
    }

    /// Reopen the gate from Processing or Speaking.
    ///
    /// Refused once shutdown has been requested.
    pub fn reopen(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let state = GateState::from_u8(current);
            if !matches!(state, GateState::Processing | GateState::Speaking) {
                return state == GateState::Listening;
            }
            match self.state.compare_exchange(
                current,
                GateState::Listening as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Enter the terminal shutdown state.
    pub fn shutdown(&self) {
        self.state
            .store(GateState::ShuttingDown as u8, Ordering::Release);
    }

    /// Block until the gate is open, polling every `poll`.
    ///
    /// Returns `false` if shutdown was requested while waiting.
    pub fn wait_until_open(&self, poll: Duration) -> bool {
        loop {
            match self.current_state() {
                GateState::Listening => return true,
                GateState::ShuttingDown => return false,
                _ => std::thread::sleep(poll),
            }
        }
    }

    fn transition(&self, from: GateState, to: GateState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for ListenGate {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(GateState::Listening as u8),
            generation: AtomicU64::new(0),
        }
    }
}
