//! Typed events flowing into the conversation loop.

use tokio::sync::mpsc;

use crate::stt::recognizer::normalize_transcript;

/// Spoken command that ends the session.
pub const EXIT_COMMAND: &str = "exit";

/// One recognized phrase: lowercased, without surrounding whitespace or
/// punctuation, never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance(String);

impl Utterance {
    pub fn new(text: &str) -> Option<Self> {
        normalize_transcript(text).map(Self)
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn is_exit(&self) -> bool {
        self.0 == EXIT_COMMAND
    }
}

impl std::fmt::Display for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// The capture worker recognized a phrase.
    UtteranceReady(Utterance),
    /// The window was closed.
    ShutdownRequested,
}

pub type EventSender = mpsc::UnboundedSender<ConversationEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ConversationEvent>;

/// Unbounded FIFO from the capture worker and the window to the main loop.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterances_are_normalized() {
        let u = Utterance::new("  Who Is Ada Lovelace ").unwrap();
        assert_eq!(u.text(), "who is ada lovelace");
        assert_eq!(u.to_string(), "who is ada lovelace");
    }

    #[test]
    fn punctuated_exit_still_exits() {
        assert!(Utterance::new("Exit.").unwrap().is_exit());
        assert!(Utterance::new("exit!").unwrap().is_exit());
        assert_eq!(Utterance::new("Search cats.").unwrap().text(), "search cats");
    }

    #[test]
    fn blank_text_is_not_an_utterance() {
        assert!(Utterance::new("").is_none());
        assert!(Utterance::new(" \t").is_none());
    }

    #[test]
    fn exit_is_case_insensitive() {
        assert!(Utterance::new("EXIT").unwrap().is_exit());
        assert!(Utterance::new(" Exit ").unwrap().is_exit());
        assert!(!Utterance::new("exit now").unwrap().is_exit());
    }

    #[test]
    fn channel_is_fifo() {
        let (tx, mut rx) = channel();
        for text in ["one", "two", "three"] {
            tx.send(ConversationEvent::UtteranceReady(Utterance::new(text).unwrap()))
                .unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| match ev {
                ConversationEvent::UtteranceReady(u) => u.text().to_string(),
                ConversationEvent::ShutdownRequested => String::new(),
            })
            .collect();
        assert_eq!(order, vec!["one", "two", "three"]);
    }
}
