//! Per-frame conversation driver.
//!
//! One utterance is handled across two frames: the first closes the gate and
//! records what was heard, so the window can show it; the second routes,
//! speaks and reopens the gate.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{info, warn};

use super::events::{ConversationEvent, EventReceiver, Utterance};
use crate::audio::ListenGate;
use crate::dialogue::DialogueRouter;
use crate::tts::Synthesizer;

/// Main-loop view of the conversation, read by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub speaking: bool,
    pub last_heard: String,
    pub last_response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    WindowClosed,
    ExitCommand,
}

/// What one call to [`Conversation::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    /// An utterance was taken; it is answered on the next tick.
    Heard,
    Spoke,
    Exit(ExitReason),
}

pub struct Conversation {
    router: DialogueRouter,
    voice: Box<dyn Synthesizer>,
    gate: Arc<ListenGate>,
    events: EventReceiver,
    backlog: VecDeque<Utterance>,
    /// Utterance taken on the previous tick; `state.speaking` mirrors it.
    pending: Option<Utterance>,
    state: ConversationState,
}

/// Reopens the gate when a speaking cycle ends, however it ends.
struct SpeakingCycle<'a>(&'a ListenGate);

impl Drop for SpeakingCycle<'_> {
    fn drop(&mut self) {
        if !self.0.reopen() && !self.0.is_shut_down() {
            warn!(state = %self.0.current_state(), "Gate did not reopen");
        }
    }
}

impl Conversation {
    pub fn new(
        router: DialogueRouter,
        voice: Box<dyn Synthesizer>,
        gate: Arc<ListenGate>,
        events: EventReceiver,
    ) -> Self {
        Self {
            router,
            voice,
            gate,
            events,
            backlog: VecDeque::new(),
            pending: None,
            state: ConversationState::default(),
        }
    }

    /// Show `text` in the response box until the first reply replaces it.
    pub fn with_notice(mut self, text: impl Into<String>) -> Self {
        self.state.last_response = text.into();
        self
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Utterances received but not yet answered.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Advance the conversation by one frame.
    ///
    /// A synthesizer failure is returned after the gate has been reopened.
    pub fn tick(&mut self) -> anyhow::Result<Tick> {
        if self.drain_events() || self.gate.is_shut_down() {
            return Ok(self.exit(ExitReason::WindowClosed));
        }

        if let Some(utterance) = self.pending.take() {
            return self.answer(&utterance);
        }

        let Some(utterance) = self.backlog.pop_front() else {
            return Ok(Tick::Idle);
        };

        if utterance.is_exit() {
            info!("Exit command received");
            return Ok(self.exit(ExitReason::ExitCommand));
        }

        if !self.gate.close() {
            warn!(state = %self.gate.current_state(), "Gate was not open when a turn began");
        }
        info!(text = %utterance, "Heard");
        self.state.speaking = true;
        self.state.last_heard = utterance.text().to_string();
        self.pending = Some(utterance);
        Ok(Tick::Heard)
    }

    /// Returns true if shutdown was requested.
    fn drain_events(&mut self) -> bool {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ConversationEvent::UtteranceReady(utterance) => self.backlog.push_back(utterance),
                ConversationEvent::ShutdownRequested => return true,
            }
        }
        false
    }

    fn answer(&mut self, utterance: &Utterance) -> anyhow::Result<Tick> {
        let result = {
            let _cycle = SpeakingCycle(&self.gate);
            let response = self.router.route(utterance.text());
            info!(response = %response, "Bot");
            self.state.last_response = response;

            self.gate.begin_speaking();
            self.voice.speak(&self.state.last_response)
        };
        self.finish_cycle();
        result.map(|()| Tick::Spoke)
    }

    fn finish_cycle(&mut self) {
        self.state.speaking = false;
        self.state.last_heard.clear();
    }

    fn exit(&mut self, reason: ExitReason) -> Tick {
        self.gate.shutdown();
        Tick::Exit(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::GateState;
    use crate::conversation::events::{channel, EventSender};
    use crate::dialogue::{Browser, ChatModel, KnowledgeSource, LookupError};

    struct Knowledge;

    impl KnowledgeSource for Knowledge {
        fn summary(&self, query: &str, _sentences: usize) -> Result<String, LookupError> {
            Ok(format!("summary of {query}"))
        }
    }

    struct NoBrowser;

    impl Browser for NoBrowser {
        fn open(&self, _url: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Echo;

    impl ChatModel for Echo {
        fn respond(&self, text: &str) -> String {
            format!("echo {text}")
        }
    }

    /// Records what was spoken and the gate state at that moment.
    #[derive(Clone)]
    struct RecordingVoice {
        gate: Arc<ListenGate>,
        spoken: Rc<RefCell<Vec<(String, GateState)>>>,
        fail: bool,
    }

    impl Synthesizer for RecordingVoice {
        fn speak(&mut self, text: &str) -> anyhow::Result<()> {
            self.spoken
                .borrow_mut()
                .push((text.to_string(), self.gate.current_state()));
            if self.fail {
                anyhow::bail!("audio output unavailable");
            }
            Ok(())
        }
    }

    struct Harness {
        conversation: Conversation,
        gate: Arc<ListenGate>,
        tx: EventSender,
        spoken: Rc<RefCell<Vec<(String, GateState)>>>,
    }

    fn harness(fail: bool) -> Harness {
        let gate = ListenGate::new();
        let (tx, rx) = channel();
        let spoken = Rc::new(RefCell::new(Vec::new()));
        let voice = RecordingVoice {
            gate: Arc::clone(&gate),
            spoken: Rc::clone(&spoken),
            fail,
        };
        let router = DialogueRouter::new(Box::new(Knowledge), Box::new(NoBrowser), Box::new(Echo));
        Harness {
            conversation: Conversation::new(router, Box::new(voice), Arc::clone(&gate), rx),
            gate,
            tx,
            spoken,
        }
    }

    fn say(tx: &EventSender, text: &str) {
        tx.send(ConversationEvent::UtteranceReady(Utterance::new(text).unwrap()))
            .unwrap();
    }

    #[test]
    fn idle_without_events() {
        let mut h = harness(false);
        assert_eq!(h.conversation.tick().unwrap(), Tick::Idle);
        assert!(h.gate.is_open());
    }

    #[test]
    fn notice_shows_until_first_reply() {
        let mut h = harness(false);
        h.conversation = h.conversation.with_notice("Speech recognition is not configured.");
        assert_eq!(h.conversation.tick().unwrap(), Tick::Idle);
        assert_eq!(
            h.conversation.state().last_response,
            "Speech recognition is not configured."
        );

        say(&h.tx, "hello");
        h.conversation.tick().unwrap();
        h.conversation.tick().unwrap();
        assert_eq!(h.conversation.state().last_response, "echo hello");
    }

    #[test]
    fn one_turn_spans_two_ticks() {
        let mut h = harness(false);
        say(&h.tx, "hello");

        assert_eq!(h.conversation.tick().unwrap(), Tick::Heard);
        assert!(h.conversation.state().speaking);
        assert_eq!(h.conversation.state().last_heard, "hello");
        assert_eq!(h.gate.current_state(), GateState::Processing);

        assert_eq!(h.conversation.tick().unwrap(), Tick::Spoke);
        let state = h.conversation.state();
        assert!(!state.speaking);
        assert!(state.last_heard.is_empty());
        assert_eq!(state.last_response, "echo hello");
        assert!(h.gate.is_open());
        assert_eq!(
            *h.spoken.borrow(),
            vec![("echo hello".to_string(), GateState::Speaking)]
        );
    }

    #[test]
    fn exit_stops_without_speaking() {
        let mut h = harness(false);
        say(&h.tx, "EXIT");
        assert_eq!(
            h.conversation.tick().unwrap(),
            Tick::Exit(ExitReason::ExitCommand)
        );
        assert!(h.spoken.borrow().is_empty());
        assert!(h.gate.is_shut_down());
    }

    #[test]
    fn punctuated_exit_stops_without_speaking() {
        let mut h = harness(false);
        say(&h.tx, "Exit.");
        assert_eq!(
            h.conversation.tick().unwrap(),
            Tick::Exit(ExitReason::ExitCommand)
        );
        assert!(h.spoken.borrow().is_empty());
    }

    #[test]
    fn speaking_tracks_the_pending_turn() {
        let mut h = harness(false);
        say(&h.tx, "hello");
        h.conversation.tick().unwrap();
        assert!(h.conversation.state().speaking);
        h.conversation.tick().unwrap();
        assert!(!h.conversation.state().speaking);
        assert_eq!(h.conversation.tick().unwrap(), Tick::Idle);
        assert!(!h.conversation.state().speaking);
    }

    #[test]
    fn window_close_wins_over_queued_utterances() {
        let mut h = harness(false);
        say(&h.tx, "hello");
        h.tx.send(ConversationEvent::ShutdownRequested).unwrap();
        assert_eq!(
            h.conversation.tick().unwrap(),
            Tick::Exit(ExitReason::WindowClosed)
        );
        assert!(h.spoken.borrow().is_empty());
        assert!(h.gate.is_shut_down());
    }

    #[test]
    fn queued_utterances_are_answered_in_order() {
        let mut h = harness(false);
        say(&h.tx, "first");
        say(&h.tx, "second");
        say(&h.tx, "who is third");

        for _ in 0..6 {
            h.conversation.tick().unwrap();
        }

        let spoken: Vec<String> = h.spoken.borrow().iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            spoken,
            vec!["echo first", "echo second", "summary of who is third"]
        );
        assert_eq!(h.conversation.backlog_len(), 0);
    }

    #[test]
    fn one_utterance_per_cycle() {
        let mut h = harness(false);
        say(&h.tx, "first");
        say(&h.tx, "second");

        assert_eq!(h.conversation.tick().unwrap(), Tick::Heard);
        assert_eq!(h.conversation.backlog_len(), 1);
        assert_eq!(h.conversation.tick().unwrap(), Tick::Spoke);
        assert_eq!(h.spoken.borrow().len(), 1);
    }

    #[test]
    fn gate_reopens_after_synthesizer_failure() {
        let mut h = harness(true);
        say(&h.tx, "hello");
        h.conversation.tick().unwrap();

        let err = h.conversation.tick().unwrap_err();
        assert!(err.to_string().contains("audio output unavailable"));
        assert!(!h.conversation.state().speaking);
        assert!(h.gate.is_open());
    }

    #[test]
    fn external_shutdown_ends_the_loop() {
        let mut h = harness(false);
        h.gate.shutdown();
        assert_eq!(
            h.conversation.tick().unwrap(),
            Tick::Exit(ExitReason::WindowClosed)
        );
    }
}
