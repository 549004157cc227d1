//! Per-turn streaming state machine.
//!
//! One turn runs `Idle → Sending → Streaming → Settled`. The `Idle → Sending`
//! edge is the submit path in [`crate::core::app`]; everything after that is
//! this reducer folding transport events into the placeholder message. Each
//! chunk updates the placeholder with the full accumulated text so far, so a
//! re-render of any single update is idempotent, while chunk application
//! order still determines the final text.

use crate::core::constants::{EMPTY_RESPONSE_FALLBACK, ERROR_PREFIX};
use crate::core::message::{Conversation, MessageId};

/// Incremental unit delivered by a transport.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Decoded text fragment, to be applied in arrival order.
    Chunk(String),
    /// Transport failure; the message is already human-readable.
    Error(String),
    /// The underlying sequence is exhausted.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Sending,
    Streaming,
    Settled,
}

/// State for the one in-flight turn.
///
/// Its existence is the concurrency guard: the app holds at most one and
/// rejects submissions while it is present.
#[derive(Debug)]
pub struct ActiveTurn {
    placeholder: MessageId,
    accumulated: String,
    phase: TurnPhase,
    failed: bool,
}

impl ActiveTurn {
    pub fn new(placeholder: MessageId) -> Self {
        Self {
            placeholder,
            accumulated: String::new(),
            phase: TurnPhase::Sending,
            failed: false,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_settled(&self) -> bool {
        self.phase == TurnPhase::Settled
    }

    /// True once the turn settled through the error path.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }

    /// Full text accumulated so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Fold one transport event into the conversation.
    ///
    /// Returns the phase after the event; `Settled` means the turn is over,
    /// whether it ended in text, the empty-response fallback, or an error.
    pub fn apply(&mut self, event: StreamEvent, conversation: &mut Conversation) -> TurnPhase {
        if self.phase == TurnPhase::Settled {
            return self.phase;
        }

        match event {
            StreamEvent::Chunk(fragment) => {
                self.phase = TurnPhase::Streaming;
                self.accumulated.push_str(&fragment);
                conversation.set_text(self.placeholder, &self.accumulated);
            }
            StreamEvent::End => {
                if self.accumulated.is_empty() {
                    conversation.set_text(self.placeholder, EMPTY_RESPONSE_FALLBACK);
                }
                self.phase = TurnPhase::Settled;
            }
            StreamEvent::Error(message) => {
                conversation.set_text(self.placeholder, &format!("{ERROR_PREFIX}{message}"));
                self.failed = true;
                self.phase = TurnPhase::Settled;
            }
        }

        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Sender;

    fn start_turn(conversation: &mut Conversation) -> ActiveTurn {
        let placeholder = conversation.begin_turn("Hi".to_string());
        ActiveTurn::new(placeholder)
    }

    fn settle(turn: &mut ActiveTurn, conversation: &mut Conversation, chunks: &[&str]) -> String {
        for chunk in chunks {
            turn.apply(StreamEvent::Chunk(chunk.to_string()), conversation);
        }
        turn.apply(StreamEvent::End, conversation);
        conversation
            .text_of(turn.placeholder())
            .expect("placeholder exists")
            .to_string()
    }

    #[test]
    fn final_text_is_in_order_concatenation() {
        let mut conversation = Conversation::new();
        let mut turn = start_turn(&mut conversation);

        let text = settle(&mut turn, &mut conversation, &["He", "llo", "!"]);
        assert_eq!(text, "Hello!");
        assert!(turn.is_settled());
    }

    #[test]
    fn chunk_order_is_not_commutative() {
        let mut forward = Conversation::new();
        let mut forward_turn = start_turn(&mut forward);
        let forward_text = settle(&mut forward_turn, &mut forward, &["ab", "cd"]);

        let mut reversed = Conversation::new();
        let mut reversed_turn = start_turn(&mut reversed);
        let reversed_text = settle(&mut reversed_turn, &mut reversed, &["cd", "ab"]);

        assert_ne!(forward_text, reversed_text);
    }

    #[test]
    fn placeholder_transitions_through_partial_text() {
        let mut conversation = Conversation::new();
        let mut turn = start_turn(&mut conversation);
        let placeholder = turn.placeholder();

        assert_eq!(conversation.text_of(placeholder), Some(""));

        turn.apply(StreamEvent::Chunk("He".to_string()), &mut conversation);
        assert_eq!(conversation.text_of(placeholder), Some("He"));
        assert_eq!(turn.phase(), TurnPhase::Streaming);

        turn.apply(StreamEvent::Chunk("llo!".to_string()), &mut conversation);
        assert_eq!(conversation.text_of(placeholder), Some("Hello!"));

        turn.apply(StreamEvent::End, &mut conversation);
        assert_eq!(conversation.text_of(placeholder), Some("Hello!"));
        assert!(turn.is_settled());
    }

    #[test]
    fn empty_stream_substitutes_fallback_never_empty_string() {
        let mut conversation = Conversation::new();
        let mut turn = start_turn(&mut conversation);

        let text = settle(&mut turn, &mut conversation, &[]);
        assert_eq!(text, EMPTY_RESPONSE_FALLBACK);
        assert!(!text.is_empty());
    }

    #[test]
    fn error_overwrites_placeholder_with_prefixed_message() {
        let mut conversation = Conversation::new();
        let mut turn = start_turn(&mut conversation);

        turn.apply(
            StreamEvent::Chunk("partial".to_string()),
            &mut conversation,
        );
        turn.apply(
            StreamEvent::Error("connection reset".to_string()),
            &mut conversation,
        );

        let text = conversation.text_of(turn.placeholder()).unwrap();
        assert_eq!(text, "Error: connection reset");
        assert!(text.starts_with(ERROR_PREFIX));
        assert!(turn.is_settled());
    }

    #[test]
    fn events_after_settlement_are_ignored() {
        let mut conversation = Conversation::new();
        let mut turn = start_turn(&mut conversation);

        turn.apply(StreamEvent::Error("boom".to_string()), &mut conversation);
        turn.apply(StreamEvent::Chunk("late".to_string()), &mut conversation);
        turn.apply(StreamEvent::End, &mut conversation);

        assert_eq!(
            conversation.text_of(turn.placeholder()),
            Some("Error: boom")
        );
    }

    #[test]
    fn exactly_one_user_and_one_bot_message_per_turn() {
        let mut conversation = Conversation::new();
        let before = conversation.len();
        let mut turn = start_turn(&mut conversation);
        assert_eq!(conversation.len(), before + 2);

        settle(&mut turn, &mut conversation, &["ok"]);
        assert_eq!(conversation.len(), before + 2);

        let snapshot = conversation.snapshot();
        assert_eq!(snapshot[before].sender, Sender::User);
        assert_eq!(snapshot[before + 1].sender, Sender::Bot);
    }
}
