//! Application state shared between the event loop and the stream pump.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::config::{Config, TransportMode};
use crate::core::constants::{API_KEY_ENV, API_KEY_MISSING_MESSAGE, GREETING_MESSAGE};
use crate::core::message::Conversation;
use crate::core::turn::{ActiveTurn, StreamEvent, TurnPhase};
use crate::transport::{select_transport, spawn_turn, SharedTransport, TurnRequest};

pub struct App {
    pub conversation: Conversation,
    pub input: String,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    /// Drives the blinking cursor on the empty placeholder.
    pub pulse_start: Instant,
    active_turn: Option<ActiveTurn>,
    /// Monotone id of the latest submitted turn; events tagged with an older
    /// id are leftovers and get discarded.
    current_turn_id: u64,
    /// `None` means the disabled state: missing credential in direct mode.
    transport: Option<SharedTransport>,
    tx: mpsc::UnboundedSender<(StreamEvent, u64)>,
}

impl App {
    /// Build the app from configuration, reading the credential from the
    /// environment in direct mode.
    ///
    /// Returns the receiving half of the stream-event channel; the UI loop
    /// drains it.
    pub fn new(config: &Config) -> (Self, mpsc::UnboundedReceiver<(StreamEvent, u64)>) {
        let api_key = std::env::var(API_KEY_ENV).ok();
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &Config,
        api_key: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<(StreamEvent, u64)>) {
        let client = reqwest::Client::new();
        let transport = select_transport(config, client, api_key);
        tracing::debug!("transport mode: {}", config.mode);

        if transport.is_none() && config.mode == TransportMode::Direct {
            tracing::warn!("{API_KEY_ENV} not set; chat is disabled");
        }

        let conversation = if transport.is_none() {
            Conversation::seeded(API_KEY_MISSING_MESSAGE)
        } else {
            Conversation::seeded(GREETING_MESSAGE)
        };

        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                conversation,
                input: String::new(),
                scroll_offset: 0,
                auto_scroll: true,
                pulse_start: Instant::now(),
                active_turn: None,
                current_turn_id: 0,
                transport,
                tx,
            },
            rx,
        )
    }

    /// Disabled means the UI renders but every send is rejected.
    pub fn is_disabled(&self) -> bool {
        self.transport.is_none()
    }

    /// A turn is in flight from submission until it settles.
    pub fn is_loading(&self) -> bool {
        self.active_turn.is_some()
    }

    pub fn is_current_turn(&self, turn_id: u64) -> bool {
        self.current_turn_id == turn_id
    }

    /// Submit one user message: the `Idle → Sending` transition.
    ///
    /// Empty or whitespace-only text, a turn already in flight, and the
    /// disabled state are all no-ops; the conversation is left untouched.
    /// Returns whether a turn actually started.
    pub fn submit(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.is_loading() || self.is_disabled() {
            return false;
        }
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => return false,
        };

        // History before this turn, for the proxied mode.
        let history = self.conversation.history_snapshot();
        let placeholder = self.conversation.begin_turn(text.to_string());
        self.current_turn_id += 1;
        self.active_turn = Some(ActiveTurn::new(placeholder));

        spawn_turn(
            transport,
            TurnRequest {
                history,
                text: text.to_string(),
            },
            self.current_turn_id,
            self.tx.clone(),
            CancellationToken::new(),
        );
        true
    }

    /// Fold one stream event into the conversation.
    ///
    /// Events tagged with a turn other than the current one are leftovers
    /// from an earlier turn (a failed turn's trailing `End`, for instance)
    /// and are discarded. When the turn settles successfully, the reply is
    /// absorbed into the transport's session context (a no-op for the
    /// proxied mode). The in-flight flag clears on every settle path.
    pub async fn handle_stream_event(&mut self, event: StreamEvent, turn_id: u64) {
        if !self.is_current_turn(turn_id) {
            return;
        }
        let Some(mut turn) = self.active_turn.take() else {
            return;
        };

        if turn.apply(event, &mut self.conversation) != TurnPhase::Settled {
            self.active_turn = Some(turn);
            return;
        }

        if !turn.failed() && !turn.accumulated().is_empty() {
            if let Some(transport) = &self.transport {
                transport.lock().await.absorb_reply(turn.accumulated());
            }
        }
    }
}
