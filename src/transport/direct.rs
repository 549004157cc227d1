//! Direct transport: call the Gemini API from the client process.
//!
//! The transport owns one lazily created, process-lifetime chat session. The
//! session is bound to the system instruction at creation, holds the
//! conversation context between turns, and is never recreated. A failing
//! turn leaves the session exactly as it was: the user turn and the model
//! turn are committed to the context together, only once the reply settles
//! successfully.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::api::gemini::GeminiClient;
use crate::api::Content;
use crate::core::constants::SYSTEM_INSTRUCTION;
use crate::transport::{ChatTransport, FragmentStream, TransportError, TurnRequest};

/// Process-lifetime conversation handle, bound to one system instruction.
#[derive(Debug)]
struct ChatSession {
    system_instruction: String,
    contents: Vec<Content>,
}

impl ChatSession {
    fn new(system_instruction: &str) -> Self {
        Self {
            system_instruction: system_instruction.to_string(),
            contents: Vec::new(),
        }
    }
}

pub struct DirectTransport {
    gemini: GeminiClient,
    session: Option<ChatSession>,
    /// User turn of the in-flight request, committed only once its reply
    /// settles.
    pending_user: Option<Content>,
}

impl DirectTransport {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            gemini: GeminiClient::new(client, api_key, model),
            session: None,
            pending_user: None,
        }
    }

    #[cfg(test)]
    fn session_turns(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.contents.len())
    }
}

#[async_trait]
impl ChatTransport for DirectTransport {
    async fn send(&mut self, turn: TurnRequest) -> Result<FragmentStream, TransportError> {
        if !self.gemini.has_credential() {
            return Err(TransportError::MissingCredential);
        }
        // A new turn abandons any user turn a failed one left uncommitted.
        self.pending_user = None;

        // The incoming history is ignored: the session handle owns its own
        // context across turns.
        let (system_instruction, mut contents) = match &self.session {
            Some(session) => (
                session.system_instruction.clone(),
                session.contents.clone(),
            ),
            None => (SYSTEM_INSTRUCTION.to_string(), Vec::new()),
        };
        contents.push(Content::user(turn.text.clone()));

        let stream = self
            .gemini
            .stream_generate(contents, &system_instruction)
            .await?;

        // Create-if-absent, only after a successful dispatch. The user turn
        // stays pending until the reply settles.
        self.session
            .get_or_insert_with(|| ChatSession::new(SYSTEM_INSTRUCTION));
        self.pending_user = Some(Content::user(turn.text));

        Ok(Box::pin(stream.map(|item| item.map_err(TransportError::from))))
    }

    fn absorb_reply(&mut self, reply: &str) {
        if let Some(session) = &mut self.session {
            if let Some(user_turn) = self.pending_user.take() {
                session.contents.push(user_turn);
            }
            session.contents.push(Content::model(reply));
        }
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> DirectTransport {
        DirectTransport::new(
            reqwest::Client::new(),
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
        )
    }

    fn turn(text: &str) -> TurnRequest {
        TurnRequest {
            history: Vec::new(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_credential_fails_without_creating_a_session() {
        let mut transport = DirectTransport::new(
            reqwest::Client::new(),
            String::new(),
            "gemini-2.5-flash".to_string(),
        );
        let result = transport.send(turn("Hi")).await;
        assert!(matches!(result, Err(TransportError::MissingCredential)));
        assert!(transport.session.is_none());
    }

    #[tokio::test]
    async fn failed_dispatch_leaves_no_session_behind() {
        // An unroutable base URL makes the request fail before any stream
        // is produced.
        let mut transport = transport();
        transport.gemini = transport
            .gemini
            .clone()
            .with_base_url("http://127.0.0.1:1/unreachable".to_string());

        let result = transport.send(turn("Hi")).await;
        assert!(result.is_err());
        assert!(transport.session.is_none());
        assert_eq!(transport.session_turns(), 0);
    }

    #[test]
    fn absorb_reply_without_session_is_a_no_op() {
        let mut transport = transport();
        transport.absorb_reply("orphan reply");
        assert!(transport.session.is_none());
    }

    #[test]
    fn absorb_reply_commits_user_and_model_turns_together() {
        let mut transport = transport();
        transport.session = Some(ChatSession::new(SYSTEM_INSTRUCTION));
        transport.pending_user = Some(Content::user("Hi"));

        transport.absorb_reply("Hello!");

        let session = transport.session.as_ref().unwrap();
        assert_eq!(session.contents.len(), 2);
        assert_eq!(session.contents[0], Content::user("Hi"));
        assert_eq!(session.contents[1], Content::model("Hello!"));
        assert!(transport.pending_user.is_none());
    }

    #[tokio::test]
    async fn failed_turn_never_commits_its_user_turn() {
        // One settled exchange in the context, then a turn that fails to
        // dispatch: the context must not grow, and the abandoned user turn
        // must not leak into the next one.
        let mut transport = transport();
        transport.session = Some(ChatSession::new(SYSTEM_INSTRUCTION));
        transport.pending_user = Some(Content::user("first"));
        transport.absorb_reply("first reply");
        assert_eq!(transport.session_turns(), 2);

        transport.gemini = transport
            .gemini
            .clone()
            .with_base_url("http://127.0.0.1:1/unreachable".to_string());
        let result = transport.send(turn("second")).await;

        assert!(result.is_err());
        assert!(transport.pending_user.is_none());
        assert_eq!(transport.session_turns(), 2);
    }

    #[test]
    fn session_is_bound_to_the_system_instruction() {
        let session = ChatSession::new(SYSTEM_INSTRUCTION);
        assert_eq!(session.system_instruction, SYSTEM_INSTRUCTION);
        assert!(session.contents.is_empty());
    }
}
