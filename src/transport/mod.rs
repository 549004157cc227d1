//! Message-delivery strategies.
//!
//! Exactly one transport is selected from configuration at startup and used
//! for every turn. Both implementations produce the same lazy fragment
//! stream, so the streaming reducer in [`crate::core::turn`] never branches
//! on the mode.

use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::api::gemini::GeminiError;
use crate::api::Content;
use crate::core::config::{Config, TransportMode};
use crate::core::turn::StreamEvent;

pub mod direct;
pub mod proxy;

pub use direct::DirectTransport;
pub use proxy::ProxyTransport;

/// Failure raised by transport construction, the send call, or mid-stream
/// decoding. The message is shown to the user verbatim (behind the
/// conversation's error prefix), so every variant renders human-readable.
#[derive(Debug)]
pub enum TransportError {
    /// Direct mode without a client-side credential.
    MissingCredential,
    /// The request never produced a response.
    Network(String),
    /// Non-success response from the relay or the API.
    Status { status: u16, message: String },
    /// Failure from the Gemini client.
    Api(GeminiError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::MissingCredential => {
                write!(f, "API_KEY environment variable is not set")
            }
            TransportError::Network(message) => write!(f, "{message}"),
            TransportError::Status { message, .. } => write!(f, "{message}"),
            TransportError::Api(source) => write!(f, "{source}"),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransportError::Api(source) => Some(source),
            _ => None,
        }
    }
}

impl From<GeminiError> for TransportError {
    fn from(source: GeminiError) -> Self {
        TransportError::Api(source)
    }
}

/// Lazy, finite, non-restartable sequence of text fragments in emission
/// order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One turn handed to a transport: prior history (used by the proxied mode)
/// and the new user text.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub history: Vec<Content>,
    pub text: String,
}

/// Strategy interface for delivering one turn to the model.
#[async_trait]
pub trait ChatTransport: Send {
    /// Begin one turn, producing a lazy stream of text fragments.
    ///
    /// Returns once the request is underway; fragments arrive as the model
    /// generates them. Failing to dispatch at all is an up-front error,
    /// mid-stream failures surface as `Err` items.
    async fn send(&mut self, turn: TurnRequest) -> Result<FragmentStream, TransportError>;

    /// Fold a settled reply back into transport-held context.
    ///
    /// Only the direct session keeps context of its own; the default is a
    /// no-op.
    fn absorb_reply(&mut self, _reply: &str) {}

    fn name(&self) -> &'static str;
}

pub type SharedTransport = Arc<Mutex<Box<dyn ChatTransport>>>;

/// Select the configured transport.
///
/// Returns `None` for direct mode without a credential: the caller degrades
/// to the disabled state instead of failing.
pub fn select_transport(
    config: &Config,
    client: reqwest::Client,
    api_key: Option<String>,
) -> Option<SharedTransport> {
    let transport: Box<dyn ChatTransport> = match config.mode {
        TransportMode::Direct => {
            let api_key = api_key.filter(|key| !key.is_empty())?;
            Box::new(DirectTransport::new(client, api_key, config.model.clone()))
        }
        TransportMode::Proxied => Box::new(ProxyTransport::new(client, config.relay_url.clone())),
    };
    Some(Arc::new(Mutex::new(transport)))
}

/// Drive one turn: dispatch through the transport and pump its fragment
/// stream into the event channel the UI loop drains.
///
/// Every exit path ends with [`StreamEvent::End`], so the reducer's cleanup
/// is guaranteed. Each event carries the turn id it belongs to; the consumer
/// discards events tagged with a turn that is no longer current. The
/// cancellation token is a hook only; nothing in the UI cancels by default.
pub fn spawn_turn(
    transport: SharedTransport,
    turn: TurnRequest,
    turn_id: u64,
    tx: mpsc::UnboundedSender<(StreamEvent, u64)>,
    cancel_token: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = async {
                let dispatched = {
                    let mut transport = transport.lock().await;
                    transport.send(turn).await
                };

                let mut stream = match dispatched {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = tx.send((StreamEvent::Error(e.to_string()), turn_id));
                        let _ = tx.send((StreamEvent::End, turn_id));
                        return;
                    }
                };

                while let Some(item) = stream.next().await {
                    match item {
                        Ok(fragment) => {
                            if tx.send((StreamEvent::Chunk(fragment), turn_id)).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send((StreamEvent::Error(e.to_string()), turn_id));
                            break;
                        }
                    }
                }

                let _ = tx.send((StreamEvent::End, turn_id));
            } => {}
            _ = cancel_token.cancelled() => {}
        }
    });
}
