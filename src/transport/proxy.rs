//! Proxied transport: delegate the turn to a relay server.
//!
//! The full history snapshot and the new message go up as one JSON request;
//! the reply comes back as a raw byte stream with no framing, decoded to
//! text incrementally so multi-byte characters split across chunk edges
//! survive intact.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::api::gemini::extract_error_message;
use crate::api::{ChatRelayRequest, RelayErrorBody};
use crate::transport::{ChatTransport, FragmentStream, TransportError, TurnRequest};
use crate::utils::url::construct_api_url;
use crate::utils::utf8::Utf8StreamDecoder;

pub struct ProxyTransport {
    client: reqwest::Client,
    relay_url: String,
}

impl ProxyTransport {
    pub fn new(client: reqwest::Client, relay_url: String) -> Self {
        Self { client, relay_url }
    }

    fn chat_url(&self) -> String {
        construct_api_url(&self.relay_url, "api/chat")
    }
}

#[async_trait]
impl ChatTransport for ProxyTransport {
    async fn send(&mut self, turn: TurnRequest) -> Result<FragmentStream, TransportError> {
        let request = ChatRelayRequest {
            history: turn.history,
            message: turn.text,
        };

        let response = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: relay_error_message(&body, status.as_u16()),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut decoder = Utf8StreamDecoder::new();
            let mut stream = response.bytes_stream();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        let text = decoder.decode(&bytes);
                        if !text.is_empty() && tx.send(Ok(text)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(TransportError::Network(e.to_string())));
                        return;
                    }
                }
            }

            let tail = decoder.finish();
            if !tail.is_empty() {
                let _ = tx.send(Ok(tail));
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn name(&self) -> &'static str {
        "proxied"
    }
}

/// Relay errors carry a structured JSON body when the relay itself answered;
/// anything else falls back to a status-derived message.
fn relay_error_message(body: &str, status: u16) -> String {
    if let Ok(parsed) = serde_json::from_str::<RelayErrorBody>(body) {
        if !parsed.error.is_empty() {
            return match parsed.details {
                Some(details) if !details.is_empty() => {
                    format!("{}: {}", parsed.error, details)
                }
                _ => parsed.error,
            };
        }
    }
    extract_error_message(body)
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}
