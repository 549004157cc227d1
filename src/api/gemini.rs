//! Streaming client for the Gemini `streamGenerateContent` endpoint.
//!
//! The endpoint speaks server-sent events: each `data:` line carries one
//! `GenerateContentResponse` JSON document whose first candidate holds the
//! next text fragment. The stream ends when the server closes the
//! connection; there is no terminator line.

use std::error::Error as StdError;
use std::fmt;

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::api::{
    default_safety_settings, Content, GenerateContentRequest, GenerateContentResponse, Part,
};
use crate::core::constants::GEMINI_BASE_URL;
use crate::utils::url::construct_api_url;

/// Failure talking to the Gemini API, carrying a human-readable message.
#[derive(Debug, Clone, PartialEq)]
pub enum GeminiError {
    /// The request could not be sent or the connection dropped.
    Network(String),
    /// The API answered with a non-success status.
    Api { status: u16, message: String },
}

impl fmt::Display for GeminiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeminiError::Network(message) => write!(f, "{message}"),
            GeminiError::Api { status, message } => {
                write!(f, "Gemini API error ({status}): {message}")
            }
        }
    }
}

impl StdError for GeminiError {}

/// Lazy sequence of text fragments in emission order.
pub type FragmentStream = UnboundedReceiverStream<Result<String, GeminiError>>;

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn stream_url(&self) -> String {
        construct_api_url(
            &self.base_url,
            &format!("models/{}:streamGenerateContent", self.model),
        )
    }

    /// Open one streaming generation request.
    ///
    /// Returns after the response headers arrive; fragments are delivered
    /// lazily as the model produces them. A non-success status or an
    /// unsendable request fails up front, before any fragment is emitted.
    pub async fn stream_generate(
        &self,
        contents: Vec<Content>,
        system_instruction: &str,
    ) -> Result<FragmentStream, GeminiError> {
        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            }),
            safety_settings: default_safety_settings(),
        };

        let response = self
            .client
            .post(self.stream_url())
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body)
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = stream.next().await {
                let chunk_bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(GeminiError::Network(e.to_string())));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk_bytes);

                while let Some(newline_pos) = memchr(b'\n', &buffer) {
                    match std::str::from_utf8(&buffer[..newline_pos]) {
                        Ok(line) => {
                            if let Some(fragment) = parse_sse_line(line) {
                                if tx.send(Ok(fragment)).is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("invalid UTF-8 in SSE stream: {e}");
                        }
                    }
                    buffer.drain(..=newline_pos);
                }
            }
            // Channel drop ends the stream.
        });

        Ok(UnboundedReceiverStream::new(rx))
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.trim_end_matches('\r')
        .strip_prefix("data:")
        .map(str::trim_start)
}

/// Pull the text fragment out of one SSE line, if it carries one.
fn parse_sse_line(line: &str) -> Option<String> {
    let payload = extract_data_payload(line.trim())?;
    if payload.is_empty() {
        return None;
    }
    let response: GenerateContentResponse = serde_json::from_str(payload).ok()?;
    response.text()
}

/// Best-effort extraction of a human-readable message from a JSON error body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })?;

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
