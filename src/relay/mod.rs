//! Relay server: holds the server-side credential and streams Gemini output
//! back to clients as raw `text/plain` bytes.

use std::net::SocketAddr;

use axum::routing::post;
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::api::gemini::GeminiClient;
use crate::core::constants::API_KEY_ENV;

pub mod handlers;

#[derive(Clone)]
pub struct RelayState {
    /// `None` when the server was started without a credential; requests are
    /// answered with a structured error rather than refusing to boot.
    pub gemini: Option<GeminiClient>,
}

impl RelayState {
    pub fn from_env(model: String) -> Self {
        let gemini = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => {
                Some(GeminiClient::new(reqwest::Client::new(), key, model))
            }
            _ => {
                tracing::warn!("{API_KEY_ENV} not set; relay will reject chat requests");
                None
            }
        };
        Self { gemini }
    }
}

pub fn create_router(state: RelayState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    Router::new()
        .route("/api/chat", post(handlers::chat))
        .layer(trace_layer)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: RelayState) -> Result<(), std::io::Error> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("relay listening on {addr}");
    axum::serve(listener, router).await
}
