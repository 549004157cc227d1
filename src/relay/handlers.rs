//! `POST /api/chat`: relay one turn to Gemini and stream the reply.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;

use crate::api::{ChatRelayRequest, Content, RelayErrorBody};
use crate::core::constants::SYSTEM_INSTRUCTION;
use crate::relay::RelayState;

/// Relay one chat turn.
///
/// Success is `200 text/plain; charset=utf-8` with the raw streamed model
/// output, no envelope or framing, terminated by connection close. Errors
/// are non-200 with a JSON `{ error, details? }` body.
pub async fn chat(
    State(state): State<RelayState>,
    Json(request): Json<ChatRelayRequest>,
) -> Response {
    let Some(gemini) = &state.gemini else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "API key not configured on server",
            None,
        );
    };

    let mut contents = request.history;
    contents.push(Content::user(request.message));

    match gemini.stream_generate(contents, SYSTEM_INSTRUCTION).await {
        Ok(stream) => {
            let body =
                Body::from_stream(stream.map(|item| item.map(bytes::Bytes::from)));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("chat relay failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to call Gemini API",
                Some(e.to_string()),
            )
        }
    }
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(RelayErrorBody {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}
