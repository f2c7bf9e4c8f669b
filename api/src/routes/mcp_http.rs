use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use toolbelt_core::jsonrpc::JsonRpcRequest;
use toolbelt_mcp_runtime::SESSION_HEADER;
use toolbelt_mcp_runtime::sse::{self, EVENT_STREAM_CONTENT_TYPE};

use crate::error::AppError;
use crate::state::AppState;

const MCP_PATH: &str = "/mcp";
const DEFAULT_SESSION_ID: &str = "default";

pub fn router() -> Router<AppState> {
    Router::new().route(MCP_PATH, post(mcp_post).get(mcp_get))
}

async fn mcp_get() -> Response {
    StatusCode::METHOD_NOT_ALLOWED.into_response()
}

/// Single JSON-RPC request in, single reply out (JSON or one SSE event).
#[utoipa::path(
    post,
    path = "/mcp",
    request_body(content = serde_json::Value, description = "JSON-RPC 2.0 request"),
    params(
        ("mcp-session-id" = Option<String>, Header, description = "Downstream session id, defaults to \"default\""),
    ),
    responses(
        (status = 200, description = "JSON-RPC reply, as JSON or a single `message` event", body = serde_json::Value),
        (status = 202, description = "Notification accepted, no reply"),
        (status = 400, description = "Empty or malformed body", body = serde_json::Value)
    ),
    tag = "mcp"
)]
pub async fn mcp_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if body.is_empty() {
        return Err(AppError::Protocol("Empty body"));
    }
    let incoming: Value =
        serde_json::from_slice(&body).map_err(|_| AppError::Protocol("Invalid JSON"))?;
    let request = JsonRpcRequest::from_value(&incoming).ok_or(AppError::Protocol("Invalid request"))?;

    let session_id = header_value(&headers, SESSION_HEADER)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string();
    let wants_event_stream = header_value(&headers, ACCEPT.as_str())
        .is_some_and(|accept| accept.contains(EVENT_STREAM_CONTENT_TYPE));

    let Some(reply) = state.dispatcher.dispatch(request, &session_id).await else {
        return Ok((
            StatusCode::ACCEPTED,
            [(SESSION_HEADER, session_id)],
            Json(Value::Null),
        )
            .into_response());
    };

    if wants_event_stream {
        return Ok((
            StatusCode::OK,
            [
                (CONTENT_TYPE.as_str(), EVENT_STREAM_CONTENT_TYPE.to_string()),
                (CACHE_CONTROL.as_str(), "no-cache".to_string()),
                (SESSION_HEADER, session_id),
            ],
            sse::message_event(&reply),
        )
            .into_response());
    }

    Ok((StatusCode::OK, [(SESSION_HEADER, session_id)], Json(reply)).into_response())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
