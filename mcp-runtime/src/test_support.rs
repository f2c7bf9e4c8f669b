//! Throwaway HTTP upstream used by proxy and dispatch tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};

use crate::proxy::SESSION_HEADER;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamMode {
    Json,
    EventStream,
    EmptyEventStream,
    Tokenless,
    /// Handshakes normally, then holds every other call for [`STALL_FOR`].
    Stall,
}

pub const STALL_FOR: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub method: String,
    pub session: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct UpstreamState {
    mode: UpstreamMode,
    token: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct Upstream {
    pub url: String,
    pub token: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl Upstream {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn initialize_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == "initialize")
            .count()
    }
}

pub async fn spawn_upstream(mode: UpstreamMode) -> Upstream {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let token = "upstream-session-1".to_string();
    let state = UpstreamState {
        mode,
        token: token.clone(),
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/mcp", post(handle))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        url: format!("http://{addr}/mcp"),
        token,
        seen,
    }
}

async fn handle(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push(SeenRequest {
        method: method.clone(),
        session,
        body: body.clone(),
    });

    let id = body["id"].clone();
    if method == "initialize" {
        let reply = json!({"jsonrpc": "2.0", "id": id, "result": {"protocolVersion": "2024-11-05"}});
        return match state.mode {
            UpstreamMode::Tokenless => axum::Json(reply).into_response(),
            _ => (
                [(SESSION_HEADER, state.token.clone())],
                axum::Json(reply),
            )
                .into_response(),
        };
    }

    if state.mode == UpstreamMode::Stall {
        tokio::time::sleep(STALL_FOR).await;
    }

    let reply = json!({"jsonrpc": "2.0", "id": id, "result": {"method": method}});
    match state.mode {
        UpstreamMode::Json | UpstreamMode::Tokenless | UpstreamMode::Stall => {
            axum::Json(reply).into_response()
        }
        UpstreamMode::EventStream => (
            [(CONTENT_TYPE, "text/event-stream")],
            format!("event: message\ndata: {reply}\n\n"),
        )
            .into_response(),
        UpstreamMode::EmptyEventStream => (
            [(CONTENT_TYPE, "text/event-stream")],
            "event: message\n: keepalive\n\n".to_string(),
        )
            .into_response(),
    }
}
