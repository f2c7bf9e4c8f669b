use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Value, json};
use toolbelt_core::jsonrpc::{JsonRpcRequest, RpcError, error_response};
use toolbelt_core::logs::{Direction, LogPayload};

use crate::recorder::TrafficRecorder;
use crate::session::{ProxySession, UpstreamBinding};
use crate::{MCP_PROTOCOL_VERSION, PROXY_CLIENT_NAME, SERVER_VERSION, sse};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const PROXY_ACCEPT: &str = "application/json, text/event-stream";
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

const INITIALIZE_REQUEST_ID: &str = "init";

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream reply is not a JSON-RPC object: {0}")]
    InvalidReply(String),
    #[error("upstream event stream carried no JSON data line")]
    EmptyEventStream,
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Transport(err)
        }
    }
}

/// Sends JSON-RPC calls to the configured upstream and normalizes JSON or SSE replies.
#[derive(Clone)]
pub struct ProxyForwarder {
    http: reqwest::Client,
    session: Arc<ProxySession>,
    recorder: TrafficRecorder,
    timeout: Duration,
}

impl ProxyForwarder {
    pub fn new(session: Arc<ProxySession>, recorder: TrafficRecorder, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            session,
            recorder,
            timeout,
        }
    }

    /// Forwards to whatever target is configured right now.
    ///
    /// Without a target this answers `-32600 "No proxy target configured"` and never
    /// touches the network.
    pub async fn forward(
        &self,
        method: &str,
        params: &Value,
        request_id: &Value,
        session_id: &str,
    ) -> Value {
        let Some(binding) = self.session.snapshot() else {
            let reply = error_response(
                request_id.clone(),
                &RpcError::invalid_request("No proxy target configured"),
            );
            self.recorder
                .record(session_id, Direction::ProxyIn, method, LogPayload::from_reply(&reply))
                .await;
            return reply;
        };
        self.forward_to(&binding, method, params, request_id, session_id)
            .await
    }

    /// Forwards against a binding the caller already holds, so a concurrent target
    /// change cannot split one request across two upstreams.
    ///
    /// Always yields a reply envelope and always records exactly one `proxy_in` entry.
    pub async fn forward_to(
        &self,
        binding: &UpstreamBinding,
        method: &str,
        params: &Value,
        request_id: &Value,
        session_id: &str,
    ) -> Value {
        let reply = match self
            .exchange(binding, method, params, request_id, session_id)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    target = %binding.target(),
                    method = %method,
                    session_id = %session_id,
                    "proxy forward failed"
                );
                error_response(request_id.clone(), &RpcError::invalid_request("Proxy failed"))
            }
        };

        self.recorder
            .record(session_id, Direction::ProxyIn, method, LogPayload::from_reply(&reply))
            .await;
        reply
    }

    async fn exchange(
        &self,
        binding: &UpstreamBinding,
        method: &str,
        params: &Value,
        request_id: &Value,
        session_id: &str,
    ) -> Result<Value, ProxyError> {
        let token = binding
            .establish(|| self.initialize(binding.target()))
            .await?
            .map(str::to_string);

        let request = JsonRpcRequest::new(Some(request_id.clone()), method, params.clone());
        self.recorder
            .record(
                session_id,
                Direction::ProxyOut,
                method,
                LogPayload::Params(params.clone()),
            )
            .await;

        let response = self
            .post(binding.target(), &request.to_value(), token.as_deref())
            .await?;
        read_reply(response).await
    }

    /// Synthetic `initialize` handshake; returns the upstream session token, if any.
    async fn initialize(&self, target: &str) -> Result<Option<String>, ProxyError> {
        let request = JsonRpcRequest::new(
            Some(json!(INITIALIZE_REQUEST_ID)),
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": PROXY_CLIENT_NAME, "version": SERVER_VERSION},
            }),
        );
        let response = self.post(target, &request.to_value(), None).await?;
        let status = response.status();
        let token = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            tracing::warn!(
                target = %target,
                status = status.as_u16(),
                "upstream rejected initialize; continuing without a session"
            );
        }
        tracing::info!(
            event = "upstream_session_established",
            target = %target,
            has_token = token.is_some(),
            "upstream session established"
        );
        Ok(token)
    }

    async fn post(
        &self,
        target: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut request = self
            .http
            .post(target)
            .timeout(self.timeout)
            .header(ACCEPT, PROXY_ACCEPT)
            .json(body);
        if let Some(token) = token {
            request = request.header(SESSION_HEADER, token);
        }
        Ok(request.send().await?)
    }
}

/// Reads a raw JSON object or the first JSON `data:` line of an event stream.
async fn read_reply(response: reqwest::Response) -> Result<Value, ProxyError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;

    let reply = if sse::is_event_stream(content_type.as_deref(), &body) {
        sse::first_data_payload(&body).ok_or(ProxyError::EmptyEventStream)?
    } else {
        serde_json::from_str::<Value>(&body)
            .map_err(|err| ProxyError::InvalidReply(err.to_string()))?
    };

    if !reply.is_object() {
        return Err(ProxyError::InvalidReply(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(reply)
}
