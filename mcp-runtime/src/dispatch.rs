use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use toolbelt_core::jsonrpc::{JsonRpcRequest, RpcError, error_response, success_response};
use toolbelt_core::logs::{Direction, LogPayload};
use toolbelt_core::store::Store;
use toolbelt_core::tools::ToolDefinition;

use crate::proxy::{DEFAULT_PROXY_TIMEOUT, ProxyForwarder};
use crate::recorder::TrafficRecorder;
use crate::registry::ToolRegistry;
use crate::session::ProxySession;
use crate::template::render_mock_response;
use crate::{MCP_PROTOCOL_VERSION, MCP_SERVER_NAME, SERVER_VERSION};

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub config_tools: Vec<ToolDefinition>,
    pub proxy_target: Option<String>,
    pub proxy_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            config_tools: Vec::new(),
            proxy_target: None,
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
        }
    }
}

/// Methods answered locally when no proxy target is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LocalMethod {
    Initialize,
    ToolsList,
    ToolsCall,
    Ping,
}

impl LocalMethod {
    fn parse(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(Self::Initialize),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }
}

/// Routes one JSON-RPC message to a local handler or the upstream proxy and records
/// every hop in the traffic log.
pub struct Dispatcher {
    registry: ToolRegistry,
    recorder: TrafficRecorder,
    session: Arc<ProxySession>,
    forwarder: ProxyForwarder,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, store: Arc<dyn Store>) -> Self {
        let recorder = TrafficRecorder::new(store.clone());
        let session = Arc::new(ProxySession::new(config.proxy_target));
        let forwarder = ProxyForwarder::new(session.clone(), recorder.clone(), config.proxy_timeout);
        Self {
            registry: ToolRegistry::new(config.config_tools, store),
            recorder,
            session,
            forwarder,
        }
    }

    pub fn proxy_target(&self) -> Option<String> {
        self.session.target()
    }

    /// Swaps the upstream target and drops any cached upstream session.
    pub fn set_proxy_target(&self, target: Option<String>) -> Option<String> {
        let previous = self.session.set_target(target);
        tracing::info!(
            event = "proxy_target_changed",
            previous = previous.as_deref().unwrap_or(""),
            current = self.session.target().as_deref().unwrap_or(""),
            "proxy target changed"
        );
        previous
    }

    /// Handles a single request. Returns `None` for notifications, which get no reply.
    pub async fn dispatch(&self, request: JsonRpcRequest, session_id: &str) -> Option<Value> {
        self.recorder
            .record(
                session_id,
                Direction::Incoming,
                &request.method,
                LogPayload::Params(request.params.clone()),
            )
            .await;

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, session_id = %session_id, "notification accepted");
            return None;
        };

        // `initialize` is always answered locally, even in proxy mode.
        if let Some(binding) = self.session.snapshot()
            && request.method != "initialize"
        {
            let reply = self
                .forwarder
                .forward_to(&binding, &request.method, &request.params, &id, session_id)
                .await;
            return Some(reply);
        }

        let outcome = match LocalMethod::parse(&request.method) {
            Some(LocalMethod::Initialize) => Ok(initialize_payload()),
            Some(LocalMethod::ToolsList) => Ok(self.tools_list_payload().await),
            Some(LocalMethod::ToolsCall) => self.handle_tools_call(&request.params).await,
            Some(LocalMethod::Ping) => Ok(json!({})),
            None => Err(RpcError::method_not_found(format!(
                "Unknown method: {}",
                request.method
            ))),
        };

        let (reply, payload) = match outcome {
            Ok(result) => (success_response(id, result.clone()), LogPayload::Result(result)),
            Err(err) => (error_response(id, &err), LogPayload::Error(err.to_value())),
        };
        self.recorder
            .record(session_id, Direction::Outgoing, &request.method, payload)
            .await;
        Some(reply)
    }

    async fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .list_all()
            .await
            .iter()
            .map(ToolDefinition::summary)
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: &Value) -> Result<Value, RpcError> {
        let arguments = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        // a missing or non-string name cannot match any tool
        let tool = match params.get("name") {
            Some(Value::String(name)) => self.registry.resolve(name).await,
            _ => None,
        }
        .ok_or_else(|| {
            RpcError::method_not_found(format!("Unknown tool: {}", unknown_tool_label(params)))
        })?;

        let text = render_mock_response(&tool.mock_response, &arguments);
        Ok(json!({
            "content": [{ "type": "text", "text": text }]
        }))
    }
}

/// Strings as-is, anything else (including a missing name) as JSON text.
fn unknown_tool_label(params: &Value) -> String {
    match params.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => Value::Null.to_string(),
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

#[cfg(test)]
mod tests {
    use toolbelt_core::store::MemoryStore;
    use toolbelt_core::tools::echo_tool;

    use super::*;
    use crate::test_support::{UpstreamMode, spawn_upstream};

    fn dispatcher_with(proxy_target: Option<String>) -> (Arc<Dispatcher>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = DispatcherConfig {
            config_tools: vec![echo_tool()],
            proxy_target,
            proxy_timeout: Duration::from_secs(5),
        };
        (Arc::new(Dispatcher::new(config, store.clone())), store)
    }

    fn request(id: Value, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(Some(id), method, params)
    }

    #[tokio::test]
    async fn unknown_method_yields_exact_error_envelope() {
        let (dispatcher, _) = dispatcher_with(None);
        let reply = dispatcher
            .dispatch(request(json!(7), "bogus", json!({})), "s1")
            .await
            .unwrap();
        assert_eq!(
            reply,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "error": {"code": -32601, "message": "Unknown method: bogus"}
            })
        );
    }

    #[tokio::test]
    async fn initialize_advertises_tools_capability() {
        let (dispatcher, _) = dispatcher_with(None);
        let reply = dispatcher
            .dispatch(request(json!(1), "initialize", json!({})), "s1")
            .await
            .unwrap();
        assert_eq!(reply["result"]["protocolVersion"], json!("2024-11-05"));
        assert_eq!(reply["result"]["capabilities"], json!({"tools": {}}));
        assert_eq!(reply["result"]["serverInfo"]["name"], json!("mcp-toolbelt"));
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let (dispatcher, _) = dispatcher_with(None);
        let reply = dispatcher
            .dispatch(request(json!("p"), "ping", Value::Null), "s1")
            .await
            .unwrap();
        assert_eq!(reply["result"], json!({}));
    }

    #[tokio::test]
    async fn tools_call_renders_dynamic_template() {
        let (dispatcher, store) = dispatcher_with(None);
        store
            .upsert_tool(ToolDefinition::new(
                "greet",
                "",
                json!({"type": "object"}),
                json!("Hello {{who}}"),
            ))
            .await
            .unwrap();

        let reply = dispatcher
            .dispatch(
                request(
                    json!(2),
                    "tools/call",
                    json!({"name": "greet", "arguments": {"who": "Ada"}}),
                ),
                "s1",
            )
            .await
            .unwrap();
        assert_eq!(
            reply["result"],
            json!({"content": [{"type": "text", "text": "Hello Ada"}]})
        );
    }

    #[tokio::test]
    async fn tools_call_serializes_structured_mock_response() {
        let (dispatcher, store) = dispatcher_with(None);
        store
            .upsert_tool(ToolDefinition::new(
                "weather",
                "",
                json!({}),
                json!({"temp": 21}),
            ))
            .await
            .unwrap();
        let reply = dispatcher
            .dispatch(
                request(json!(3), "tools/call", json!({"name": "weather"})),
                "s1",
            )
            .await
            .unwrap();
        assert_eq!(reply["result"]["content"][0]["text"], json!("{\"temp\":21}"));
    }

    #[tokio::test]
    async fn tools_call_unknown_tool_is_method_not_found() {
        let (dispatcher, _) = dispatcher_with(None);
        let reply = dispatcher
            .dispatch(
                request(json!(4), "tools/call", json!({"name": "nope"})),
                "s1",
            )
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], json!(-32601));
        assert_eq!(reply["error"]["message"], json!("Unknown tool: nope"));
        assert!(reply.get("result").is_none());
    }

    #[tokio::test]
    async fn tools_call_without_string_name_is_unknown_tool() {
        let (dispatcher, store) = dispatcher_with(None);
        for (id, params, message) in [
            (10, json!({}), "Unknown tool: null"),
            (11, json!({"name": 5}), "Unknown tool: 5"),
        ] {
            let reply = dispatcher
                .dispatch(request(json!(id), "tools/call", params), "s1")
                .await
                .unwrap();
            assert_eq!(
                reply,
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": message}
                })
            );
        }

        let outgoing: Vec<_> = store
            .list_logs(10)
            .await
            .unwrap()
            .into_iter()
            .filter(|entry| entry.direction == Direction::Outgoing)
            .collect();
        assert_eq!(outgoing.len(), 2);
        assert!(outgoing.iter().all(|entry| entry.error.is_some()));
    }

    #[tokio::test]
    async fn tools_list_includes_config_and_dynamic_tools() {
        let (dispatcher, store) = dispatcher_with(None);
        store
            .upsert_tool(ToolDefinition::new("extra", "x", json!({}), json!("ok")))
            .await
            .unwrap();
        let reply = dispatcher
            .dispatch(request(json!(5), "tools/list", json!({})), "s1")
            .await
            .unwrap();
        let names: Vec<&str> = reply["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["echo", "extra"]);
        assert!(reply["result"]["tools"][0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn notification_logs_incoming_only() {
        let (dispatcher, store) = dispatcher_with(None);
        let reply = dispatcher
            .dispatch(
                JsonRpcRequest::new(None, "notifications/initialized", json!({})),
                "s1",
            )
            .await;
        assert!(reply.is_none());

        let logs = store.list_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].direction, Direction::Incoming);
    }

    #[tokio::test]
    async fn local_request_logs_incoming_then_outgoing() {
        let (dispatcher, store) = dispatcher_with(None);
        dispatcher
            .dispatch(
                request(
                    json!(9),
                    "tools/call",
                    json!({"name": "echo", "arguments": {"message": "hi"}}),
                ),
                "sess-a",
            )
            .await
            .unwrap();

        let logs = store.list_logs(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].direction, Direction::Incoming);
        assert_eq!(logs[0].direction, Direction::Outgoing);
        assert!(logs[0].id > logs[1].id);
        assert!(logs.iter().all(|e| e.session_id == "sess-a"));
        assert_eq!(
            logs[0].result,
            Some(json!({"content": [{"type": "text", "text": "hi"}]}))
        );
    }

    #[tokio::test]
    async fn proxy_mode_initializes_upstream_once() {
        let upstream = spawn_upstream(UpstreamMode::Json).await;
        let (dispatcher, store) = dispatcher_with(Some(upstream.url.clone()));

        let first = dispatcher
            .dispatch(request(json!(1), "tools/list", json!({})), "s1")
            .await
            .unwrap();
        assert_eq!(first["result"]["method"], json!("tools/list"));
        dispatcher
            .dispatch(request(json!(2), "tools/call", json!({"name": "x"})), "s1")
            .await
            .unwrap();

        assert_eq!(upstream.initialize_count(), 1);
        let seen = upstream.requests();
        assert_eq!(seen[0].method, "initialize");
        assert_eq!(seen[0].body["id"], json!("init"));
        assert_eq!(
            seen[0].body["params"]["clientInfo"]["name"],
            json!("mcp-toolbelt-proxy")
        );

        let directions: Vec<Direction> = store
            .list_logs(10)
            .await
            .unwrap()
            .iter()
            .rev()
            .map(|e| e.direction)
            .collect();
        assert_eq!(
            directions,
            [
                Direction::Incoming,
                Direction::ProxyOut,
                Direction::ProxyIn,
                Direction::Incoming,
                Direction::ProxyOut,
                Direction::ProxyIn,
            ]
        );
    }

    #[tokio::test]
    async fn proxy_mode_still_answers_initialize_locally() {
        let upstream = spawn_upstream(UpstreamMode::Json).await;
        let (dispatcher, _) = dispatcher_with(Some(upstream.url.clone()));

        let reply = dispatcher
            .dispatch(request(json!(1), "initialize", json!({})), "s1")
            .await
            .unwrap();
        assert_eq!(reply["result"]["serverInfo"]["name"], json!("mcp-toolbelt"));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn target_change_forces_new_handshake() {
        let upstream = spawn_upstream(UpstreamMode::Json).await;
        let (dispatcher, _) = dispatcher_with(Some(upstream.url.clone()));

        dispatcher
            .dispatch(request(json!(1), "ping", json!({})), "s1")
            .await;
        dispatcher.set_proxy_target(Some(upstream.url.clone()));
        dispatcher
            .dispatch(request(json!(2), "ping", json!({})), "s1")
            .await;

        assert_eq!(upstream.initialize_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_handshake() {
        let upstream = spawn_upstream(UpstreamMode::EventStream).await;
        let (dispatcher, _) = dispatcher_with(Some(upstream.url.clone()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher
                    .dispatch(request(json!(i), "tools/list", json!({})), "s1")
                    .await
            }));
        }
        for handle in handles {
            let reply = handle.await.unwrap().unwrap();
            assert_eq!(reply["result"]["method"], json!("tools/list"));
        }
        assert_eq!(upstream.initialize_count(), 1);
    }

    #[tokio::test]
    async fn clearing_target_returns_to_local_mode() {
        let upstream = spawn_upstream(UpstreamMode::Json).await;
        let (dispatcher, _) = dispatcher_with(Some(upstream.url.clone()));
        let previous = dispatcher.set_proxy_target(None);
        assert_eq!(previous.as_deref(), Some(upstream.url.as_str()));
        assert_eq!(dispatcher.proxy_target(), None);

        let reply = dispatcher
            .dispatch(request(json!(1), "bogus", json!({})), "s1")
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], json!(-32601));
        assert!(upstream.requests().is_empty());
    }
}
