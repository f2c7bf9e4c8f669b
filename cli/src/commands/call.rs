use serde_json::{Value, json};
use toolbelt_core::jsonrpc::JsonRpcRequest;
use toolbelt_mcp_runtime::SESSION_HEADER;

use crate::util::{api_request, exit_error, parse_json_arg};

pub struct CallArgs {
    pub method: String,
    pub params: Option<String>,
    pub session: Option<String>,
    pub id: Option<String>,
    pub notify: bool,
}

/// Sends one JSON-RPC message to `/mcp` and prints the reply.
pub async fn run(api_url: &str, args: CallArgs) -> i32 {
    let params = match args.params.as_deref() {
        Some(raw) => parse_json_arg("--params", raw).unwrap_or_else(|e| exit_error(&e, None)),
        None => json!({}),
    };
    let request = build_request(&args.method, params, args.id, args.notify);

    let mut headers = vec![("accept".to_string(), "application/json".to_string())];
    if let Some(session) = args.session {
        headers.push((SESSION_HEADER.to_string(), session));
    }

    api_request(
        api_url,
        reqwest::Method::POST,
        "/mcp",
        Some(request.to_value()),
        &[],
        &headers,
    )
    .await
}

fn build_request(method: &str, params: Value, id: Option<String>, notify: bool) -> JsonRpcRequest {
    let id = if notify {
        None
    } else {
        Some(Value::String(
            id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
        ))
    };
    JsonRpcRequest::new(id, method, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_gets_generated_id() {
        let request = build_request("tools/list", json!({}), None, false);
        let value = request.to_value();
        assert_eq!(value["jsonrpc"], json!("2.0"));
        assert_eq!(value["method"], json!("tools/list"));
        assert!(value["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[test]
    fn explicit_id_is_kept() {
        let request = build_request("ping", json!({}), Some("abc".to_string()), false);
        assert_eq!(request.id, Some(json!("abc")));
    }

    #[test]
    fn notify_drops_the_id() {
        let request = build_request("notifications/initialized", json!({}), None, true);
        assert!(request.is_notification());
    }
}
