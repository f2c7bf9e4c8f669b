//! Minimal server-sent-events framing for single-message MCP replies.

use serde_json::Value;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Whether an upstream reply should be read as an event stream rather than plain JSON.
pub fn is_event_stream(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.contains(EVENT_STREAM_CONTENT_TYPE)) {
        return true;
    }
    let body = body.trim_start();
    body.starts_with("event:") || body.starts_with("data:")
}

/// The first `data:` line whose payload parses as JSON. Other lines and framing are ignored.
pub fn first_data_payload(body: &str) -> Option<Value> {
    body.lines()
        .filter_map(|line| line.trim_end_matches('\r').strip_prefix("data:"))
        .find_map(|data| serde_json::from_str(data.trim()).ok())
}

/// Frames one JSON-RPC reply as a single `message` event.
pub fn message_event(payload: &Value) -> String {
    format!("event: message\ndata: {payload}\n\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn picks_first_data_line() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\ndata: {\"id\":2}\n\n";
        assert_eq!(
            first_data_payload(body),
            Some(json!({"jsonrpc": "2.0", "id": 1, "result": {}}))
        );
    }

    #[test]
    fn handles_crlf_and_missing_space() {
        let body = "event: message\r\ndata:{\"id\":3}\r\n\r\n";
        assert_eq!(first_data_payload(body), Some(json!({"id": 3})));
    }

    #[test]
    fn skips_unparseable_data_lines() {
        let body = "data: [partial\ndata: {\"id\":4}\n";
        assert_eq!(first_data_payload(body), Some(json!({"id": 4})));
    }

    #[test]
    fn no_data_line_yields_nothing() {
        assert_eq!(first_data_payload("event: message\n: keepalive\n\n"), None);
        assert_eq!(first_data_payload(""), None);
    }

    #[test]
    fn detects_event_stream_by_header_or_body() {
        assert!(is_event_stream(Some("text/event-stream; charset=utf-8"), "{}"));
        assert!(is_event_stream(None, "event: message\ndata: {}"));
        assert!(is_event_stream(Some("application/json"), "data: {}"));
        assert!(!is_event_stream(Some("application/json"), "{\"id\":1}"));
    }

    #[test]
    fn message_event_round_trips_through_parser() {
        let reply = json!({"jsonrpc": "2.0", "id": "a", "result": {"ok": true}});
        let framed = message_event(&reply);
        assert!(framed.starts_with("event: message\ndata: "));
        assert!(framed.ends_with("\n\n"));
        assert_eq!(first_data_payload(&framed), Some(reply));
    }
}
