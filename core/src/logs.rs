use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Maximum number of request log entries a store retains. Oldest entries are evicted first.
pub const LOG_RETENTION: usize = 500;

/// Which leg of the traffic a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Request received from the downstream client
    Incoming,
    /// Reply produced locally
    Outgoing,
    /// Request forwarded to the upstream server
    ProxyOut,
    /// Reply received from the upstream server
    ProxyIn,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
            Direction::ProxyOut => "proxy_out",
            Direction::ProxyIn => "proxy_in",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "incoming" => Some(Direction::Incoming),
            "outgoing" => Some(Direction::Outgoing),
            "proxy_out" => Some(Direction::ProxyOut),
            "proxy_in" => Some(Direction::ProxyIn),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single payload a log entry carries.
#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    Params(Value),
    Result(Value),
    Error(Value),
}

impl LogPayload {
    /// Picks `error` over `result` from a JSON-RPC reply envelope.
    pub fn from_reply(reply: &Value) -> Self {
        match reply.get("error") {
            Some(error) if !error.is_null() => LogPayload::Error(error.clone()),
            _ => LogPayload::Result(reply.get("result").cloned().unwrap_or(Value::Null)),
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            LogPayload::Params(value) | LogPayload::Result(value) | LogPayload::Error(value) => {
                value
            }
        }
    }
}

/// A log entry before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub session_id: String,
    pub direction: Direction,
    pub method: String,
    pub payload: LogPayload,
}

impl NewLogEntry {
    pub fn new(
        session_id: impl Into<String>,
        direction: Direction,
        method: impl Into<String>,
        payload: LogPayload,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            direction,
            method: method.into(),
            payload,
        }
    }

    pub fn into_entry(self, id: u64, timestamp: DateTime<Utc>) -> RequestLogEntry {
        let (params, result, error) = match self.payload {
            LogPayload::Params(value) => (Some(value), None, None),
            LogPayload::Result(value) => (None, Some(value), None),
            LogPayload::Error(value) => (None, None, Some(value)),
        };
        RequestLogEntry {
            id,
            session_id: self.session_id,
            direction: self.direction,
            method: self.method,
            params,
            result,
            error,
            timestamp,
        }
    }
}

/// One recorded request or response. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestLogEntry {
    /// Strictly increasing for the life of the store
    pub id: u64,
    /// Downstream session identifier (`mcp-session-id` header, or "default")
    pub session_id: String,
    pub direction: Direction,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-capacity FIFO of log entries with its own id sequence.
#[derive(Debug, Clone)]
pub struct LogRing {
    next_id: u64,
    entries: VecDeque<RequestLogEntry>,
    capacity: usize,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::with_capacity(LOG_RETENTION)
    }
}

impl LogRing {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: 1,
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuilds a ring from previously persisted entries (oldest first).
    pub fn restore(entries: Vec<RequestLogEntry>, next_id: u64) -> Self {
        let mut ring = Self::default();
        let max_id = entries.iter().map(|entry| entry.id).max().unwrap_or(0);
        ring.next_id = next_id.max(max_id + 1);
        for entry in entries {
            ring.entries.push_back(entry);
        }
        ring.trim();
        ring
    }

    pub fn push(&mut self, entry: NewLogEntry) -> RequestLogEntry {
        let stored = entry.into_entry(self.next_id, Utc::now());
        self.next_id += 1;
        self.entries.push_back(stored.clone());
        self.trim();
        stored
    }

    /// Newest first, at most `limit` entries.
    pub fn newest(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RequestLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Drops every entry; the id sequence keeps counting.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}
