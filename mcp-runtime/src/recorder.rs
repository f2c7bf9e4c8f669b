use std::sync::Arc;

use toolbelt_core::logs::{Direction, LogPayload, NewLogEntry};
use toolbelt_core::store::Store;

/// Writes traffic entries to the store and mirrors them to tracing.
#[derive(Clone)]
pub struct TrafficRecorder {
    store: Arc<dyn Store>,
}

impl TrafficRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Never fails: a store error is logged and the request carries on.
    pub async fn record(
        &self,
        session_id: &str,
        direction: Direction,
        method: &str,
        payload: LogPayload,
    ) {
        tracing::debug!(
            event = "mcp_traffic_payload",
            direction = %direction,
            method = %method,
            session_id = %session_id,
            payload = %payload.value(),
        );

        let entry = NewLogEntry::new(session_id, direction, method, payload);
        match self.store.append_log(entry).await {
            Ok(stored) => tracing::info!(
                event = "mcp_traffic",
                log_id = stored.id,
                direction = %direction,
                method = %method,
                session_id = %session_id,
                "{} {}",
                direction.as_str().to_uppercase(),
                method
            ),
            Err(err) => tracing::warn!(
                error = %err,
                direction = %direction,
                method = %method,
                session_id = %session_id,
                "failed to persist traffic log entry"
            ),
        }
    }
}
