use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use toolbelt_core::logs::{LOG_RETENTION, RequestLogEntry};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/logs", get(list_logs))
        .route("/api/logs/clear", post(clear_logs))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LogsQuery {
    /// Maximum entries to return (default 100, capped at 500)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Recent MCP traffic, newest first
#[utoipa::path(
    get,
    path = "/api/logs",
    params(LogsQuery),
    responses(
        (status = 200, description = "Log entries, newest first", body = Vec<RequestLogEntry>)
    ),
    tag = "logs"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<RequestLogEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).min(LOG_RETENTION);
    Ok(Json(state.store.list_logs(limit).await?))
}

#[utoipa::path(
    post,
    path = "/api/logs/clear",
    responses(
        (status = 200, description = "Log cleared", body = StatusResponse)
    ),
    tag = "logs"
)]
pub async fn clear_logs(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    state.store.clear_logs().await?;
    tracing::info!(event = "logs_cleared", "request log cleared");
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use toolbelt_core::logs::{Direction, LogPayload, NewLogEntry};
    use toolbelt_core::store::Store;
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    async fn seeded_state(count: usize) -> AppState {
        let state = test_state();
        for n in 0..count {
            state
                .store
                .append_log(NewLogEntry::new(
                    "default",
                    Direction::Incoming,
                    format!("m{n}"),
                    LogPayload::Params(json!({})),
                ))
                .await
                .unwrap();
        }
        state
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn lists_newest_first_with_default_limit() {
        let state = seeded_state(150).await;
        let logs = get_json(router().with_state(state), "/api/logs").await;
        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 100);
        assert_eq!(logs[0]["id"], json!(150));
        assert_eq!(logs[0]["direction"], json!("incoming"));
        assert_eq!(logs[0]["params"], json!({}));
        assert!(logs[0].get("result").is_none());
    }

    #[tokio::test]
    async fn explicit_limit_is_honoured() {
        let state = seeded_state(10).await;
        let logs = get_json(router().with_state(state), "/api/logs?limit=3").await;
        let ids: Vec<u64> = logs
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, [10, 9, 8]);
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let state = seeded_state(5).await;
        let response = router()
            .with_state(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/logs/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.store.list_logs(10).await.unwrap().is_empty());
    }
}
