use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/proxy", get(get_proxy))
        .route("/api/proxy/set", post(set_proxy))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProxyResponse {
    pub proxy_target: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SetProxyResponse {
    pub status: String,
    pub proxy_target: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetProxyRequest {
    /// Upstream MCP endpoint; null or "" switches back to local mode
    #[serde(default)]
    pub url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/proxy",
    responses(
        (status = 200, description = "Current upstream target", body = ProxyResponse)
    ),
    tag = "proxy"
)]
pub async fn get_proxy(State(state): State<AppState>) -> Json<ProxyResponse> {
    Json(ProxyResponse {
        proxy_target: state.dispatcher.proxy_target(),
    })
}

/// Changes the upstream target. Always drops the cached upstream session.
#[utoipa::path(
    post,
    path = "/api/proxy/set",
    request_body = SetProxyRequest,
    responses(
        (status = 200, description = "Target changed", body = SetProxyResponse),
        (status = 400, description = "Not an absolute http(s) URL", body = toolbelt_core::error::ApiError)
    ),
    tag = "proxy"
)]
pub async fn set_proxy(
    State(state): State<AppState>,
    Json(req): Json<SetProxyRequest>,
) -> Result<Json<SetProxyResponse>, AppError> {
    let target = normalize_target(req.url)?;

    state.config.persist_proxy_target(target.clone()).await?;
    state.dispatcher.set_proxy_target(target.clone());
    tracing::info!(
        event = "proxy_target_set",
        proxy_target = target.as_deref().unwrap_or(""),
        persisted = state.config.path().is_some(),
        "proxy target set"
    );

    Ok(Json(SetProxyResponse {
        status: "ok".to_string(),
        proxy_target: target,
    }))
}

fn normalize_target(raw: Option<String>) -> Result<Option<String>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(Some(trimmed.to_string()))
        }
        _ => Err(AppError::Validation {
            message: "url must be an absolute http:// or https:// URL".to_string(),
            field: Some("url".to_string()),
            received: Some(serde_json::Value::String(raw)),
        }),
    }
}
