use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use toolbelt_core::tools::{ToolDefinition, default_input_schema, default_mock_response};
use utoipa::ToSchema;

use super::logs::StatusResponse;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/mock-tools", get(list_mock_tools).post(register_mock_tool))
        .route("/api/mock-tools/{name}", delete(delete_mock_tool))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterMockToolRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
    /// Text template with `{{argument}}` placeholders, or any JSON value
    #[serde(default)]
    pub mock_response: Option<Value>,
}

/// Dynamically registered mock tools, by name
#[utoipa::path(
    get,
    path = "/api/mock-tools",
    responses(
        (status = 200, description = "Registered mock tools", body = Vec<ToolDefinition>)
    ),
    tag = "mock-tools"
)]
pub async fn list_mock_tools(
    State(state): State<AppState>,
) -> Result<Json<Vec<ToolDefinition>>, AppError> {
    Ok(Json(state.store.list_tools().await?))
}

/// Registers or replaces a mock tool
#[utoipa::path(
    post,
    path = "/api/mock-tools",
    request_body = RegisterMockToolRequest,
    responses(
        (status = 200, description = "Tool stored", body = StatusResponse),
        (status = 400, description = "Missing name", body = toolbelt_core::error::ApiError)
    ),
    tag = "mock-tools"
)]
pub async fn register_mock_tool(
    State(state): State<AppState>,
    Json(req): Json<RegisterMockToolRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation {
            message: "name is required".to_string(),
            field: Some("name".to_string()),
            received: Some(Value::String(req.name)),
        });
    }

    let tool = ToolDefinition::new(
        name,
        req.description.unwrap_or_default(),
        req.input_schema.unwrap_or_else(default_input_schema),
        req.mock_response.unwrap_or_else(default_mock_response),
    );
    let stored = state.store.upsert_tool(tool).await?;
    tracing::info!(event = "mock_tool_registered", name = %stored.name, "mock tool registered");
    Ok(Json(StatusResponse::ok()))
}

/// Removes a mock tool; removing an unknown name is not an error
#[utoipa::path(
    delete,
    path = "/api/mock-tools/{name}",
    params(("name" = String, Path, description = "Tool name")),
    responses(
        (status = 200, description = "Tool removed", body = StatusResponse)
    ),
    tag = "mock-tools"
)]
pub async fn delete_mock_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let existed = state.store.delete_tool(&name).await?;
    tracing::info!(event = "mock_tool_deleted", name = %name, existed, "mock tool deleted");
    Ok(Json(StatusResponse::ok()))
}
