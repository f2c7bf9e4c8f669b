use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use toolbelt_mcp_runtime::SESSION_HEADER;

/// Build a CORS layer from the `TOOLBELT_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list (default: any origin)
/// - Methods: GET, POST, DELETE, OPTIONS
/// - Headers: Accept, Content-Type, mcp-session-id (also exposed)
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("TOOLBELT_CORS_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let session_header = HeaderName::from_static(SESSION_HEADER);
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("accept"),
            HeaderName::from_static("content-type"),
            session_header.clone(),
        ])
        .expose_headers([session_header])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
