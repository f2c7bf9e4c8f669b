use crate::util::api_request;

/// Newest entries first. The server caps `limit` at its retention size.
pub async fn list(api_url: &str, limit: Option<usize>) -> i32 {
    let query: Vec<(String, String)> = limit
        .map(|l| vec![("limit".to_string(), l.to_string())])
        .unwrap_or_default();
    api_request(api_url, reqwest::Method::GET, "/api/logs", None, &query, &[]).await
}

pub async fn clear(api_url: &str) -> i32 {
    api_request(api_url, reqwest::Method::POST, "/api/logs/clear", None, &[], &[]).await
}
