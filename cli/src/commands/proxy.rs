use clap::Subcommand;
use serde_json::{Value, json};

use crate::util::api_request;

#[derive(Subcommand)]
pub enum ProxyCommands {
    /// Show the current upstream target
    Show,
    /// Forward MCP traffic to an upstream endpoint
    Set {
        /// Absolute http(s) URL of the upstream MCP endpoint
        url: String,
    },
    /// Return to local mode
    Clear,
}

pub async fn run(api_url: &str, command: ProxyCommands) -> i32 {
    match command {
        ProxyCommands::Show => {
            api_request(api_url, reqwest::Method::GET, "/api/proxy", None, &[], &[]).await
        }
        ProxyCommands::Set { url } => set(api_url, set_body(Some(url))).await,
        ProxyCommands::Clear => set(api_url, set_body(None)).await,
    }
}

async fn set(api_url: &str, body: Value) -> i32 {
    api_request(
        api_url,
        reqwest::Method::POST,
        "/api/proxy/set",
        Some(body),
        &[],
        &[],
    )
    .await
}

fn set_body(url: Option<String>) -> Value {
    json!({ "url": url })
}
