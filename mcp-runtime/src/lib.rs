//! MCP request dispatch for MCP Toolbelt: local mock tools, upstream proxying and
//! traffic recording.

pub mod dispatch;
pub mod proxy;
pub mod recorder;
pub mod registry;
pub mod session;
pub mod sse;
pub mod template;

#[cfg(test)]
mod test_support;

pub use dispatch::{Dispatcher, DispatcherConfig};
pub use proxy::{DEFAULT_PROXY_TIMEOUT, ProxyError, ProxyForwarder, SESSION_HEADER};
pub use recorder::TrafficRecorder;
pub use registry::ToolRegistry;
pub use session::{ProxySession, UpstreamBinding};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "mcp-toolbelt";
pub const PROXY_CLIENT_NAME: &str = "mcp-toolbelt-proxy";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
