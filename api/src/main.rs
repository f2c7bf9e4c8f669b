use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use toolbelt_core::store::StoreError;
use toolbelt_mcp_runtime::{Dispatcher, DispatcherConfig};

mod config;
mod error;
mod middleware;
mod routes;
mod state;
mod store;

use config::{ConfigError, ConfigFile, ToolbeltConfig};
use store::StoreKind;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MCP Toolbelt API",
        version = "0.1.0",
        description = "Debugging intermediary for MCP clients: mock tools, upstream proxy and a traffic log."
    ),
    paths(
        routes::health::health_check,
        routes::mcp_http::mcp_post,
        routes::logs::list_logs,
        routes::logs::clear_logs,
        routes::proxy::get_proxy,
        routes::proxy::set_proxy,
        routes::mock_tools::list_mock_tools,
        routes::mock_tools::register_mock_tool,
        routes::mock_tools::delete_mock_tool,
    ),
    components(schemas(
        HealthResponse,
        toolbelt_core::error::ApiError,
        toolbelt_core::logs::Direction,
        toolbelt_core::logs::RequestLogEntry,
        toolbelt_core::tools::ToolDefinition,
        routes::logs::StatusResponse,
        routes::proxy::ProxyResponse,
        routes::proxy::SetProxyRequest,
        routes::proxy::SetProxyResponse,
        routes::mock_tools::RegisterMockToolRequest,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(
    name = "mcp-toolbelt",
    version,
    about = "MCP debugging intermediary: mock tools, upstream proxy and traffic log"
)]
struct Cli {
    /// Interface to bind
    #[arg(long, env = "TOOLBELT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "TOOLBELT_PORT", default_value_t = 8765)]
    port: u16,

    /// JSON config file with proxy_target and tools
    #[arg(short, long, env = "TOOLBELT_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream MCP endpoint; overrides proxy_target from the config file
    #[arg(long, env = "TOOLBELT_PROXY")]
    proxy: Option<String>,

    /// Storage backend for logs and mock tools
    #[arg(long, env = "TOOLBELT_STORE", value_enum, default_value_t = StoreKind::Json)]
    store: StoreKind,

    /// Store file (defaults to mcp_toolbelt_data.json or mcp_toolbelt.db)
    #[arg(long, env = "TOOLBELT_DATA_PATH")]
    data_path: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "TOOLBELT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match serve(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "mcp-toolbelt failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "mcp_toolbelt=debug,toolbelt_mcp_runtime=debug,tower_http=info".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(cli: Cli) -> Result<(), ServeError> {
    let mut config = ToolbeltConfig::load(cli.config.as_deref()).await?;
    if let Some(proxy) = cli.proxy {
        config.proxy_target = Some(proxy);
    }
    let store = store::open_store(cli.store, cli.data_path).await?;

    let dispatcher = Dispatcher::new(
        DispatcherConfig {
            config_tools: config.tools.clone(),
            proxy_target: config.proxy_target.clone(),
            proxy_timeout: config.proxy_timeout(),
        },
        store.clone(),
    );
    tracing::info!(
        tools = config.tools.len(),
        proxy_target = config.proxy_target.as_deref().unwrap_or(""),
        config_path = ?cli.config,
        "configuration loaded"
    );

    let app_state = state::AppState {
        dispatcher: Arc::new(dispatcher),
        store,
        config: Arc::new(ConfigFile::new(cli.config, config)),
    };
    let app = routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("MCP Toolbelt listening on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
