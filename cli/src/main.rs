use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::call::CallArgs;
use commands::proxy::ProxyCommands;
use commands::tool::ToolCommands;

#[derive(Parser)]
#[command(
    name = "toolbelt",
    version,
    about = "Client for a running mcp-toolbelt server: traffic log, proxy target, mock tools"
)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "TOOLBELT_URL", default_value = "http://127.0.0.1:8765")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,
    /// Show recorded MCP traffic, newest first
    Logs {
        /// Maximum number of entries (server default 100)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete every recorded log entry
    LogsClear,
    /// Inspect or change the upstream proxy target
    Proxy {
        #[command(subcommand)]
        command: ProxyCommands,
    },
    /// Manage dynamically registered mock tools
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },
    /// Send a JSON-RPC message to the MCP endpoint
    Call {
        /// JSON-RPC method, e.g. "tools/list"
        method: String,
        /// Params as JSON string
        #[arg(long)]
        params: Option<String>,
        /// Value for the mcp-session-id header
        #[arg(long)]
        session: Option<String>,
        /// Request id (auto-generated if omitted)
        #[arg(long, conflicts_with = "notify")]
        id: Option<String>,
        /// Send as a notification (no id, no reply body)
        #[arg(long)]
        notify: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let api_url = cli.url.trim_end_matches('/').to_string();

    let code = match cli.command {
        Commands::Health => commands::health::run(&api_url).await,
        Commands::Logs { limit } => commands::logs::list(&api_url, limit).await,
        Commands::LogsClear => commands::logs::clear(&api_url).await,
        Commands::Proxy { command } => commands::proxy::run(&api_url, command).await,
        Commands::Tool { command } => commands::tool::run(&api_url, command).await,
        Commands::Call {
            method,
            params,
            session,
            id,
            notify,
        } => {
            commands::call::run(
                &api_url,
                CallArgs {
                    method,
                    params,
                    session,
                    id,
                    notify,
                },
            )
            .await
        }
    };

    std::process::exit(code);
}
