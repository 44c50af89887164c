use std::sync::Arc;

use clap::{Parser, ValueEnum};
use mcp_dispatch_server::{
    build_app, config::Config, context::ServerContext, logging, toolsets, transport, AppState,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Parser)]
#[command(name = "mcp-dispatch-server", version, about = "MCP JSON-RPC server")]
struct Cli {
    /// Transport to serve requests on
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging();

    let config = Config::from_env()?;
    let sources = toolsets::select_sources(config.tool_sources.as_deref());
    let context = Arc::new(ServerContext::new(config.clone(), sources));

    match cli.transport {
        Transport::Stdio => transport::stdio::run_stdio(context).await?,
        Transport::Http => {
            let bind_socket = config.bind_socket()?;
            let app = build_app(AppState::new(context));
            let listener = tokio::net::TcpListener::bind(bind_socket).await?;

            info!(
                bind_addr = %config.bind_addr,
                bind_port = config.bind_port,
                "server starting"
            );

            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}
