use anyhow::Result;
use clap::Parser;
use tracing::info;

use kubequery_k8s::KubeClient;
use kubequery_mcp::McpServer;

/// Kubequery - read-only Kubernetes query and diagnostic tools over MCP stdio
#[derive(Parser, Debug)]
#[command(name = "kubequery")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Default log level when RUST_LOG is not set (logs go to stderr)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the JSON-RPC stream, so all logging goes to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let kube = KubeClient::connect().await?;
    info!("serving tools on stdio");

    McpServer::new(kube).serve_stdio().await?;
    Ok(())
}
