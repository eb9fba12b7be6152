use std::net::SocketAddr;
use std::path::PathBuf;

use agentmd_core::{AgentMdConfig, AgentMdConfigBuilder};
use agentmd_server::{AppState, router};
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve a static site with Markdown for AI agents in front of it
#[derive(Parser, Debug)]
#[command(name = "agentmd-server", version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "AGENTMD_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Directory holding the HTML site
    #[arg(long, env = "AGENTMD_SITE_DIR", default_value = "public")]
    site_dir: PathBuf,

    /// Directory holding curated Markdown artifacts
    #[arg(long, env = "AGENTMD_CONTENT_ROOT")]
    content_root: Option<PathBuf>,

    /// Origin used for live fetches (default: the listen address)
    #[arg(long, env = "AGENTMD_ORIGIN")]
    origin: Option<String>,

    /// TOML configuration file
    #[arg(long, env = "AGENTMD_CONFIG")]
    config: Option<PathBuf>,

    /// Serve curated artifacts only
    #[arg(long)]
    no_live_fetch: bool,
}

fn load_config(args: &Args) -> anyhow::Result<AgentMdConfig> {
    let base = match &args.config {
        Some(path) => AgentMdConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => AgentMdConfig::load_or_default().context("Failed to load default configuration")?,
    };

    let mut builder = AgentMdConfigBuilder::from_config(base);
    if let Some(root) = &args.content_root {
        builder = builder.content_root(root);
    }
    let mut config = builder.build();

    if args.no_live_fetch {
        config.origin = None;
    } else if let Some(origin) = &args.origin {
        config.origin = Some(origin.clone());
    } else if config.origin.is_none() {
        config.origin = Some(format!("http://{}", args.listen));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentmd=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let state = AppState::from_config(&config).context("Invalid configuration")?;
    let app = router(state, &args.site_dir);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(
        listen = %args.listen,
        site_dir = %args.site_dir.display(),
        content_root = %config.content_root.display(),
        live_fetch = config.origin.is_some(),
        "agentmd server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
