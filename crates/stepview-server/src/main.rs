//! Stepview Server - Main entry point
//!
//! Serves scene snapshots and the built web viewer, and accepts scene pushes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use stepview_server::{config, demo, server, state};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stepview")]
#[command(about = "Step-indexed 3D scene server and viewer host")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "stepview.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Open the viewer in the default browser
    #[arg(long)]
    open: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push an orbiting demo scene to a running server
    Demo {
        /// Server address (host:port or URL)
        #[arg(long, default_value = "127.0.0.1:5006")]
        host: String,

        /// Number of orbit steps
        #[arg(long, default_value_t = 10)]
        iterations: u32,

        /// Delay between steps in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(parse_level(&args.log_level))
            .with_target(true)
            .finish(),
    )?;

    info!("Stepview v{}", env!("CARGO_PKG_VERSION"));

    if let Some(Command::Demo {
        host,
        iterations,
        interval_ms,
    }) = args.command
    {
        return demo::run(demo::DemoOptions {
            host,
            iterations,
            interval: Duration::from_millis(interval_ms),
        })
        .await;
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    info!(
        bind = %config.server.bind,
        web_dir = %config.server.web_dir,
        max_steps = config.scene.max_steps,
        "Configuration loaded"
    );

    if args.open {
        let url = viewer_url(&config);
        info!(url = %url, "Opening viewer");
        if let Err(e) = open::that(&url) {
            warn!(error = %e, "Failed to open browser");
        }
    }

    let state = state::AppState::new(config);
    server::run(state).await
}

/// Log level from the CLI flag; unknown names mean INFO
fn parse_level(name: &str) -> Level {
    name.parse().unwrap_or(Level::INFO)
}

/// Browser URL for the configured bind address
fn viewer_url(config: &config::Config) -> String {
    let scheme = if config.server.tls.is_some() {
        "https"
    } else {
        "http"
    };
    let bind = &config.server.bind;
    let host = match bind.rsplit_once(':') {
        Some(("0.0.0.0", port)) | Some(("[::]", port)) => format!("127.0.0.1:{}", port),
        _ => bind.clone(),
    };
    format!("{}://{}/", scheme, host)
}
