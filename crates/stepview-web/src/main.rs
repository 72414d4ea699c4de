//! Stepview desktop viewer
//!
//! Runs the same Bevy viewer as the browser build in a native window.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::time::Duration;

    use clap::Parser;
    use stepview_web::network::{NativeFetcher, ViewerConfig};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[derive(Parser, Debug)]
    #[command(name = "stepview-viewer")]
    #[command(about = "Native 3D viewer for a Stepview scene server")]
    struct Args {
        /// Scene server address (host:port or URL)
        #[arg(short, long, default_value = "127.0.0.1:5006")]
        server: String,

        /// Delay between polls in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    }

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ViewerConfig {
        server_url: ViewerConfig::server_url_from_address(&args.server),
        interval: Duration::from_millis(args.interval_ms.max(1)),
    };
    tracing::info!("Polling {} every {:?}", config.server_url, config.interval);

    let mut app = stepview_web::app::build(config);
    app.insert_resource(NativeFetcher::new()?);
    app.run();
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
