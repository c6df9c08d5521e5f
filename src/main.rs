//! Webview Bridge - snapshot replay harness
//!
//! Runs the bridge against a static page snapshot with an in-process host
//! that logs every command it receives and answers clipboard reads.
//!
//! # Usage
//!
//! ```bash
//! webview-bridge --snapshot page.json
//! webview-bridge --snapshot page.json --config /path/to/config.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webview_bridge::{
    native_channel, Bridge, Config, HostEndpoint, NativeCommand, PageSnapshot, SnapshotPage,
};

/// Command line options
#[derive(Debug, Default)]
struct Args {
    snapshot: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("webview-bridge v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--snapshot" | "-s" => {
                i += 1;
                if i < args.len() {
                    parsed.snapshot = Some(PathBuf::from(&args[i]));
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i]));
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Use --help for usage information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"Webview Bridge - snapshot replay harness

USAGE:
    webview-bridge --snapshot <PATH> [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version
    -s, --snapshot <PATH>   Page snapshot (JSON) to replay
    -c, --config <PATH>     Path to configuration file

The bridge polls the snapshot on the configured intervals. Every command it
sends is decoded and logged; read-clipboard is answered with the snapshot's
"clipboard" text. Press Ctrl-C to stop.
"#
    );
}

/// In-process host: log decoded commands and answer clipboard reads
async fn serve_host(mut endpoint: HostEndpoint, page: SnapshotPage, bridge: Arc<Bridge>) {
    let token = bridge.cancellation_token();

    loop {
        let raw = tokio::select! {
            _ = token.cancelled() => break,
            raw = endpoint.outbound.recv() => match raw {
                Some(raw) => raw,
                None => break,
            },
        };

        match NativeCommand::try_from(raw.as_str()) {
            Ok(NativeCommand::ReadClipboard) => {
                let text = page.clipboard_text().unwrap_or_default();
                info!(chars = text.len(), "Host: read-clipboard");
                if let Err(e) = endpoint.send_clipboard(text) {
                    warn!("Host: failed to answer clipboard read: {}", e);
                }
            }
            Ok(NativeCommand::MetadataUpdate(metadata)) => {
                info!(
                    title = %metadata.title,
                    artist = %metadata.artist,
                    art_url = %metadata.art_url,
                    logo = %metadata.logo,
                    "Host: metadata-update"
                );
            }
            Err(e) => warn!("Host: undecodable message: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load_from_path(config_path.clone());

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting Webview Bridge");
    info!("Configuration loaded from {:?}", config_path);

    if !config.general.enabled {
        info!("Bridge is disabled in configuration, exiting");
        return Ok(());
    }

    let Some(snapshot_path) = args.snapshot else {
        error!("No page snapshot given");
        eprintln!("Use --help for usage information.");
        std::process::exit(1);
    };

    let page = SnapshotPage::new(PageSnapshot::load(&snapshot_path)?);
    let (link, inbound, endpoint) = native_channel();
    let bridge = Arc::new(Bridge::new(config, Arc::new(link), page.surfaces())?);

    // Setup shutdown signal
    let token = bridge.cancellation_token();
    ctrlc::set_handler(move || {
        println!("\nShutting down...");
        token.cancel();
    })?;

    let host = tokio::spawn(serve_host(endpoint, page, bridge.clone()));

    info!(
        "Replaying {:?} ({}ms extraction interval)",
        snapshot_path, bridge.config().timing.extraction_interval_ms
    );
    bridge.run(inbound).await?;

    if let Err(e) = host.await {
        warn!("Host task ended abnormally: {}", e);
    }

    let status = bridge.status();
    info!(
        "Final status:\n{}",
        serde_json::to_string_pretty(&status)?
    );

    Ok(())
}
