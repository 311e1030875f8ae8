use anyhow::Context;
use rankpilot_stream::{StreamServer, StreamerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"RankPilot Stream - tiered real-time dashboard streaming

USAGE:
    rankpilot-stream [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                Server host (default: 0.0.0.0)
    PORT                Server port (default: 8080)
    RUST_LOG            Log level filter

EXAMPLES:
    # Run with defaults
    rankpilot-stream

    # Run with config file
    rankpilot-stream --config config.json

    # Run with custom port
    PORT=9000 rankpilot-stream
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rankpilot_stream=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = if let Some(path) = config_path {
        tracing::info!("Loading configuration from: {}", path);
        StreamerConfig::from_file(&path).context("failed to load configuration")?
    } else {
        tracing::info!("Using default configuration");
        StreamerConfig::default()
    };

    // Environment overrides
    if let Ok(host) = std::env::var("HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port.parse().context("invalid PORT value")?;
    }

    tracing::info!("Starting {}", config.name);
    tracing::info!(
        "WebSocket: ws://{}:{}/ws?user_id=<id>&tier=<tier>",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        "SSE:       http://{}:{}/sse?user_id=<id>&tier=<tier>&topics=<a,b>",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        "Metrics:   http://{}:{}/metrics",
        config.server.host,
        config.server.port
    );

    let server = StreamServer::new(config);
    server.run().await.context("server failed")
}
