//! Triple-Lock API server
//!
//! ## Usage
//!
//! ```bash
//! triplelock-web                      # 127.0.0.1:5000, or whatever the config says
//! triplelock-web --port 8080          # Custom port
//! triplelock-web --config lab.yaml    # Explicit config file
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triplelock_config::Config;
use triplelock_web::{serve, AppState};

#[derive(Parser)]
#[command(name = "triplelock-web")]
#[command(about = "JSON API for the triple-lock cipher demonstrator")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (defaults to $TRIPLELOCK_CONFIG or the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the route table and exit
    #[arg(long)]
    routes: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "triplelock_web=info,triplelock_breaker=info,tower_http=info".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if args.routes {
        triplelock_web::routes::print_routes();
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            let config = Config::from_path(path)?;
            config.validate()?;
            config
        }
        None => Config::load()?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let addr = config.bind_addr();
    let state = Arc::new(AppState::from_config(config)?);
    tracing::info!(
        "Language model ready: {} words, vocabulary {}",
        state.model.total_words(),
        state.model.vocabulary_size()
    );

    triplelock_web::routes::print_routes();
    serve(state, &addr).await?;

    Ok(())
}
