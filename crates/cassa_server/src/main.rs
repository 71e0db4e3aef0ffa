//! Cassa Graph Store Server
//!
//! Graph store protocol and SDShare feeds over an in-memory store.

use cassa_server::{CassaConfig, CassaServer};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cassa graph store server
#[derive(Parser, Debug)]
#[command(name = "cassa-server")]
#[command(version)]
#[command(about = "Graph store protocol server with SDShare feeds", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Public base URI of the server (default: http://{host}:{port}/)
    #[arg(long)]
    base_uri: Option<String>,

    /// Domain used in feed tag URIs
    #[arg(long, default_value = "localhost.localdomain")]
    tag_domain: String,

    /// Title of the collection feed
    #[arg(long, default_value = "Cassa Graph Store")]
    title: String,

    /// Bind to all interfaces (0.0.0.0)
    #[arg(long)]
    public: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "cassa_server=info,cassa_core=info,tower_http=debug",
        1 => "cassa_server=debug,cassa_core=debug,tower_http=debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(args.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = if args.public {
        CassaConfig::public()
    } else {
        CassaConfig::default().with_host(args.host)
    }
    .with_port(args.port)
    .with_tag_domain(args.tag_domain)
    .with_title(args.title);
    if let Some(base_uri) = args.base_uri {
        config = config.with_base_uri(base_uri);
    }

    let server = CassaServer::new(config)?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    server.run_with_shutdown(shutdown_signal).await?;
    Ok(())
}
