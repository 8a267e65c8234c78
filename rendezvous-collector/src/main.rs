//! Rendezvous Collector - consumes model responses and delivers those from the
//! active model version to the callers' sockets.

use std::env;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rendezvous_collector::{Collector, Config};
use rendezvous_common::messaging::PulsarClient;
use rendezvous_common::sockets::UnixSocketWriter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("rendezvous-collector {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set the \
             COLLECTOR__COLLECTOR__ACTIVE_MODEL_VERSION environment variable.",
            e
        )
    })?;
    tracing::info!(
        "Starting rendezvous-collector: active model version {}, sockets in {}",
        config.collector.active_model_version,
        config.collector.socket_dir
    );

    // Transport binding; failing here is fatal
    let client = PulsarClient::new(config.messaging.clone());
    let consumer = client
        .create_consumer(&config.response_topic(), &config.subscription())
        .await?;

    let mut collector = Collector::new(
        Box::new(consumer),
        Arc::new(UnixSocketWriter::new()),
        config.collector.clone(),
    );

    tokio::select! {
        result = collector.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping rendezvous-collector");
        }
    }

    Ok(())
}
