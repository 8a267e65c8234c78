//! Model Executor - consumes rendezvous requests, calls the model backend and
//! publishes the responses.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use model_executor::{Config, Executor, HttpModelBackend};
use rendezvous_common::messaging::PulsarClient;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("model-executor {}", VERSION);
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
             Make sure config.toml exists or set EXECUTOR__EXECUTOR__MODEL_VERSION and \
             EXECUTOR__EXECUTOR__MODEL_ENDPOINT environment variables.",
            e
        )
    })?;
    tracing::info!(
        "Starting model-executor: model version {} at {}",
        config.executor.model_version,
        config.executor.model_endpoint
    );

    let backend = HttpModelBackend::new(
        &config.executor.model_endpoint,
        Duration::from_secs(config.executor.request_timeout_secs),
    )?;

    // Transport bindings; failing here is fatal
    let client = PulsarClient::new(config.messaging.clone());
    let consumer = client
        .create_consumer(&config.request_topic(), &config.subscription())
        .await?;
    let producer = client.create_producer(&config.response_topic()).await?;

    let mut executor = Executor::new(
        Box::new(consumer),
        Box::new(producer),
        Arc::new(backend),
        config.executor.clone(),
    )?;

    tokio::select! {
        result = executor.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping model-executor");
        }
    }

    Ok(())
}
