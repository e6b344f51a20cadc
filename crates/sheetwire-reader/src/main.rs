//! Reader service binary entry point.

use sheetwire_reader::{start_server, FetchConfig, ReaderState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetwire_reader=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get bind address and upstream location from environment or use defaults
    let addr = std::env::var("READER_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
    let config = FetchConfig::from_env();

    tracing::info!(
        "Starting Sheetwire reader service, generator at {}",
        config.base_url
    );
    let state = ReaderState::new(&config)?;
    start_server(&addr, state).await?;

    Ok(())
}
