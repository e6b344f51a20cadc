//! Generator service binary entry point.

use sheetwire_generator::{start_server, GeneratorState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetwire_generator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get bind address from environment or use default
    let addr = std::env::var("GENERATOR_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let state = GeneratorState::new();

    tracing::info!("Starting Sheetwire generator service");
    start_server(&addr, state).await?;

    Ok(())
}
