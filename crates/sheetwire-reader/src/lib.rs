//! Spreadsheet reader service.
//!
//! Fetches generated documents from the generator through each transfer
//! strategy, decodes them, and reports summaries; also drives the template
//! fill round trip and validates the returned headers.

mod fetch;
mod handlers;
mod types;
mod validate;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sheetwire_core::dataset::SampleDataset;
use tower_http::trace::TraceLayer;

pub use fetch::*;
pub use handlers::*;
pub use types::*;
pub use validate::*;

/// Reader state shared across handlers.
#[derive(Clone)]
pub struct ReaderState {
    /// Client bound to the upstream generator.
    pub client: TransferClient,
    /// Expected headers for the round-trip validation.
    pub dataset: Arc<SampleDataset>,
}

impl ReaderState {
    /// Build state for the configured generator.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: TransferClient::new(config)?,
            dataset: Arc::new(SampleDataset::employees()),
        })
    }
}

/// Build the reader router with all endpoints.
pub fn build_router(state: ReaderState) -> Router {
    Router::new()
        // Service info
        .route("/", get(service_info))
        // Fetch-and-read endpoints, one per transfer strategy
        .route("/request-and-read", get(request_and_read))
        .route("/request-resource-and-read", get(request_resource_and_read))
        .route("/request-stream-and-read", get(request_stream_and_read))
        // Template fill round trip
        .route("/generate-and-read-sample", get(generate_and_read_sample))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the reader server.
pub async fn start_server(addr: &str, state: ReaderState) -> Result<(), std::io::Error> {
    tracing::info!("Starting reader server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
