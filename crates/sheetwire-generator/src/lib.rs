//! Spreadsheet generator service.
//!
//! Serves built-in datasets as xlsx downloads through three transfer
//! strategies (buffered, resourced, streaming) and fills uploaded templates
//! with the sample rows.

mod delivery;
mod handlers;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sheetwire_core::dataset::{ReportTemplate, SampleDataset};
use tower_http::trace::TraceLayer;

pub use delivery::*;
pub use handlers::*;
pub use types::*;

/// Generator state shared across handlers.
#[derive(Clone)]
pub struct GeneratorState {
    /// Rows rendered into sample documents and template fills.
    pub sample: Arc<SampleDataset>,
    /// Layout for report documents.
    pub report: Arc<ReportTemplate>,
}

impl GeneratorState {
    /// Create state with the built-in datasets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sample: Arc::new(SampleDataset::employees()),
            report: Arc::new(ReportTemplate::monthly()),
        }
    }
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the generator router with all endpoints.
pub fn build_router(state: GeneratorState) -> Router {
    Router::new()
        // Service info
        .route("/", get(service_info))
        // Download endpoints, one per transfer strategy
        .route("/excel/generate-bytes", get(generate_bytes))
        .route("/excel/generate-resource", get(generate_resource))
        .route("/excel/generate-stream", get(generate_stream))
        // Template fill
        .route("/excel/fill-data", post(fill_data))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the generator server.
pub async fn start_server(addr: &str, state: GeneratorState) -> Result<(), std::io::Error> {
    tracing::info!("Starting generator server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
