//! HTTP request handlers for the generator endpoints.

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use sheetwire_core::dataset::{fill_sample_rows, report_workbook, sample_workbook};
use sheetwire_core::decode::decode_workbook;
use sheetwire_core::{SheetError, Workbook};
use tracing::{error, info};

use crate::delivery::{
    BufferedDelivery, DocumentDelivery, ResourcedDelivery, StreamingDelivery, DOWNLOAD_FILENAME,
    FILLED_FILENAME,
};
use crate::types::{GenerateParams, ServiceInfo, TemplateKind};
use crate::GeneratorState;

/// Service info endpoint.
pub async fn service_info() -> impl IntoResponse {
    Json(ServiceInfo::current("sheetwire-generator"))
}

/// Generate a document and return it as one fully buffered body.
pub async fn generate_bytes(
    State(state): State<GeneratorState>,
    Query(params): Query<GenerateParams>,
) -> Result<Response, (StatusCode, String)> {
    deliver_template(&BufferedDelivery, &state, params.kind()).await
}

/// Generate a document with a declared length and download disposition.
pub async fn generate_resource(
    State(state): State<GeneratorState>,
    Query(params): Query<GenerateParams>,
) -> Result<Response, (StatusCode, String)> {
    deliver_template(&ResourcedDelivery, &state, params.kind()).await
}

/// Generate a document and stream it back in chunks.
pub async fn generate_stream(
    State(state): State<GeneratorState>,
    Query(params): Query<GenerateParams>,
) -> Result<Response, (StatusCode, String)> {
    deliver_template(&StreamingDelivery, &state, params.kind()).await
}

/// Fill an uploaded template with the sample rows and stream it back.
///
/// The upload arrives as multipart field `file`. Decode and fill run on a
/// blocking worker; caller mistakes (no usable workbook, a sheet with no
/// rows) come back as 400s.
pub async fn fill_data(
    State(state): State<GeneratorState>,
    multipart: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let bytes = read_upload(multipart).await?;
    info!("Filling uploaded template of {} bytes", bytes.len());

    let dataset = state.sample.clone();
    let filled = tokio::task::spawn_blocking(move || {
        let mut workbook = decode_workbook(&bytes)?;
        fill_sample_rows(&mut workbook, &dataset)?;
        Ok::<_, SheetError>(workbook)
    })
    .await
    .map_err(|e| internal_error(SheetError::Io(std::io::Error::other(e))))?
    .map_err(fill_error)?;

    StreamingDelivery
        .deliver(filled, FILLED_FILENAME)
        .await
        .map_err(internal_error)
}

async fn deliver_template(
    delivery: &dyn DocumentDelivery,
    state: &GeneratorState,
    kind: TemplateKind,
) -> Result<Response, (StatusCode, String)> {
    info!(
        "Generating {} document via {} delivery",
        kind.as_str(),
        delivery.strategy()
    );
    let workbook = build_template(state, kind);
    delivery
        .deliver(workbook, DOWNLOAD_FILENAME)
        .await
        .map_err(internal_error)
}

fn build_template(state: &GeneratorState, kind: TemplateKind) -> Workbook {
    match kind {
        TemplateKind::Sample => sample_workbook(&state.sample),
        TemplateKind::Report => report_workbook(&state.report, Utc::now().naive_utc()),
    }
}

/// Pull the bytes of the `file` part out of the upload.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err((StatusCode::BAD_REQUEST, "uploaded file is empty".to_string()));
        }
        return Ok(bytes.to_vec());
    }
    Err((
        StatusCode::BAD_REQUEST,
        "multipart field 'file' is required".to_string(),
    ))
}

/// Fill failures caused by the upload get a 400, everything else a 500.
fn fill_error(err: SheetError) -> (StatusCode, String) {
    match err {
        SheetError::Malformed(_) | SheetError::EmptySheet(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        other => internal_error(other),
    }
}

fn internal_error(err: SheetError) -> (StatusCode, String) {
    error!("Document generation failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("document generation failed: {err}"),
    )
}
