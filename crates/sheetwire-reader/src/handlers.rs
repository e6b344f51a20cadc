//! HTTP request handlers for the reader endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sheetwire_core::dataset::header_template;
use sheetwire_core::decode::{decode_workbook, summarize, WorkbookSummary};
use sheetwire_core::encode::encode_workbook;
use sheetwire_core::SheetError;
use tracing::{error, info};

use crate::fetch::FetchError;
use crate::types::{
    ErrorReport, ReadParams, ReadReport, RoundTripReport, ServiceInfo, TransferEcho,
};
use crate::validate::validate_headers;
use crate::ReaderState;

/// How a fetch-and-read endpoint pulls the document upstream.
#[derive(Clone, Copy)]
enum FetchMode {
    Buffered,
    Resourced,
    Streamed,
}

impl FetchMode {
    fn strategy(self) -> &'static str {
        match self {
            Self::Buffered => "buffered",
            Self::Resourced => "resourced",
            Self::Streamed => "streaming",
        }
    }
}

/// Service info endpoint.
pub async fn service_info() -> impl IntoResponse {
    Json(ServiceInfo::current())
}

/// Fetch a buffered document and summarize it.
pub async fn request_and_read(
    State(state): State<ReaderState>,
    Query(params): Query<ReadParams>,
) -> Result<Json<ReadReport>, ReaderFailure> {
    fetch_and_read(&state, FetchMode::Buffered, "request-and-read", &params).await
}

/// Fetch a resourced document; the echo carries length and disposition.
pub async fn request_resource_and_read(
    State(state): State<ReaderState>,
    Query(params): Query<ReadParams>,
) -> Result<Json<ReadReport>, ReaderFailure> {
    fetch_and_read(
        &state,
        FetchMode::Resourced,
        "request-resource-and-read",
        &params,
    )
    .await
}

/// Fetch a streamed document, accumulating the chunked body before decoding.
pub async fn request_stream_and_read(
    State(state): State<ReaderState>,
    Query(params): Query<ReadParams>,
) -> Result<Json<ReadReport>, ReaderFailure> {
    fetch_and_read(
        &state,
        FetchMode::Streamed,
        "request-stream-and-read",
        &params,
    )
    .await
}

/// Upload a header-only template, have it filled, and verify the headers
/// came back unchanged.
pub async fn generate_and_read_sample(
    State(state): State<ReaderState>,
) -> Result<Json<RoundTripReport>, ReaderFailure> {
    const OPERATION: &str = "generate-and-read-sample";
    info!("Running the template fill round trip");

    let template = template_on_worker(&state).await.map_err(fail(OPERATION))?;
    let payload = state
        .client
        .upload_for_fill(template)
        .await
        .map_err(fail(OPERATION))?;

    let transfer = TransferEcho::new("streaming", &payload);
    let summary = summarize_on_worker(payload.bytes)
        .await
        .map_err(fail(OPERATION))?;

    let actual = summary
        .sheets
        .first()
        .map(|sheet| sheet.headers.clone())
        .unwrap_or_default();
    let validation = validate_headers(state.dataset.headers, &actual);

    Ok(Json(RoundTripReport::completed(
        OPERATION, transfer, summary, validation,
    )))
}

async fn fetch_and_read(
    state: &ReaderState,
    mode: FetchMode,
    operation: &'static str,
    params: &ReadParams,
) -> Result<Json<ReadReport>, ReaderFailure> {
    let kind = params.kind();
    info!("Reading {} document via {} fetch", kind, mode.strategy());

    let payload = match mode {
        FetchMode::Buffered => state.client.fetch_buffered(kind).await,
        FetchMode::Resourced => state.client.fetch_resource(kind).await,
        FetchMode::Streamed => state.client.fetch_streamed(kind).await,
    }
    .map_err(fail(operation))?;

    let transfer = TransferEcho::new(mode.strategy(), &payload);
    let summary = summarize_on_worker(payload.bytes)
        .await
        .map_err(fail(operation))?;

    Ok(Json(ReadReport::completed(operation, transfer, summary)))
}

/// Decode and summarize on a blocking worker.
async fn summarize_on_worker(bytes: Vec<u8>) -> Result<WorkbookSummary, FetchError> {
    let summary = tokio::task::spawn_blocking(move || {
        decode_workbook(&bytes).map(|workbook| summarize(&workbook))
    })
    .await
    .map_err(|e| SheetError::Io(std::io::Error::other(e)))??;
    Ok(summary)
}

/// Build and encode the header-only template on a blocking worker.
async fn template_on_worker(state: &ReaderState) -> Result<Vec<u8>, FetchError> {
    let dataset = state.dataset.clone();
    let bytes = tokio::task::spawn_blocking(move || encode_workbook(&header_template(&dataset)))
        .await
        .map_err(|e| SheetError::Io(std::io::Error::other(e)))??;
    Ok(bytes)
}

fn fail(operation: &'static str) -> impl FnOnce(FetchError) -> ReaderFailure {
    move |error| ReaderFailure { operation, error }
}

/// A failed endpoint call, rendered as an error envelope.
pub struct ReaderFailure {
    operation: &'static str,
    error: FetchError,
}

impl ReaderFailure {
    /// Upstream refusals map to 502, deadlines to 504, decode failures
    /// after a successful transfer to 500.
    fn status(&self) -> StatusCode {
        match self.error {
            FetchError::Upstream { .. } | FetchError::Request(_) => StatusCode::BAD_GATEWAY,
            FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FetchError::Sheet(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReaderFailure {
    fn into_response(self) -> Response {
        error!("{} failed: {}", self.operation, self.error);
        let report = ErrorReport::new(self.operation, self.error.to_string());
        (self.status(), Json(report)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(error: FetchError) -> ReaderFailure {
        ReaderFailure {
            operation: "request-and-read",
            error,
        }
    }

    #[test]
    fn test_failure_status_mapping() {
        let upstream = failure(FetchError::Upstream {
            status: StatusCode::NOT_FOUND,
            body: "no such template".to_string(),
        });
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let timeout = failure(FetchError::Timeout("read deadline".to_string()));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let transport = failure(FetchError::Request("connection reset".to_string()));
        assert_eq!(transport.status(), StatusCode::BAD_GATEWAY);

        let decode = failure(FetchError::Sheet(SheetError::Malformed("bad".to_string())));
        assert_eq!(decode.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_fetch_mode_labels() {
        assert_eq!(FetchMode::Buffered.strategy(), "buffered");
        assert_eq!(FetchMode::Resourced.strategy(), "resourced");
        assert_eq!(FetchMode::Streamed.strategy(), "streaming");
    }
}
