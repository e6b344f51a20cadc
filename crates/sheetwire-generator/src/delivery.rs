//! Transfer strategies for handing encoded workbooks to HTTP callers.
//!
//! All strategies serve the same bytes; they differ in how much the producer
//! buffers and which response headers callers can rely on.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::Stream;
use sheetwire_core::encode::{encode_workbook, encode_workbook_into};
use sheetwire_core::{Result, SheetError, Workbook};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Content type all download responses carry.
pub const SPREADSHEET_CONTENT_TYPE: &str = "application/octet-stream";

/// Filename advertised by strategies that set a download disposition.
pub const DOWNLOAD_FILENAME: &str = "report.xlsx";

/// Filename advertised when streaming back a filled upload.
pub const FILLED_FILENAME: &str = "filled_data.xlsx";

/// Chunk size for streamed response bodies.
pub const STREAM_CHUNK_SIZE: usize = 8 * 1024;

/// Resourced deliveries above this size log a warning. The strategy still
/// buffers the whole document; the limit is advisory only.
pub const RESOURCED_ADVISORY_LIMIT: usize = 50 * 1024 * 1024;

/// A way of shipping one workbook to an HTTP caller.
#[async_trait]
pub trait DocumentDelivery: Send + Sync {
    /// Label readers echo in their transfer reports.
    fn strategy(&self) -> &'static str;

    /// Encode `workbook` and build the response that carries it.
    async fn deliver(&self, workbook: Workbook, filename: &str) -> Result<Response>;
}

/// Encodes in memory and replies with the complete buffer.
///
/// The response carries only a content type; callers that need a length or a
/// filename use one of the other strategies.
pub struct BufferedDelivery;

#[async_trait]
impl DocumentDelivery for BufferedDelivery {
    fn strategy(&self) -> &'static str {
        "buffered"
    }

    async fn deliver(&self, workbook: Workbook, _filename: &str) -> Result<Response> {
        let bytes = encode_on_worker(workbook).await?;
        Ok(([(header::CONTENT_TYPE, SPREADSHEET_CONTENT_TYPE)], bytes).into_response())
    }
}

/// Buffers like [`BufferedDelivery`] and decorates the response with the
/// exact byte length and a download disposition.
pub struct ResourcedDelivery;

#[async_trait]
impl DocumentDelivery for ResourcedDelivery {
    fn strategy(&self) -> &'static str {
        "resourced"
    }

    async fn deliver(&self, workbook: Workbook, filename: &str) -> Result<Response> {
        let bytes = encode_on_worker(workbook).await?;
        if bytes.len() > RESOURCED_ADVISORY_LIMIT {
            warn!(
                "resourced delivery is {} bytes, above the {} byte advisory limit; the document was still fully buffered",
                bytes.len(),
                RESOURCED_ADVISORY_LIMIT
            );
        }
        let headers = [
            (header::CONTENT_TYPE, SPREADSHEET_CONTENT_TYPE.to_string()),
            (header::CONTENT_LENGTH, bytes.len().to_string()),
            (header::CONTENT_DISPOSITION, attachment(filename)),
        ];
        Ok((headers, bytes).into_response())
    }
}

/// Encodes to a temp-file spool and streams it back in fixed chunks.
///
/// The zip container needs a seekable sink, so the encoder writes a spool
/// file instead of the socket; the response body then drains the spool
/// without ever materializing the document in memory. No content length is
/// set, the body goes out chunked.
pub struct StreamingDelivery;

#[async_trait]
impl DocumentDelivery for StreamingDelivery {
    fn strategy(&self) -> &'static str {
        "streaming"
    }

    async fn deliver(&self, workbook: Workbook, filename: &str) -> Result<Response> {
        let spool = spool_on_worker(workbook).await?;
        let file = tokio::fs::File::from_std(spool.reopen()?);
        let headers = [
            (header::CONTENT_TYPE, SPREADSHEET_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, attachment(filename)),
        ];
        Ok((headers, Body::from_stream(spool_stream(file, spool))).into_response())
    }
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

/// Run the in-memory encoder on a blocking worker.
async fn encode_on_worker(workbook: Workbook) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode_workbook(&workbook))
        .await
        .map_err(|e| SheetError::Io(std::io::Error::other(e)))?
}

/// Encode into a fresh temp file on a blocking worker and hand the file back.
async fn spool_on_worker(workbook: Workbook) -> Result<NamedTempFile> {
    tokio::task::spawn_blocking(move || {
        let mut spool = NamedTempFile::new()?;
        encode_workbook_into(&workbook, spool.as_file_mut())?;
        Ok(spool)
    })
    .await
    .map_err(|e| SheetError::Io(std::io::Error::other(e)))?
}

/// Drain the spool in fixed chunks. The temp file stays alive inside the
/// stream state and is removed when the stream is dropped.
fn spool_stream(
    file: tokio::fs::File,
    guard: NamedTempFile,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
    futures::stream::unfold(Some((file, guard)), |state| async move {
        let (mut file, guard) = state?;
        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
        match file.read(&mut chunk).await {
            Ok(0) => None,
            Ok(read) => {
                chunk.truncate(read);
                Some((Ok(chunk), Some((file, guard))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}
