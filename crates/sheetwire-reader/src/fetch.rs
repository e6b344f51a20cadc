//! Upstream transfer client: fetches generated documents and uploads
//! templates for filling.

use std::time::Duration;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use sheetwire_core::encode::XLSX_CONTENT_TYPE;
use sheetwire_core::SheetError;
use thiserror::Error;
use tracing::debug;

/// Seed capacity for the buffer that accumulates streamed bodies.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default read timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Filename declared when uploading a template for filling.
pub const TEMPLATE_FILENAME: &str = "template.xlsx";

/// Failures of one upstream exchange.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The generator answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// Connect or read deadline exceeded.
    #[error("upstream timed out: {0}")]
    Timeout(String),

    /// Any other transport failure.
    #[error("transfer failed: {0}")]
    Request(String),

    /// The fetched payload could not be decoded.
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Client configuration, sourced from the environment at startup.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Generator base URL.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl FetchConfig {
    /// Read `GENERATOR_URL` and the timeout variables, with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GENERATOR_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        Self {
            connect_timeout: Duration::from_secs(env_secs(
                "FETCH_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            read_timeout: Duration::from_secs(env_secs(
                "FETCH_READ_TIMEOUT_SECS",
                DEFAULT_READ_TIMEOUT_SECS,
            )),
            base_url,
        }
    }

    /// Config for a fixed base URL with the default timeouts.
    #[must_use]
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// One fetched document plus the transfer headers callers echo.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
}

/// HTTP client bound to one generator instance.
///
/// Connections are pooled by the inner client; a response is always fully
/// drained or dropped on every exit path, so no handle outlives its exchange.
#[derive(Clone)]
pub struct TransferClient {
    http: Client,
    base_url: String,
}

impl TransferClient {
    /// Build a client with the configured timeouts.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch a buffered document in one read.
    pub async fn fetch_buffered(&self, kind: &str) -> Result<FetchedPayload, FetchError> {
        let response = self.get_template("generate-bytes", kind).await?;
        read_at_once(response).await
    }

    /// Fetch a resourced document; its headers carry length and disposition.
    pub async fn fetch_resource(&self, kind: &str) -> Result<FetchedPayload, FetchError> {
        let response = self.get_template("generate-resource", kind).await?;
        read_at_once(response).await
    }

    /// Fetch a streamed document, accumulating the chunked body.
    pub async fn fetch_streamed(&self, kind: &str) -> Result<FetchedPayload, FetchError> {
        let response = self.get_template("generate-stream", kind).await?;
        read_chunked(response).await
    }

    /// Upload a template and collect the filled document streamed back.
    pub async fn upload_for_fill(&self, template: Vec<u8>) -> Result<FetchedPayload, FetchError> {
        let part = Part::bytes(template)
            .file_name(TEMPLATE_FILENAME)
            .mime_str(XLSX_CONTENT_TYPE)?;
        let form = Form::new().part("file", part);

        let url = format!("{}/excel/fill-data", self.base_url);
        debug!("Uploading template to {}", url);
        let response = self.http.post(url).multipart(form).send().await?;
        read_chunked(require_success(response).await?).await
    }

    async fn get_template(&self, endpoint: &str, kind: &str) -> Result<Response, FetchError> {
        let url = format!("{}/excel/{}?type={}", self.base_url, endpoint, kind);
        debug!("Fetching {}", url);
        let response = self.http.get(url).send().await?;
        require_success(response).await
    }
}

/// Fail with the upstream status and error body on non-success responses.
async fn require_success(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Upstream { status, body })
}

async fn read_at_once(response: Response) -> Result<FetchedPayload, FetchError> {
    let meta = PayloadMeta::of(&response);
    let bytes = response.bytes().await?;
    Ok(meta.into_payload(bytes.to_vec()))
}

/// Drain the body incrementally into one growing buffer.
async fn read_chunked(response: Response) -> Result<FetchedPayload, FetchError> {
    let meta = PayloadMeta::of(&response);
    let mut bytes = Vec::with_capacity(READ_CHUNK_SIZE);
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(meta.into_payload(bytes))
}

/// Response headers captured before the body is consumed.
struct PayloadMeta {
    content_type: Option<String>,
    content_length: Option<u64>,
    content_disposition: Option<String>,
}

impl PayloadMeta {
    fn of(response: &Response) -> Self {
        Self {
            content_type: header_string(response, reqwest::header::CONTENT_TYPE),
            content_length: response.content_length(),
            content_disposition: header_string(response, reqwest::header::CONTENT_DISPOSITION),
        }
    }

    fn into_payload(self, bytes: Vec<u8>) -> FetchedPayload {
        FetchedPayload {
            bytes,
            content_type: self.content_type,
            content_length: self.content_length,
            content_disposition: self.content_disposition,
        }
    }
}

fn header_string(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_base_url_uses_default_timeouts() {
        let config = FetchConfig::for_base_url("http://localhost:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_secs_falls_back_to_default() {
        assert_eq!(env_secs("SHEETWIRE_TEST_UNSET_TIMEOUT", 42), 42);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = TransferClient::new(&FetchConfig::for_base_url("http://localhost:8080/"));
        assert_eq!(client.unwrap().base_url, "http://localhost:8080");
    }

    #[test]
    fn test_sheet_errors_pass_through() {
        let err = FetchError::from(SheetError::Malformed("bad header".to_string()));
        assert_eq!(err.to_string(), "Malformed workbook: bad header");
    }
}
