//! Response envelopes for the reader endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheetwire_core::decode::{format_size, WorkbookSummary};

use crate::fetch::FetchedPayload;
use crate::validate::HeaderValidation;

/// Service name reported in envelopes and the info endpoint.
pub const SERVICE_NAME: &str = "sheetwire-reader";

/// Query parameters accepted by the fetch-and-read endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ReadParams {
    /// Template kind forwarded upstream; absent means sample.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("sample")
    }
}

/// Transfer metadata echoed alongside a summary.
#[derive(Debug, Clone, Serialize)]
pub struct TransferEcho {
    pub strategy: &'static str,
    pub byte_count: usize,
    pub size_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
}

impl TransferEcho {
    #[must_use]
    pub fn new(strategy: &'static str, payload: &FetchedPayload) -> Self {
        Self {
            strategy,
            byte_count: payload.bytes.len(),
            size_display: format_size(payload.bytes.len()),
            content_type: payload.content_type.clone(),
            content_length: payload.content_length,
            content_disposition: payload.content_disposition.clone(),
        }
    }
}

/// Success envelope for the fetch-and-read endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ReadReport {
    pub operation: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
    pub transfer: TransferEcho,
    pub summary: WorkbookSummary,
}

impl ReadReport {
    #[must_use]
    pub fn completed(
        operation: &'static str,
        transfer: TransferEcho,
        summary: WorkbookSummary,
    ) -> Self {
        Self {
            operation,
            service: SERVICE_NAME,
            timestamp: Utc::now(),
            status: "completed",
            transfer,
            summary,
        }
    }
}

/// Success envelope for the template round trip, verdict included.
#[derive(Debug, Clone, Serialize)]
pub struct RoundTripReport {
    pub operation: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
    pub transfer: TransferEcho,
    pub summary: WorkbookSummary,
    pub header_validation: HeaderValidation,
}

impl RoundTripReport {
    #[must_use]
    pub fn completed(
        operation: &'static str,
        transfer: TransferEcho,
        summary: WorkbookSummary,
        header_validation: HeaderValidation,
    ) -> Self {
        Self {
            operation,
            service: SERVICE_NAME,
            timestamp: Utc::now(),
            status: "completed",
            transfer,
            summary,
            header_validation,
        }
    }
}

/// Error envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub operation: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
    pub error: String,
}

impl ErrorReport {
    #[must_use]
    pub fn new(operation: &'static str, error: String) -> Self {
        Self {
            operation,
            service: SERVICE_NAME,
            timestamp: Utc::now(),
            status: "error",
            error,
        }
    }
}

/// Payload of the service info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl ServiceInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_payload(len: usize) -> FetchedPayload {
        FetchedPayload {
            bytes: vec![0; len],
            content_type: None,
            content_length: None,
            content_disposition: None,
        }
    }

    #[test]
    fn test_read_params_default_to_sample() {
        assert_eq!(ReadParams::default().kind(), "sample");
        let params = ReadParams {
            kind: Some("report".to_string()),
        };
        assert_eq!(params.kind(), "report");
    }

    #[test]
    fn test_transfer_echo_skips_absent_headers() {
        let echo = TransferEcho::new("buffered", &bare_payload(2048));
        let json = serde_json::to_value(&echo).unwrap();

        assert_eq!(json["strategy"], "buffered");
        assert_eq!(json["byte_count"], 2048);
        assert_eq!(json["size_display"], "2.00 KB");
        assert!(json.get("content_length").is_none());
        assert!(json.get("content_disposition").is_none());
    }

    #[test]
    fn test_error_report_shape() {
        let report = ErrorReport::new("request-and-read", "upstream went away".to_string());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["operation"], "request-and-read");
        assert_eq!(json["service"], SERVICE_NAME);
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "upstream went away");
    }
}
