//! Request and response types for the generator endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which built-in dataset a generate endpoint renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Employee sample sheet: one header row plus ten data rows.
    Sample,
    /// Monthly report layout: title, spacer, headers, summary rows.
    Report,
}

impl TemplateKind {
    /// Parse the `type` query value. Anything other than `report` falls back
    /// to the sample dataset, unknown values included.
    #[must_use]
    pub fn from_query(value: &str) -> Self {
        match value {
            "report" => Self::Report,
            _ => Self::Sample,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Report => "report",
        }
    }
}

/// Query parameters accepted by the generate endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GenerateParams {
    #[must_use]
    pub fn kind(&self) -> TemplateKind {
        self.kind
            .as_deref()
            .map_or(TemplateKind::Sample, TemplateKind::from_query)
    }
}

/// Payload of the service info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl ServiceInfo {
    #[must_use]
    pub fn current(service: &str) -> Self {
        Self {
            service: service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}
