//! Header validation for the template round trip.

use serde::Serialize;

/// Verdict of comparing a header row against the expected labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationResult {
    Passed,
    Failed,
}

/// Verdict plus a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderValidation {
    pub result: ValidationResult,
    pub message: String,
}

/// Compare headers element-wise, in order. Length and every label must match.
#[must_use]
pub fn validate_headers(expected: &[&str], actual: &[String]) -> HeaderValidation {
    let matches = actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| a.as_str() == *e);
    if matches {
        HeaderValidation {
            result: ValidationResult::Passed,
            message: format!("all {} header labels match", expected.len()),
        }
    } else {
        HeaderValidation {
            result: ValidationResult::Failed,
            message: format!("expected headers {expected:?}, got {actual:?}"),
        }
    }
}
