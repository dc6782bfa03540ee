//! Wire models of the validation backend's REST API.
//!
//! The backend answers both calls with JSON objects whose fields may all be
//! missing; every field is therefore optional and absent sequences decode to
//! empty vectors.

use serde::{Deserialize, Serialize};

/// Literal severity the backend uses for warning-level findings.
pub const WARNING_SEVERITY: &str = "Warn";

/// Result of the upload call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Failure message. Present only when the backend rejected the archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Digest echoed back by the backend.
    #[serde(rename = "sha1", default, skip_serializing_if = "Option::is_none")]
    pub digest_echo: Option<String>,

    /// URL to fetch the validation report from. Present only on success.
    #[serde(rename = "validation_url", default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl UploadOutcome {
    /// The report URL, if present and not blank.
    pub fn usable_report_url(&self) -> Option<&str> {
        self.report_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

/// Result of the report call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the package metadata passed the profile checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_valid: Option<bool>,

    /// Whether the package passed schema validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_valid: Option<bool>,

    /// Schema validation messages.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub schema_errors: Vec<String>,

    /// Findings the backend lists as errors.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profile_errors: Vec<Finding>,

    /// Findings the backend lists as warnings.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profile_warnings: Vec<Finding>,
}

/// One problem reported by the backend's profile checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Where in the package the problem was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Description of the problem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Id of the violated profile rule.
    #[serde(rename = "rule_id", default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Backend severity label; see [`Finding::is_warning`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// The check that was evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
}

impl Finding {
    /// Only the literal `"Warn"` severity is warning-level; anything else
    /// (including no severity at all) counts as an error.
    pub fn is_warning(&self) -> bool {
        self.severity.as_deref() == Some(WARNING_SEVERITY)
    }
}

/// The backend sends `null` for empty lists as often as it omits them.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
