//! Unified validation report and the aggregation that builds it.
//!
//! [`build`] folds the outcomes of the two backend calls into one [`Report`].
//! Items keep backend order: schema errors, profile errors, profile warnings,
//! then the upload failure message. Counters and the verdict are always
//! derived from the tagged items, never tracked separately.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AnyContent;
use crate::definition::{INPUT_ARCHIVE, INPUT_DIGEST, INPUT_REPORT_URL, OUTPUT_UPLOAD, OUTPUT_VALIDATION};
use crate::model::{Finding, UploadOutcome, ValidationOutcome};
use crate::{normalize_quotes, now_ms};

/// Message of the report returned when the report step runs before any
/// successful upload.
pub const NO_REPORT_MESSAGE: &str = "Unable to validate archive's content";

const SCHEMA_PREFIX: &str = "Schema";
const PROFILE_PREFIX: &str = "Profile";

/// Overall outcome of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// No findings.
    Success,
    /// Warnings only.
    Warning,
    /// At least one error.
    Failure,
}

/// Severity tag of a report item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemLevel {
    /// Counts towards `errors`.
    Error,
    /// Counts towards `warnings`.
    Warning,
}

/// One classified entry of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    /// Severity tag.
    pub level: ItemLevel,
    /// Item text, prefixed with its source.
    pub description: String,
    /// Check that produced the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Rule id of the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_id: Option<String>,
    /// Location of the finding within the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ReportItem {
    fn plain(level: ItemLevel, description: String) -> Self {
        Self {
            level,
            description,
            test: None,
            assertion_id: None,
            location: None,
        }
    }
}

/// Item counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Items tagged ERROR.
    pub errors: u32,
    /// Items tagged WARNING.
    pub warnings: u32,
    /// Always zero; the backend reports nothing informational.
    pub informational: u32,
}

/// Values echoed back to the caller alongside the findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    /// Inputs of the call, as supplied.
    pub inputs: Vec<AnyContent>,
    /// Serialized backend outcomes.
    pub outputs: Vec<AnyContent>,
}

/// Structured pass/fail report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Overall outcome, derived from `items`.
    pub verdict: Verdict,
    /// Creation time in unix epoch milliseconds.
    pub timestamp_ms: i64,
    /// Findings in backend order.
    pub items: Vec<ReportItem>,
    /// Per-level item counts, derived from `items`.
    pub counters: Counters,
    /// Echoed inputs and outputs.
    pub context: ReportContext,
}

impl Report {
    /// A report with no findings and a SUCCESS verdict.
    pub fn empty() -> Self {
        Self {
            verdict: Verdict::Success,
            timestamp_ms: now_ms(),
            items: vec![],
            counters: Counters::default(),
            context: ReportContext::default(),
        }
    }

    /// Canned FAILURE report for a report step that has no report URL to
    /// fetch from.
    pub fn no_report_available() -> Self {
        let mut report = Self::empty();
        report.push(ReportItem::plain(ItemLevel::Error, NO_REPORT_MESSAGE.to_string()));
        report.tally();
        report
    }

    /// Items tagged with `level`.
    pub fn items_at(&self, level: ItemLevel) -> impl Iterator<Item = &ReportItem> {
        self.items.iter().filter(move |i| i.level == level)
    }

    fn push(&mut self, item: ReportItem) {
        self.items.push(item);
    }

    /// Recomputes counters and verdict from the items.
    fn tally(&mut self) {
        let errors = self.items_at(ItemLevel::Error).count() as u32;
        let warnings = self.items_at(ItemLevel::Warning).count() as u32;
        self.counters = Counters {
            errors,
            warnings,
            informational: 0,
        };
        self.verdict = if errors > 0 {
            Verdict::Failure
        } else if warnings > 0 {
            Verdict::Warning
        } else {
            Verdict::Success
        };
    }
}

/// Inputs of the calling operation to echo in the report context.
///
/// Only the values actually supplied to the call are set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoedInputs<'a> {
    /// Raw archive bytes; echoed base64-encoded.
    pub archive: Option<&'a [u8]>,
    /// Declared digest.
    pub digest: Option<&'a str>,
    /// Report URL the validation was fetched from.
    pub report_url: Option<&'a str>,
}

/// Builds the unified report from whichever backend outcomes are available.
///
/// An upload failure message and validation findings are aggregated: both
/// contribute items when both are present.
pub fn build(
    upload: Option<&UploadOutcome>,
    validation: Option<&ValidationOutcome>,
    inputs: &EchoedInputs<'_>,
) -> Report {
    let mut report = Report::empty();
    report.context.inputs = echo_inputs(inputs);
    report.context.outputs = echo_outputs(upload, validation);

    if let Some(validation) = validation {
        for error in &validation.schema_errors {
            report.push(ReportItem::plain(
                ItemLevel::Error,
                format!("[{SCHEMA_PREFIX}] {}", normalize_quotes(error)),
            ));
        }
        for finding in validation
            .profile_errors
            .iter()
            .chain(validation.profile_warnings.iter())
        {
            report.push(finding_item(PROFILE_PREFIX, finding));
        }
    }

    if let Some(message) = upload.and_then(|u| u.message.as_deref()) {
        report.push(ReportItem::plain(ItemLevel::Error, normalize_quotes(message)));
    }

    report.tally();
    report
}

fn finding_item(prefix: &str, finding: &Finding) -> ReportItem {
    let mut description = format!("[{prefix}]");
    if let Some(rule_id) = &finding.rule_id {
        description.push_str(&format!("[{rule_id}]"));
    }
    if let Some(message) = &finding.message {
        description.push(' ');
        description.push_str(&normalize_quotes(message));
    }
    let level = if finding.is_warning() {
        ItemLevel::Warning
    } else {
        ItemLevel::Error
    };
    ReportItem {
        level,
        description,
        test: finding.test.clone(),
        assertion_id: finding.rule_id.clone(),
        location: finding.location.clone(),
    }
}

fn echo_inputs(inputs: &EchoedInputs<'_>) -> Vec<AnyContent> {
    let mut out = vec![];
    if let Some(archive) = inputs.archive {
        out.push(AnyContent::base64(INPUT_ARCHIVE, STANDARD.encode(archive)));
    }
    if let Some(digest) = inputs.digest {
        out.push(AnyContent::string(INPUT_DIGEST, digest));
    }
    if let Some(url) = inputs.report_url {
        out.push(AnyContent::string(INPUT_REPORT_URL, url));
    }
    out
}

fn echo_outputs(
    upload: Option<&UploadOutcome>,
    validation: Option<&ValidationOutcome>,
) -> Vec<AnyContent> {
    let mut out = vec![];
    if let Some(upload) = upload {
        match serde_json::to_string_pretty(upload) {
            Ok(json) => out.push(AnyContent::string(OUTPUT_UPLOAD, normalize_quotes(&json))),
            Err(e) => warn!(error = %e, "unable to serialise upload outcome"),
        }
        if let Some(url) = &upload.report_url {
            out.push(AnyContent::string(INPUT_REPORT_URL, url.as_str()));
        }
    }
    if let Some(validation) = validation {
        match serde_json::to_string_pretty(validation) {
            Ok(json) => out.push(AnyContent::string(OUTPUT_VALIDATION, normalize_quotes(&json))),
            Err(e) => warn!(error = %e, "unable to serialise validation outcome"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule: Option<&str>, message: Option<&str>, severity: &str) -> Finding {
        Finding {
            location: Some("METS.xml".into()),
            message: message.map(String::from),
            rule_id: rule.map(String::from),
            severity: Some(severity.into()),
            test: Some("//mets".into()),
        }
    }

    #[test]
    fn rule_segment_omitted_when_absent() {
        let item = finding_item(PROFILE_PREFIX, &finding(None, Some("bad"), "Error"));
        assert_eq!(item.description, "[Profile] bad");
    }

    #[test]
    fn message_segment_omitted_when_absent() {
        let item = finding_item(PROFILE_PREFIX, &finding(Some("CSIP9"), None, "Error"));
        assert_eq!(item.description, "[Profile][CSIP9]");
        assert_eq!(item.assertion_id.as_deref(), Some("CSIP9"));
    }

    #[test]
    fn finding_details_are_carried() {
        let item = finding_item(PROFILE_PREFIX, &finding(Some("R1"), Some("m"), "Warn"));
        assert_eq!(item.level, ItemLevel::Warning);
        assert_eq!(item.location.as_deref(), Some("METS.xml"));
        assert_eq!(item.test.as_deref(), Some("//mets"));
    }

    #[test]
    fn no_report_available_is_single_error() {
        let report = Report::no_report_available();
        assert_eq!(report.verdict, Verdict::Failure);
        assert_eq!(report.counters.errors, 1);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].description, NO_REPORT_MESSAGE);
        assert!(report.context.inputs.is_empty());
    }

    #[test]
    fn empty_report_succeeds() {
        let report = Report::empty();
        assert_eq!(report.verdict, Verdict::Success);
        assert_eq!(report.counters, Counters::default());
    }
}
