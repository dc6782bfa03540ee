//! Aggregation rules of the report builder.

use archive_validator_core::model::{Finding, UploadOutcome, ValidationOutcome};
use archive_validator_core::report::{build, EchoedInputs, ItemLevel, Report, Verdict};

fn warning(rule: &str, message: &str) -> Finding {
    Finding {
        rule_id: Some(rule.into()),
        message: Some(message.into()),
        severity: Some("Warn".into()),
        ..Default::default()
    }
}

fn error(rule: &str, message: &str) -> Finding {
    Finding {
        rule_id: Some(rule.into()),
        message: Some(message.into()),
        severity: Some("Error".into()),
        ..Default::default()
    }
}

fn assert_counters_match_items(report: &Report) {
    assert_eq!(
        report.counters.errors as usize,
        report.items_at(ItemLevel::Error).count()
    );
    assert_eq!(
        report.counters.warnings as usize,
        report.items_at(ItemLevel::Warning).count()
    );
}

#[test]
fn single_schema_error_fails() {
    let validation = ValidationOutcome {
        schema_errors: vec!["E1".into()],
        ..Default::default()
    };
    let report = build(None, Some(&validation), &EchoedInputs::default());

    assert_eq!(report.counters.errors, 1);
    assert_eq!(report.verdict, Verdict::Failure);
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].description, "[Schema] E1");
    assert_eq!(report.items[0].level, ItemLevel::Error);
}

#[test]
fn lone_profile_warning_warns() {
    let validation = ValidationOutcome {
        profile_warnings: vec![warning("CSIP10", "recommended element missing")],
        ..Default::default()
    };
    let report = build(None, Some(&validation), &EchoedInputs::default());

    assert_eq!(report.verdict, Verdict::Warning);
    assert_eq!(report.counters.warnings, 1);
    assert_eq!(report.counters.errors, 0);
    assert_eq!(
        report.items[0].description,
        "[Profile][CSIP10] recommended element missing"
    );
}

#[test]
fn upload_message_counts_alongside_validation() {
    let upload = UploadOutcome {
        message: Some("Digest mismatch".into()),
        ..Default::default()
    };
    let validation = ValidationOutcome::default();
    let report = build(Some(&upload), Some(&validation), &EchoedInputs::default());

    assert_eq!(report.counters.errors, 1);
    assert_eq!(report.verdict, Verdict::Failure);
    assert_eq!(report.items[0].description, "Digest mismatch");
}

#[test]
fn upload_message_follows_validation_items() {
    let upload = UploadOutcome {
        message: Some("late failure".into()),
        ..Default::default()
    };
    let validation = ValidationOutcome {
        schema_errors: vec!["S".into()],
        profile_errors: vec![error("R1", "p")],
        profile_warnings: vec![warning("R2", "w")],
        ..Default::default()
    };
    let report = build(Some(&upload), Some(&validation), &EchoedInputs::default());

    let descriptions: Vec<_> = report.items.iter().map(|i| i.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec!["[Schema] S", "[Profile][R1] p", "[Profile][R2] w", "late failure"]
    );
    assert_eq!(report.counters.errors, 3);
    assert_eq!(report.counters.warnings, 1);
    assert_counters_match_items(&report);
}

#[test]
fn successful_upload_alone_succeeds() {
    let upload = UploadOutcome {
        report_url: Some("http://x/r1".into()),
        digest_echo: Some("abc".into()),
        ..Default::default()
    };
    let report = build(Some(&upload), None, &EchoedInputs::default());

    assert_eq!(report.verdict, Verdict::Success);
    assert!(report.items.is_empty());
}

#[test]
fn indeterminate_upload_succeeds_without_items() {
    let report = build(Some(&UploadOutcome::default()), None, &EchoedInputs::default());
    assert_eq!(report.verdict, Verdict::Success);
    assert_eq!(report.counters.errors, 0);
}

#[test]
fn smart_quotes_are_normalized_in_items() {
    let validation = ValidationOutcome {
        profile_errors: vec![error("R", "attribute \u{201c}TYPE\u{201d} is missing")],
        schema_errors: vec!["\u{201c}x\u{201d}".into()],
        ..Default::default()
    };
    let report = build(None, Some(&validation), &EchoedInputs::default());

    assert_eq!(report.items[0].description, "[Schema] \"x\"");
    assert_eq!(report.items[1].description, "[Profile][R] attribute \"TYPE\" is missing");
}

#[test]
fn warn_severity_in_error_list_is_a_warning() {
    let validation = ValidationOutcome {
        profile_errors: vec![warning("R", "soft")],
        ..Default::default()
    };
    let report = build(None, Some(&validation), &EchoedInputs::default());

    assert_eq!(report.verdict, Verdict::Warning);
    assert_counters_match_items(&report);
}

#[test]
fn unknown_severity_is_an_error() {
    let mut finding = warning("R", "odd");
    finding.severity = Some("Info".into());
    let validation = ValidationOutcome {
        profile_warnings: vec![finding],
        ..Default::default()
    };
    let report = build(None, Some(&validation), &EchoedInputs::default());

    assert_eq!(report.verdict, Verdict::Failure);
    assert_eq!(report.counters.errors, 1);
    assert_eq!(report.counters.warnings, 0);
}

#[test]
fn context_echoes_supplied_inputs_only() {
    let inputs = EchoedInputs {
        archive: Some(b"zip"),
        digest: Some("d1"),
        report_url: None,
    };
    let report = build(Some(&UploadOutcome::default()), None, &inputs);

    let names: Vec<_> = report.context.inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "digest"]);
    assert_eq!(report.context.inputs[0].value.as_deref(), Some("emlw"));
}

#[test]
fn context_outputs_serialize_outcomes() {
    let upload = UploadOutcome {
        report_url: Some("http://x/r1".into()),
        ..Default::default()
    };
    let validation = ValidationOutcome {
        schema_errors: vec!["\u{201c}q\u{201d}".into()],
        ..Default::default()
    };
    let report = build(Some(&upload), Some(&validation), &EchoedInputs::default());

    let names: Vec<_> = report.context.outputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["upload", "reportUrl", "validation"]);
    assert_eq!(report.context.outputs[1].value.as_deref(), Some("http://x/r1"));

    let upload_json = report.context.outputs[0].value.as_deref().unwrap();
    assert!(upload_json.contains("\"validation_url\": \"http://x/r1\""));

    let validation_json = report.context.outputs[2].value.as_deref().unwrap();
    assert!(!validation_json.contains('\u{201c}'));
    assert!(validation_json.contains("\"q\""));
}

#[test]
fn report_serializes_verdict_and_levels() {
    let validation = ValidationOutcome {
        schema_errors: vec!["E1".into()],
        ..Default::default()
    };
    let report = build(None, Some(&validation), &EchoedInputs::default());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["verdict"], "FAILURE");
    assert_eq!(json["items"][0]["level"], "ERROR");
    assert_eq!(json["counters"]["errors"], 1);
}
