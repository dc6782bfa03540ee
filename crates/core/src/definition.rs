//! Static description of the operations the service accepts.

use crate::api::{ModuleDefinition, OperationDefinition, ParameterKind, TypedParameter, Usage};

/// Archive to validate.
pub const INPUT_ARCHIVE: &str = "archive";
/// Declared digest of the archive.
pub const INPUT_DIGEST: &str = "digest";
/// Session-mode step selector.
pub const INPUT_OPERATION: &str = "operation";
/// Session token, when passed as an input rather than in the envelope.
pub const INPUT_SESSION: &str = "session";
/// Report URL echoed as input/output of report-related calls.
pub const INPUT_REPORT_URL: &str = "reportUrl";

/// Session token returned by `process`.
pub const OUTPUT_SESSION: &str = "session";
/// Validation report.
pub const OUTPUT_REPORT: &str = "report";
/// Serialized upload outcome in the report context.
pub const OUTPUT_UPLOAD: &str = "upload";
/// Serialized validation outcome in the report context.
pub const OUTPUT_VALIDATION: &str = "validation";

/// Processing operation that records archive and digest in a session.
pub const OP_INITIALISE: &str = "initialise";
/// Single-call validation without a session.
pub const OP_VALIDATE: &str = "validate";
/// Session step that uploads the archive to the backend.
pub const OP_UPLOAD: &str = "upload";
/// Session step that fetches the backend's report.
pub const OP_REPORT: &str = "report";

fn param(name: &str, data_type: &str, kind: ParameterKind, description: &str) -> TypedParameter {
    TypedParameter {
        name: name.to_string(),
        data_type: data_type.to_string(),
        usage: Usage::Required,
        kind,
        description: description.to_string(),
    }
}

fn operation(name: &str, inputs: Vec<TypedParameter>, outputs: Vec<TypedParameter>) -> OperationDefinition {
    OperationDefinition {
        name: name.to_string(),
        inputs,
        outputs,
    }
}

fn archive() -> TypedParameter {
    param(INPUT_ARCHIVE, "binary", ParameterKind::Binary, "The archive to validate.")
}

fn digest() -> TypedParameter {
    param(INPUT_DIGEST, "string", ParameterKind::Simple, "The archive's SHA1 digest.")
}

fn session_step(step: &str) -> Vec<TypedParameter> {
    vec![
        param(
            INPUT_SESSION,
            "string",
            ParameterKind::Simple,
            "The session ID returned by the initialise operation.",
        ),
        param(
            INPUT_OPERATION,
            "string",
            ParameterKind::Simple,
            &format!("The validation step to run ('{step}')."),
        ),
    ]
}

fn report() -> TypedParameter {
    param(OUTPUT_REPORT, "object", ParameterKind::Simple, "The validation report.")
}

/// Builds the module definition for the given service identity.
pub fn module_definition(service_id: &str, service_version: &str) -> ModuleDefinition {
    ModuleDefinition {
        id: service_id.to_string(),
        version: service_version.to_string(),
        operations: vec![
            operation(OP_VALIDATE, vec![archive(), digest()], vec![report()]),
            operation(
                OP_INITIALISE,
                vec![archive(), digest()],
                vec![param(
                    OUTPUT_SESSION,
                    "string",
                    ParameterKind::Simple,
                    "The session ID to use for subsequent calls to the validator.",
                )],
            ),
            operation(OP_UPLOAD, session_step(OP_UPLOAD), vec![report()]),
            operation(OP_REPORT, session_step(OP_REPORT), vec![report()]),
        ],
    }
}
