//! Front-end protocol messages exchanged between the test bed and the daemon.

use serde::{Deserialize, Serialize};

use crate::report::Report;

/// How a value is embedded in an [`AnyContent`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueEmbedding {
    /// Inline value.
    #[default]
    String,
    /// Base64-encoded binary value.
    #[serde(rename = "BASE64")]
    Base64,
    /// Reference to a URL holding the value.
    Uri,
}

/// Named, possibly nested value, used for operation inputs/outputs and for
/// the report context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyContent {
    /// Parameter name, e.g. `archive`.
    pub name: String,
    /// Encoded value. Absent for containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Declared data type (`string`, `binary`, `map`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// How `value` is to be read.
    #[serde(default)]
    pub embedding: ValueEmbedding,
    /// Children of a container value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<AnyContent>,
}

impl AnyContent {
    /// Inline string value.
    pub fn string(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.into()),
            data_type: Some("string".into()),
            embedding: ValueEmbedding::String,
            items: vec![],
        }
    }

    /// Base64-encoded binary value.
    pub fn base64(name: &str, encoded: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: Some(encoded.into()),
            data_type: Some("binary".into()),
            embedding: ValueEmbedding::Base64,
            items: vec![],
        }
    }

    /// Map-typed container of other values.
    pub fn map(name: &str, items: Vec<AnyContent>) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            data_type: Some("map".into()),
            embedding: ValueEmbedding::String,
            items,
        }
    }

    /// Looks up a direct child by name.
    pub fn item(&self, name: &str) -> Option<&AnyContent> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// Whether a parameter must be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Usage {
    /// Must be supplied.
    Required,
    /// May be omitted.
    Optional,
}

/// How a parameter is expected to be passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Plain inline value.
    Simple,
    /// Base64-encoded binary content.
    Binary,
    /// URL to look the value up from.
    Url,
}

/// Declared input or output of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedParameter {
    /// Parameter name.
    pub name: String,
    /// Data type of the value.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the parameter is mandatory.
    pub usage: Usage,
    /// How the value is passed.
    pub kind: ParameterKind,
    /// Human-readable description.
    pub description: String,
}

/// One operation the service accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Operation name.
    pub name: String,
    /// Accepted inputs.
    pub inputs: Vec<TypedParameter>,
    /// Produced outputs.
    pub outputs: Vec<TypedParameter>,
}

/// Response of `getModuleDefinition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Service id.
    pub id: String,
    /// Service version.
    pub version: String,
    /// Supported operations, in declaration order.
    pub operations: Vec<OperationDefinition>,
}

impl ModuleDefinition {
    /// Looks up an operation by name.
    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Response of `beginTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginTransactionResponse {
    /// Token identifying the new session.
    pub session_id: String,
}

/// Request of `process`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Session to record the inputs in.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Processing operation; absent means `initialise`.
    #[serde(default)]
    pub operation: Option<String>,
    /// Operation inputs.
    #[serde(default)]
    pub inputs: Vec<AnyContent>,
}

/// Response of `process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    /// Operation outputs; carries the session token.
    pub outputs: Vec<AnyContent>,
    /// Processing report.
    pub report: Report,
}

/// Request of `validate`. Carries either a session id plus an operation
/// selector input, or the archive and digest inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateRequest {
    /// Envelope session id. A `session` input takes precedence.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Operation inputs.
    #[serde(default)]
    pub inputs: Vec<AnyContent>,
}

/// Response of `validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Validation report.
    pub report: Report,
}

/// Request of `endTransaction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndTransactionRequest {
    /// Session to close.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Error body returned by the HTTP front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error message.
    pub error: String,
}
