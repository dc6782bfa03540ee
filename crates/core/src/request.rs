//! Extraction of typed requests from the generic input lists of the
//! front-end protocol.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::api::{AnyContent, ProcessRequest, ValidateRequest, ValueEmbedding};
use crate::definition::{
    INPUT_ARCHIVE, INPUT_DIGEST, INPUT_OPERATION, INPUT_SESSION, OP_INITIALISE, OP_REPORT,
    OP_UPLOAD,
};

/// Why a request's inputs could not be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// A required input is missing or repeated.
    #[error("This service expects one input to be provided named '{0}'")]
    ExpectedOne(String),
    /// The input carries no value.
    #[error("input '{0}' has no value")]
    MissingValue(String),
    /// A binary input failed to decode.
    #[error("input '{0}' is not valid base64: {1}")]
    InvalidBase64(String, String),
    /// URI-embedded inputs are not fetched.
    #[error("input '{0}' is passed by reference, which is not supported")]
    ByReference(String),
    /// A session step arrived without a session token.
    #[error("no session ID was provided")]
    MissingSession,
    /// The operation name is not one this service knows.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}

/// Step of the session-based validation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// Send the stored archive to the backend.
    Upload,
    /// Fetch the backend report.
    Report,
}

impl SessionStep {
    /// Resolves an `operation` input value.
    pub fn parse(selector: &str) -> Result<Self, RequestError> {
        match selector {
            OP_UPLOAD => Ok(Self::Upload),
            OP_REPORT => Ok(Self::Report),
            other => Err(RequestError::UnknownOperation(other.to_string())),
        }
    }

    /// Operation name of the step.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => OP_UPLOAD,
            Self::Report => OP_REPORT,
        }
    }
}

/// A `validate` call, resolved to one of the two interaction modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRequest {
    /// Archive and digest inline, validated in one call.
    Direct {
        /// Decoded archive bytes.
        archive: Vec<u8>,
        /// Declared digest.
        digest: String,
    },
    /// One step against an existing session.
    Session {
        /// Session token.
        session_id: String,
        /// Step to run.
        step: SessionStep,
    },
}

impl ValidationRequest {
    /// An `operation` input selects session mode. The token comes from the
    /// `session` input and falls back to the envelope id, which test beds may
    /// also use for their own correlation. Without a selector, inline
    /// archive content (or no token at all) means direct mode.
    pub fn from_request(req: &ValidateRequest) -> Result<Self, RequestError> {
        let has = |name: &str| req.inputs.iter().any(|i| i.name == name);
        let session_id = match optional_value(&req.inputs, INPUT_SESSION)? {
            Some(id) => Some(id),
            None => req.session_id.clone(),
        };

        if !has(INPUT_OPERATION) && (has(INPUT_ARCHIVE) || session_id.is_none()) {
            return Ok(Self::Direct {
                archive: required_binary(&req.inputs, INPUT_ARCHIVE)?,
                digest: required_value(&req.inputs, INPUT_DIGEST)?,
            });
        }

        let selector = required_value(&req.inputs, INPUT_OPERATION)?;
        let step = SessionStep::parse(&selector)?;
        Ok(Self::Session {
            session_id: session_id.ok_or(RequestError::MissingSession)?,
            step,
        })
    }
}

/// The `initialise` processing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialiseRequest {
    /// Session to record the archive in.
    pub session_id: String,
    /// Decoded archive bytes.
    pub archive: Vec<u8>,
    /// Declared digest.
    pub digest: String,
}

impl InitialiseRequest {
    /// Parses a `process` call; only `initialise` is supported.
    pub fn from_request(req: &ProcessRequest) -> Result<Self, RequestError> {
        let session_id = req.session_id.clone().ok_or(RequestError::MissingSession)?;
        let operation = req.operation.as_deref().unwrap_or(OP_INITIALISE);
        if operation != OP_INITIALISE {
            return Err(RequestError::UnknownOperation(operation.to_string()));
        }
        Ok(Self {
            session_id,
            digest: required_value(&req.inputs, INPUT_DIGEST)?,
            archive: required_binary(&req.inputs, INPUT_ARCHIVE)?,
        })
    }
}

fn single<'a>(inputs: &'a [AnyContent], name: &str) -> Result<&'a AnyContent, RequestError> {
    let mut found = inputs.iter().filter(|i| i.name == name);
    match (found.next(), found.next()) {
        (Some(input), None) => Ok(input),
        _ => Err(RequestError::ExpectedOne(name.to_string())),
    }
}

fn inline_value(input: &AnyContent) -> Result<String, RequestError> {
    if input.embedding == ValueEmbedding::Uri {
        return Err(RequestError::ByReference(input.name.clone()));
    }
    input
        .value
        .clone()
        .ok_or_else(|| RequestError::MissingValue(input.name.clone()))
}

/// Exactly one input named `name`, as an inline string.
pub fn required_value(inputs: &[AnyContent], name: &str) -> Result<String, RequestError> {
    inline_value(single(inputs, name)?)
}

/// At most one input named `name`.
pub fn optional_value(inputs: &[AnyContent], name: &str) -> Result<Option<String>, RequestError> {
    if inputs.iter().any(|i| i.name == name) {
        required_value(inputs, name).map(Some)
    } else {
        Ok(None)
    }
}

/// Exactly one input named `name`, base64-decoded.
pub fn required_binary(inputs: &[AnyContent], name: &str) -> Result<Vec<u8>, RequestError> {
    let encoded = required_value(inputs, name)?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| RequestError::InvalidBase64(name.to_string(), e.to_string()))
}
