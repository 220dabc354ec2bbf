//! Error taxonomy for the content pipeline.
//!
//! [`ApiError`] covers everything the hosting API collaborator can fail with.
//! [`CmsError`] is what every public operation returns; API errors are carried
//! through it unmodified.

use serde::Serialize;
use thiserror::Error;

use crate::encoding::DecodeError;

/// Failures raised by a [`HostApi`](crate::contract::HostApi) implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("failed to decode API response: {0}")]
    Decode(String),
}

/// A single schema violation inside a front-matter block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// JSON pointer to the offending value (empty for the document root).
    pub instance_path: String,
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("path not found: segment '{segment}' of '{path}' is not a directory")]
    PathNotFound { path: String, segment: String },

    #[error("unexpected response shape for '{path}': {reason}")]
    UnexpectedResponseShape { path: String, reason: String },

    #[error("front-matter of '{path}' failed validation: {}", join_violations(.violations))]
    FrontmatterValidation {
        path: String,
        violations: Vec<FieldViolation>,
    },

    #[error("front-matter of '{path}' is not valid YAML: {source}")]
    InvalidFrontmatter {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("front-matter of '{path}' is not a mapping")]
    FrontmatterNotAMapping { path: String },

    #[error("front-matter of '{path}' does not match the expected type: {source}")]
    FrontmatterType {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("front-matter schema failed to compile: {0}")]
    InvalidSchema(String),

    #[error("failed to decode content of '{id}': {source}")]
    Decode {
        id: String,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
