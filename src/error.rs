//! Error types for API Gateway reconciliation.
//!
//! This module provides the error hierarchy for every stage of a run:
//! manifest loading, remote API calls, and the reconciliation itself.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the crate.
#[derive(Debug, Error)]
pub enum ApigwError {
    /// Manifest and configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors returned by the API Gateway management API.
    #[error("API Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Manifest and configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Manifest validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No AWS region could be resolved from the manifest, environment or profile.
    #[error("No AWS region configured (set aws.region, APIGW_REGION or AWS_REGION)")]
    MissingRegion,
}

/// Errors surfaced by the remote API.
///
/// Remote failures are passed through with the provider's message; the only
/// local classification is whether re-running could help.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The API rejected the request.
    #[error("{operation} failed: {code}: {message}")]
    Api {
        /// SDK operation name.
        operation: &'static str,
        /// Provider error code (e.g. `ConflictException`).
        code: String,
        /// Provider error message.
        message: String,
    },

    /// The API throttled the request.
    #[error("{operation} was throttled: {message}")]
    Throttled {
        /// SDK operation name.
        operation: &'static str,
        /// Provider error message.
        message: String,
    },

    /// The request never reached the API or timed out.
    #[error("Network error during {operation}: {message}")]
    Network {
        /// SDK operation name.
        operation: &'static str,
        /// Description of the network error.
        message: String,
    },

    /// The API answered with something the client could not interpret.
    #[error("Invalid response from {operation}: {message}")]
    InvalidResponse {
        /// SDK operation name.
        operation: &'static str,
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Neither a name nor an id was supplied where one is required.
    #[error("{kind}: {message}")]
    MissingIdentity {
        /// Resource kind.
        kind: &'static str,
        /// What is missing.
        message: String,
    },

    /// More than one remote resource matched the requested identity.
    #[error("{kind} '{identity}' is ambiguous: matched {}", matches.join(", "))]
    AmbiguousMatch {
        /// Resource kind.
        kind: &'static str,
        /// Identity that was looked up.
        identity: String,
        /// Ids of every matching resource.
        matches: Vec<String>,
    },

    /// An explicitly addressed resource does not exist.
    #[error("{kind} '{identity}' not found")]
    NotFound {
        /// Resource kind.
        kind: &'static str,
        /// Identity that was looked up.
        identity: String,
    },

    /// A resource referenced by the descriptor does not exist.
    #[error("{kind} '{identity}': referenced {reference} not found")]
    ReferenceNotFound {
        /// Resource kind being reconciled.
        kind: &'static str,
        /// Identity of the resource being reconciled.
        identity: String,
        /// The missing reference.
        reference: String,
    },

    /// The descriptor asks to change a field that cannot change after creation.
    #[error("{kind} '{identity}': cannot change {field} after creation")]
    ImmutableField {
        /// Resource kind.
        kind: &'static str,
        /// Identity of the resource.
        identity: String,
        /// Offending field.
        field: String,
    },

    /// The resource kind cannot be created directly.
    #[error("{kind} '{identity}' does not exist and cannot be created: {reason}")]
    CreateUnsupported {
        /// Resource kind.
        kind: &'static str,
        /// Identity of the resource.
        identity: String,
        /// How the resource comes into existence instead.
        reason: String,
    },

    /// Some update steps were applied before a later one failed.
    #[error(
        "{kind} '{identity}' partially updated ({applied}/{total} steps applied), {failed_step} failed: {reason}"
    )]
    PartialApply {
        /// Resource kind.
        kind: &'static str,
        /// Identity of the resource.
        identity: String,
        /// Steps applied before the failure.
        applied: usize,
        /// Total steps planned.
        total: usize,
        /// Description of the failing step.
        failed_step: String,
        /// Underlying error.
        reason: String,
    },

    /// The remote resource exists but is in a failed or terminal state.
    #[error("{kind} '{identity}' is {status}: {message}")]
    UnhealthyResource {
        /// Resource kind.
        kind: &'static str,
        /// Identity of the resource.
        identity: String,
        /// Remote status.
        status: String,
        /// Status message reported by the API.
        message: String,
    },
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, ApigwError>;

impl ApigwError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if re-running the same reconciliation could succeed.
    ///
    /// Partial updates are included: the next run recomputes the remaining
    /// changes from the remote state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(GatewayError::Throttled { .. } | GatewayError::Network { .. })
                | Self::Reconcile(ReconcileError::PartialApply { .. })
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl GatewayError {
    /// Creates an API error.
    #[must_use]
    pub fn api(operation: &'static str, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            operation,
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation,
            message: message.into(),
        }
    }
}

impl ReconcileError {
    /// Creates a missing identity error.
    #[must_use]
    pub fn missing_identity(kind: &'static str, message: impl Into<String>) -> Self {
        Self::MissingIdentity {
            kind,
            message: message.into(),
        }
    }

    /// Creates a reference-not-found error.
    #[must_use]
    pub fn reference_not_found(
        kind: &'static str,
        identity: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::ReferenceNotFound {
            kind,
            identity: identity.into(),
            reference: reference.into(),
        }
    }

    /// Creates an immutable field error.
    #[must_use]
    pub fn immutable(kind: &'static str, identity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ImmutableField {
            kind,
            identity: identity.into(),
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let throttled: ApigwError = GatewayError::Throttled {
            operation: "GetRestApis",
            message: "Too Many Requests".to_string(),
        }
        .into();
        assert!(throttled.is_retryable());

        let network: ApigwError = GatewayError::network("GetStage", "connection reset").into();
        assert!(network.is_retryable());

        let api: ApigwError = GatewayError::api("CreateUsagePlan", "BadRequestException", "bad").into();
        assert!(!api.is_retryable());
    }

    #[test]
    fn test_ambiguous_message_lists_matches() {
        let err = ReconcileError::AmbiguousMatch {
            kind: "rest_api",
            identity: "orders".to_string(),
            matches: vec!["a1".to_string(), "b2".to_string()],
        };
        assert_eq!(err.to_string(), "rest_api 'orders' is ambiguous: matched a1, b2");
    }

    #[test]
    fn test_immutable_message() {
        let err = ReconcileError::immutable("api_key", "partner", "value");
        assert_eq!(
            err.to_string(),
            "api_key 'partner': cannot change value after creation"
        );
    }
}
