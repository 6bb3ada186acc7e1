use thiserror::Error;

use crate::domain::session::Step;
use crate::domain::tenant::CryptoError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid step transition from {from:?} to {to:?}")]
    InvalidStepTransition { from: Step, to: Step },
    #[error("unknown step `{0}`")]
    UnknownStep(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("tenant not resolved")]
    TenantNotResolved,
    /// The session row changed under us between read and write. The caller
    /// must fail the request so the provider retries.
    #[error("session write conflict")]
    SessionConflict,
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// What the transport layer shows the caller. Internal detail stays in the
/// log line keyed by `correlation_id`; the user-facing message never carries
/// identifiers or stack traces.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden")]
    Forbidden { correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            ApplicationError::Domain(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            // Tenant/crypto failures map to a generic denial: do not leak
            // which part failed to resolve.
            ApplicationError::Crypto(_) | ApplicationError::TenantNotResolved => {
                InterfaceError::Forbidden { correlation_id }
            }
            ApplicationError::SessionConflict
            | ApplicationError::Persistence(_)
            | ApplicationError::Integration(_) => InterfaceError::ServiceUnavailable {
                message: "temporary failure".to_string(),
                correlation_id,
            },
            ApplicationError::Configuration(message) => {
                InterfaceError::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_failures_map_to_forbidden_without_detail() {
        let mapped = ApplicationError::Crypto(CryptoError::ContextMismatch).into_interface("req-7");
        assert_eq!(mapped, InterfaceError::Forbidden { correlation_id: "req-7".to_string() });
        assert_eq!(mapped.to_string(), "forbidden");
    }

    #[test]
    fn session_conflict_maps_to_service_unavailable() {
        let mapped = ApplicationError::SessionConflict.into_interface("req-8");
        assert!(matches!(mapped, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn domain_errors_map_to_bad_request() {
        let mapped = ApplicationError::Domain(DomainError::UnknownStep("zzz".to_string()))
            .into_interface("req-9");
        assert!(matches!(mapped, InterfaceError::BadRequest { .. }));
    }
}
