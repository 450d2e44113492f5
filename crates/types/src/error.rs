//! Error taxonomy shared by every mpx crate.
//!
//! Each variant carries the offending value together with what was expected
//! so a caller can act on the error without digging into SDK internals. None
//! of these errors are retried by the SDK.

use thiserror::Error;

/// Result alias used across the SDK.
pub type Result<T, E = MpxError> = std::result::Result<T, E>;

/// Main error type for mpx operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MpxError {
    /// Malformed input: an empty field name, a missing required parameter,
    /// an argument a web method does not accept.
    #[error("invalid {subject} '{value}': {reason}")]
    Validation { subject: String, value: String, reason: String },

    /// Unknown service, endpoint, tenant or record.
    #[error("{kind} not found: {key}")]
    NotFound { kind: String, key: String },

    /// A reference URL that does not map onto any cataloged service.
    #[error("'{reference}' is not a usable reference: {reason}")]
    Address { reference: String, reason: String },

    /// No token is held for the current caller.
    #[error("not signed in: {message}")]
    Unauthenticated { message: String },

    /// Connection level failure reported by the transport collaborator.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The platform answered, but with an unhealthy status or an exception body.
    #[error("remote error (status {status}): {title}: {description} (cid: {correlation_id})")]
    Remote {
        status: u16,
        title: String,
        description: String,
        correlation_id: String,
    },

    /// A body that should have been JSON of a known shape was not.
    #[error("failed to decode {context}: {message}. body preview: {preview}")]
    Decode { context: String, message: String, preview: String },
}

impl MpxError {
    /// Create a validation error.
    pub fn validation(subject: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            subject: subject.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create an address error.
    pub fn address(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Address {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create a remote error for a status that carried no exception body.
    pub fn remote_status(status: u16) -> Self {
        Self::Remote {
            status,
            title: "UnhealthyResponse".to_string(),
            description: format!("status {status} is outside 2xx/3xx"),
            correlation_id: String::new(),
        }
    }

    /// Create a decode error.
    pub fn decode(context: impl Into<String>, message: impl Into<String>, preview: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.into(),
            preview: preview.into(),
        }
    }

    /// Whether the error came back from the platform rather than from local input.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let error = MpxError::validation("field name", "", "must not be empty");
        assert_eq!(error.to_string(), "invalid field name '': must not be empty");

        let error = MpxError::not_found("service", "Nope Data Service");
        assert_eq!(error.to_string(), "service not found: Nope Data Service");
    }

    #[test]
    fn remote_status_describes_the_status() {
        let error = MpxError::remote_status(503);
        assert!(error.is_remote());
        assert!(error.to_string().contains("503"));
    }
}
