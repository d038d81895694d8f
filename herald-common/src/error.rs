//! Error types for the herald-common crate.
//!
//! These cover the two external collaborators specified at their
//! interface: the template catalog and the message transport.

use std::io;

use thiserror::Error;

/// Errors raised by a [`crate::TemplateSource`].
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template is registered under the requested key.
    #[error("Missing template: {0}")]
    Missing(String),
}

/// Errors raised by a [`crate::Transport`] during a send.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport's delivery policy refused to send (e.g. deliveries
    /// disabled). The unchecked send variant bypasses this class of
    /// failure.
    #[error("Delivery refused: {0}")]
    Refused(String),

    /// The provider rejected the message.
    #[error("Message rejected ({code}): {reason}")]
    Rejected { code: u16, reason: String },

    /// The send timed out.
    #[error("Send timed out after {0} seconds")]
    Timeout(u64),

    /// I/O error while talking to the provider.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Returns `true` if the failure came from local delivery policy
    /// rather than the provider or the network.
    #[must_use]
    pub const fn is_refusal(&self) -> bool {
        matches!(self, Self::Refused(_))
    }

    /// Returns `true` if the provider itself rejected the message.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = TemplateError::Missing("notifier.welcome".to_string());
        assert_eq!(err.to_string(), "Missing template: notifier.welcome");
    }

    #[test]
    fn test_transport_error_classification() {
        let err = TransportError::Refused("deliveries disabled".to_string());
        assert!(err.is_refusal());
        assert!(!err.is_rejection());

        let err = TransportError::Rejected {
            code: 21211,
            reason: "invalid number".to_string(),
        };
        assert!(err.is_rejection());
        assert!(!err.is_refusal());
        assert_eq!(
            err.to_string(),
            "Message rejected (21211): invalid number"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
