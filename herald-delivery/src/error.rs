//! Typed error handling for composition and delivery.
//!
//! The top-level [`DeliveryError`] distinguishes between:
//! - Composition failures - the action could not produce a message
//! - Transport failures - the send itself failed
//! - Queue failures - the job could not be submitted
//! - Usage errors - the caller misused the API; never rescued

use thiserror::Error;

use herald_common::{TemplateError, TransportError};

/// Errors raised while running a composer action.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// No composer is registered under this name.
    #[error("Unknown composer: {0}")]
    UnknownComposer(String),

    /// The composer defines no action by this name.
    #[error("Composer {composer} has no action named {action}")]
    UnknownAction { composer: String, action: String },

    /// The action gave no sender and the composer declares no default.
    #[error("No sender for {composer}.{action}: pass `from` or declare a composer default")]
    MissingSender { composer: String, action: String },

    /// The action returned without composing a message.
    #[error("Action {composer}.{action} completed without composing a message")]
    NoMessage { composer: String, action: String },

    /// Default-body lookup failed.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// An action argument could not be decoded.
    #[error("Invalid action argument {index}: {reason}")]
    BadArgument { index: usize, reason: String },
}

/// Errors raised while submitting work to the job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue rejected the submission.
    #[error("Failed to submit job: {0}")]
    Submit(String),

    /// The queue is shut down.
    #[error("Queue is closed")]
    Closed,
}

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The composer action failed before a message existed.
    #[error("Compose failure: {0}")]
    Compose(#[from] ComposeError),

    /// The transport failed to send the composed message.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The job queue refused the submission.
    #[error("Queue failure: {0}")]
    Queue(#[from] QueueError),

    /// Later delivery was requested on a handle whose message was
    /// already composed. Only the action arguments cross the job
    /// boundary, so anything derived from the composed message would be
    /// silently lost; this is rejected loudly instead.
    #[error(
        "message accessed before scheduling later delivery; only the action arguments are \
         carried by the job, so local changes would be lost. Do not touch the message before \
         deliver_later, compose it entirely within the action, or deliver synchronously"
    )]
    UnsafeScheduling,

    /// A job payload could not be decoded.
    #[error("Malformed job payload: {0}")]
    Payload(String),
}

impl DeliveryError {
    /// Returns `true` if this is a caller usage error. Usage errors are
    /// surfaced immediately and never offered to a rescue chain.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::UnsafeScheduling)
    }

    /// Returns `true` if the failure happened in the transport.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if the failure happened while composing.
    #[must_use]
    pub const fn is_compose(&self) -> bool {
        matches!(self, Self::Compose(_))
    }
}
