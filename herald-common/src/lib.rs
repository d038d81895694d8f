//! Shared types for the herald SMS composer.
//!
//! This crate holds the pieces that both the composition layer and any
//! transport or queue implementation need to agree on:
//! - [`Message`]: the immutable outbound message value
//! - [`Defaults`]: merge-only per-composer default fields
//! - [`TemplateSource`]: the catalog consulted for default message bodies
//! - [`Transport`]: the collaborator that performs the actual send
//! - error types for templates and transports
//! - tracing/logging initialization

pub mod defaults;
pub mod error;
pub mod logging;
pub mod message;
pub mod template;
pub mod transport;

pub use defaults::Defaults;
pub use error::{TemplateError, TransportError};
pub use message::Message;
pub use template::{StaticCatalog, TemplateSource};
pub use transport::{MockTransport, Receipt, SentSms, Transport};

pub use tracing;
