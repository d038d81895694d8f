//! Deferred composition and delivery of outbound SMS messages.
//!
//! This crate provides:
//! - Composer definitions with named actions ([`ComposerDef`])
//! - The lazy, two-state [`DeliveryHandle`] returned by invoking an
//!   action, with deliver-now and deliver-later variants
//! - The [`DeliveryJob`] executor that reconstructs a delivery from its
//!   serialized arguments inside a queue worker
//! - The [`RescueChain`] consulted by both the synchronous path and the
//!   job executor
//! - The [`Queue`] collaborator interface and an in-memory queue

mod composer;
mod error;
mod handle;
mod herald;
mod job;
pub mod queue;
mod rescue;

pub use composer::{ActionFn, Composed, ComposerBuilder, ComposerDef, Composing, Sms, arg};
pub use error::{ComposeError, DeliveryError, QueueError};
pub use handle::{Delivery, DeliveryHandle};
pub use herald::{DEFAULT_LATER_QUEUE, Herald, HeraldBuilder};
pub use job::{DeliveryJob, DeliveryMethod, JobPayload};
pub use queue::{JobId, MemoryQueue, Queue, Schedule, SubmittedJob};
pub use rescue::{Handler, Matcher, RescueChain};

// Re-export the shared types callers need alongside this crate
pub use herald_common::{Defaults, Message, Receipt, StaticCatalog, TemplateSource, Transport};
