//! The deferred delivery handle.
//!
//! Invoking a composer action does not run it; it returns a
//! [`DeliveryHandle`] bound to (composer, action, arguments). The handle
//! is a two-state wrapper: it starts unprocessed, and the first read of
//! the message (direct, or through a synchronous delivery) runs the
//! action and caches the result. Scheduling later delivery is only legal
//! while unprocessed, because only the arguments cross the job boundary.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use herald_common::{Message, Receipt, TemplateSource, Transport};

use crate::{
    composer::{Composed, ComposerDef},
    error::{ComposeError, DeliveryError},
    job::{DeliveryMethod, JobPayload},
    queue::{JobId, Queue, Schedule},
};

/// Outcome of a synchronous delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The transport accepted the message.
    Sent(Receipt),
    /// The send failed, but a rescue handler on the composer accepted
    /// the error and suppressed it.
    Rescued,
}

impl Delivery {
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    #[must_use]
    pub const fn receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Sent(receipt) => Some(receipt),
            Self::Rescued => None,
        }
    }
}

/// A lazily evaluated, deliver-now-or-later handle on one action
/// invocation.
///
/// Created by [`crate::Herald::compose`]; short-lived, one delivery
/// decision per handle.
pub struct DeliveryHandle {
    composer: Arc<ComposerDef>,
    action: String,
    args: Vec<Value>,
    templates: Arc<dyn TemplateSource>,
    transport: Arc<dyn Transport>,
    queue: Arc<dyn Queue>,
    later_queue: String,
    composed: Option<Composed>,
}

impl std::fmt::Debug for DeliveryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryHandle")
            .field("composer", &self.composer.name())
            .field("action", &self.action)
            .field("processed", &self.processed())
            .finish()
    }
}

impl DeliveryHandle {
    pub(crate) fn new(
        composer: Arc<ComposerDef>,
        action: String,
        args: Vec<Value>,
        templates: Arc<dyn TemplateSource>,
        transport: Arc<dyn Transport>,
        queue: Arc<dyn Queue>,
        later_queue: String,
    ) -> Self {
        Self {
            composer,
            action,
            args,
            templates,
            transport,
            queue,
            later_queue,
            composed: None,
        }
    }

    /// Whether the underlying message has been composed.
    #[must_use]
    pub const fn processed(&self) -> bool {
        self.composed.is_some()
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The composed message.
    ///
    /// The first call runs the action and caches the result; later calls
    /// return the cached message without re-running anything. Reading
    /// the message marks the handle processed, which forbids later
    /// delivery scheduling from then on.
    ///
    /// # Errors
    /// Whatever the action raises while composing.
    pub fn message(&mut self) -> Result<&Message, ComposeError> {
        Ok(self.composed()?.message())
    }

    fn composed(&mut self) -> Result<&Composed, ComposeError> {
        let composed = match self.composed.take() {
            Some(composed) => composed,
            None => self
                .composer
                .process(&self.templates, &self.action, &self.args)?,
        };
        Ok(self.composed.insert(composed))
    }

    /// Compose (if not already composed) and send synchronously, under
    /// the transport's normal delivery policy.
    ///
    /// Transport failures are offered to the composer's rescue chain; a
    /// matched error is suppressed and reported as
    /// [`Delivery::Rescued`]. Composition failures propagate directly.
    ///
    /// # Errors
    /// Unrescued transport failures, or any composition failure.
    pub async fn deliver_now(&mut self) -> Result<Delivery, DeliveryError> {
        self.deliver(DeliveryMethod::Now).await
    }

    /// Like [`DeliveryHandle::deliver_now`], but bypasses the
    /// transport's delivery-permission policy. Use with caution.
    ///
    /// # Errors
    /// Unrescued transport failures, or any composition failure.
    pub async fn deliver_now_unchecked(&mut self) -> Result<Delivery, DeliveryError> {
        self.deliver(DeliveryMethod::NowUnchecked).await
    }

    /// Schedule asynchronous delivery through the job queue; the job
    /// will deliver with [`DeliveryHandle::deliver_now`] semantics.
    ///
    /// Nothing is composed locally: the job carries only the composer
    /// name, action name, delivery method, and original arguments.
    ///
    /// # Errors
    /// [`DeliveryError::UnsafeScheduling`] if the message was already
    /// composed, or a queue error if the submission is rejected.
    pub async fn deliver_later(&self, schedule: Schedule) -> Result<JobId, DeliveryError> {
        self.enqueue(DeliveryMethod::Now, schedule).await
    }

    /// Schedule asynchronous delivery that bypasses the transport's
    /// delivery-permission policy when the job runs.
    ///
    /// # Errors
    /// Same as [`DeliveryHandle::deliver_later`].
    pub async fn deliver_later_unchecked(
        &self,
        schedule: Schedule,
    ) -> Result<JobId, DeliveryError> {
        self.enqueue(DeliveryMethod::NowUnchecked, schedule).await
    }

    async fn deliver(&mut self, method: DeliveryMethod) -> Result<Delivery, DeliveryError> {
        let message = self.composed()?.message().clone();

        let result = match method {
            DeliveryMethod::Now => self.transport.send(&message).await,
            DeliveryMethod::NowUnchecked => self.transport.send_unchecked(&message).await,
        };

        match result {
            Ok(receipt) => {
                info!(
                    composer = self.composer.name(),
                    action = %self.action,
                    to = message.recipient(),
                    "message delivered"
                );
                Ok(Delivery::Sent(receipt))
            }
            Err(transport_error) => {
                let error = DeliveryError::Transport(transport_error);
                if self.composer.handle_error(&error) {
                    warn!(
                        composer = self.composer.name(),
                        action = %self.action,
                        error = %error,
                        "delivery error rescued"
                    );
                    Ok(Delivery::Rescued)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn enqueue(
        &self,
        method: DeliveryMethod,
        schedule: Schedule,
    ) -> Result<JobId, DeliveryError> {
        if self.processed() {
            return Err(DeliveryError::UnsafeScheduling);
        }

        let payload = JobPayload {
            composer: self.composer.name().to_string(),
            action: self.action.clone(),
            delivery_method: method,
            args: self.args.clone(),
        };
        // The later-delivery queue name is resolved now, at submission
        // time, from the environment's current setting
        let schedule = schedule.with_default_queue(&self.later_queue);
        let id = self.queue.submit(payload, &schedule).await?;
        debug!(
            job_id = %id,
            composer = self.composer.name(),
            action = %self.action,
            queue = schedule.queue.as_deref().unwrap_or_default(),
            "delivery job enqueued"
        );
        Ok(id)
    }
}
