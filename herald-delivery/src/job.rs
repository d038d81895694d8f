//! The delivery job executed by queue workers.
//!
//! A job carries the minimum needed to recreate the delivery in another
//! process: composer name, action name, delivery method, and the
//! original arguments. The executor reconstructs the handle from the
//! environment's registry and re-invokes the requested delivery.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::{
    error::DeliveryError,
    handle::Delivery,
    herald::Herald,
};

/// Which synchronous delivery the job performs when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryMethod {
    #[serde(rename = "deliver_now")]
    Now,
    #[serde(rename = "deliver_now_unchecked")]
    NowUnchecked,
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Now => f.write_str("deliver_now"),
            Self::NowUnchecked => f.write_str("deliver_now_unchecked"),
        }
    }
}

/// The serialized unit of work submitted to the queue.
///
/// This is the *only* state crossing the asynchronous boundary, which is
/// why a handle refuses to schedule once its message has been composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub composer: String,
    pub action: String,
    pub delivery_method: DeliveryMethod,
    pub args: Vec<Value>,
}

/// Executor for queued delivery jobs.
pub struct DeliveryJob;

impl DeliveryJob {
    /// Execute one job from its queue-transportable form.
    ///
    /// Any error escaping execution is offered to the originating
    /// composer's rescue chain. The composer is resolved from the raw
    /// value alone, so class-level rescue still runs when later payload
    /// fields fail to decode; if even the composer name cannot be
    /// recovered, the original error propagates to the queue's own
    /// failure handling.
    ///
    /// # Errors
    /// The original execution error, when no rescue handler matched.
    pub async fn perform(env: &Herald, raw: Value) -> Result<Delivery, DeliveryError> {
        match Self::execute(env, &raw).await {
            Ok(delivery) => Ok(delivery),
            Err(err) => {
                if let Some(composer) = Self::composer_from_raw(env, &raw)
                    && composer.handle_error(&err)
                {
                    return Ok(Delivery::Rescued);
                }
                error!(error = %err, "delivery job failed");
                Err(err)
            }
        }
    }

    async fn execute(env: &Herald, raw: &Value) -> Result<Delivery, DeliveryError> {
        let payload: JobPayload = serde_json::from_value(raw.clone())
            .map_err(|e| DeliveryError::Payload(e.to_string()))?;

        let mut handle = env.compose(&payload.composer, &payload.action, payload.args)?;
        match payload.delivery_method {
            DeliveryMethod::Now => handle.deliver_now().await,
            DeliveryMethod::NowUnchecked => handle.deliver_now_unchecked().await,
        }
    }

    /// Recover the composer definition from the raw payload by name
    /// only, tolerating an otherwise undecodable payload.
    fn composer_from_raw(
        env: &Herald,
        raw: &Value,
    ) -> Option<std::sync::Arc<crate::composer::ComposerDef>> {
        raw.get("composer")
            .and_then(Value::as_str)
            .and_then(|name| env.composer(name))
    }
}
