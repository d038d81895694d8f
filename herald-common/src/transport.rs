//! The transport collaborator that performs the actual send.
//!
//! Wire protocols are out of scope for this workspace; production
//! transports live in their own crates and implement [`Transport`].
//! [`MockTransport`] is the in-memory implementation used by tests and
//! development environments.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::{error::TransportError, message::Message};

/// Acknowledgement returned by a transport for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unix timestamp at which the transport accepted the message.
    pub accepted_at: u64,
    /// Provider-assigned message id, when one is available.
    pub provider_id: Option<String>,
}

impl Receipt {
    /// Create a receipt stamped with the current time.
    #[must_use]
    pub fn now(provider_id: Option<String>) -> Self {
        let accepted_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            accepted_at,
            provider_id,
        }
    }
}

/// Performs the network send of a composed [`Message`].
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a message, subject to the transport's delivery policy
    /// (deliveries may be disabled, messages may be validated, etc).
    ///
    /// # Errors
    /// Any [`TransportError`], including policy refusals.
    async fn send(&self, message: &Message) -> Result<Receipt, TransportError>;

    /// Send a message, bypassing the transport's delivery-permission
    /// policy. Network and provider failures still surface.
    ///
    /// # Errors
    /// Any [`TransportError`] other than a policy refusal.
    async fn send_unchecked(&self, message: &Message) -> Result<Receipt, TransportError>;
}

/// A message captured by [`MockTransport`], with how it was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SentSms {
    pub message: Message,
    /// `false` when the message went through `send_unchecked`.
    pub checked: bool,
}

/// Mock implementation of [`Transport`] for testing.
///
/// Records every sent message, supports scripted failures, and models
/// the delivery-permission policy that `send_unchecked` bypasses.
#[derive(Debug)]
pub struct MockTransport {
    sent: Mutex<Vec<SentSms>>,
    failures: Mutex<VecDeque<TransportError>>,
    deliveries_enabled: AtomicBool,
    counter: AtomicUsize,
    notify: Notify,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            deliveries_enabled: AtomicBool::new(true),
            counter: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Shared handle, the form collaborator wiring expects.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Enable or disable deliveries. While disabled, `send` fails with a
    /// policy refusal; `send_unchecked` still goes through.
    pub fn set_deliveries_enabled(&self, enabled: bool) {
        self.deliveries_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Script the next send to fail with `error`. Scripted failures are
    /// consumed in order by both send variants.
    ///
    /// # Panics
    /// Panics if the failure mutex is poisoned.
    pub fn fail_next(&self, error: TransportError) {
        self.failures
            .lock()
            .expect("MockTransport failures mutex poisoned")
            .push_back(error);
    }

    /// All messages sent so far.
    ///
    /// # Panics
    /// Panics if the sent mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<SentSms> {
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .clone()
    }

    /// Number of messages sent so far.
    ///
    /// # Panics
    /// Panics if the sent mutex is poisoned.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .len()
    }

    /// Clear the record of sent messages.
    ///
    /// # Panics
    /// Panics if the sent mutex is poisoned.
    pub fn clear(&self) {
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .clear();
    }

    /// Wait until at least `expected` messages have been sent.
    ///
    /// # Errors
    /// Returns an error if the timeout elapses first.
    pub async fn wait_for_count(
        &self,
        expected: usize,
        timeout: std::time::Duration,
    ) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, async {
            loop {
                if self.sent_count() >= expected {
                    return;
                }
                self.notify.notified().await;
            }
        })
        .await
    }

    fn take_failure(&self) -> Option<TransportError> {
        self.failures
            .lock()
            .expect("MockTransport failures mutex poisoned")
            .pop_front()
    }

    fn record(&self, message: &Message, checked: bool) -> Receipt {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .push(SentSms {
                message: message.clone(),
                checked,
            });
        self.notify.notify_waiters();
        Receipt::now(Some(format!("mock-{n}")))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, message: &Message) -> Result<Receipt, TransportError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        if !self.deliveries_enabled.load(Ordering::SeqCst) {
            return Err(TransportError::Refused(
                "deliveries are disabled".to_string(),
            ));
        }
        Ok(self.record(message, true))
    }

    async fn send_unchecked(&self, message: &Message) -> Result<Receipt, TransportError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(self.record(message, false))
    }
}
