//! The delivery environment: composer registry plus collaborators.
//!
//! A [`Herald`] wires together everything a delivery decision needs: the
//! registered composer definitions, the template catalog, the transport,
//! and the job queue. Handles produced by [`Herald::compose`] carry
//! shared references to these collaborators, and queue workers hand raw
//! job payloads back through [`Herald::run_job`].

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use herald_common::{MockTransport, StaticCatalog, TemplateSource, Transport};

use crate::{
    composer::ComposerDef,
    error::{ComposeError, DeliveryError},
    handle::{Delivery, DeliveryHandle},
    job::DeliveryJob,
    queue::{MemoryQueue, Queue},
};

/// Queue name used for later delivery when the caller does not pick one.
pub const DEFAULT_LATER_QUEUE: &str = "herald";

/// The assembled delivery environment.
#[derive(Debug, Clone)]
pub struct Herald {
    composers: Arc<HashMap<String, Arc<ComposerDef>>>,
    templates: Arc<dyn TemplateSource>,
    transport: Arc<dyn Transport>,
    queue: Arc<dyn Queue>,
    later_queue: String,
}

impl Herald {
    #[must_use]
    pub fn builder() -> HeraldBuilder {
        HeraldBuilder::default()
    }

    /// Look up a registered composer definition by name.
    #[must_use]
    pub fn composer(&self, name: &str) -> Option<Arc<ComposerDef>> {
        self.composers.get(name).cloned()
    }

    /// Invoke an action, returning an unprocessed [`DeliveryHandle`].
    ///
    /// No user code runs here: the composer and action names are merely
    /// validated against the registry, and the arguments are captured
    /// for later.
    ///
    /// # Errors
    /// [`ComposeError::UnknownComposer`] or
    /// [`ComposeError::UnknownAction`].
    pub fn compose(
        &self,
        composer: &str,
        action: &str,
        args: Vec<Value>,
    ) -> Result<DeliveryHandle, ComposeError> {
        let composer = self
            .composer(composer)
            .ok_or_else(|| ComposeError::UnknownComposer(composer.to_string()))?;
        if !composer.has_action(action) {
            return Err(ComposeError::UnknownAction {
                composer: composer.name().to_string(),
                action: action.to_string(),
            });
        }

        Ok(DeliveryHandle::new(
            composer,
            action.to_string(),
            args,
            Arc::clone(&self.templates),
            Arc::clone(&self.transport),
            Arc::clone(&self.queue),
            self.later_queue.clone(),
        ))
    }

    /// Execute one queued job from its queue-transportable form.
    ///
    /// This is the entry point a queue worker calls with a payload it
    /// previously received through [`Queue::submit`].
    ///
    /// # Errors
    /// The job's execution error when no rescue handler matched.
    pub async fn run_job(&self, raw: Value) -> Result<Delivery, DeliveryError> {
        DeliveryJob::perform(self, raw).await
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    #[must_use]
    pub fn queue(&self) -> Arc<dyn Queue> {
        Arc::clone(&self.queue)
    }

    #[must_use]
    pub fn templates(&self) -> Arc<dyn TemplateSource> {
        Arc::clone(&self.templates)
    }

    /// The queue name later deliveries default to.
    #[must_use]
    pub fn later_queue(&self) -> &str {
        &self.later_queue
    }
}

/// Builder for [`Herald`].
///
/// Collaborators left unset fall back to the in-memory implementations
/// ([`StaticCatalog`], [`MockTransport`], [`MemoryQueue`]), which suits
/// tests and development; production wiring passes its own.
#[derive(Default)]
pub struct HeraldBuilder {
    composers: HashMap<String, Arc<ComposerDef>>,
    templates: Option<Arc<dyn TemplateSource>>,
    transport: Option<Arc<dyn Transport>>,
    queue: Option<Arc<dyn Queue>>,
    later_queue: Option<String>,
}

impl HeraldBuilder {
    /// Register a composer definition. Registering the same name twice
    /// replaces the earlier definition.
    #[must_use]
    pub fn composer(mut self, def: ComposerDef) -> Self {
        self.composers.insert(def.name().to_string(), Arc::new(def));
        self
    }

    #[must_use]
    pub fn templates(mut self, templates: Arc<dyn TemplateSource>) -> Self {
        self.templates = Some(templates);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the queue name later deliveries default to.
    #[must_use]
    pub fn later_queue(mut self, name: impl Into<String>) -> Self {
        self.later_queue = Some(name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Herald {
        Herald {
            composers: Arc::new(self.composers),
            templates: self
                .templates
                .unwrap_or_else(|| Arc::new(StaticCatalog::new())),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(MockTransport::new())),
            queue: self.queue.unwrap_or_else(|| Arc::new(MemoryQueue::new())),
            later_queue: self
                .later_queue
                .unwrap_or_else(|| DEFAULT_LATER_QUEUE.to_string()),
        }
    }
}
