//! Shared fixtures for delivery integration tests.
#![allow(dead_code)] // Test utility module - not every helper is used in every test

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use serde_json::json;

use herald_common::{
    Defaults, MockTransport, StaticCatalog, TemplateError, TemplateSource,
};
use herald_delivery::{ComposerDef, DeliveryError, Herald, MemoryQueue, Sms, arg};

/// Template catalog wrapper that counts lookups, so tests can assert
/// that lazy handles never touch the catalog and that memoization only
/// consults it once.
#[derive(Debug)]
pub struct CountingCatalog {
    inner: StaticCatalog,
    lookups: AtomicUsize,
}

impl CountingCatalog {
    pub fn new(inner: StaticCatalog) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl TemplateSource for CountingCatalog {
    fn lookup(
        &self,
        key: &str,
        interpolations: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(key, interpolations)
    }
}

/// The `notifier` composer used throughout the suite.
///
/// `welcome(to, name)` composes a templated message; the body comes from
/// the `notifier.welcome` catalog entry.
pub fn notifier() -> ComposerDef {
    ComposerDef::builder("notifier")
        .default(Defaults::new().sender("+15559990000"))
        .action("welcome", |composing, args| {
            let to: String = arg(args, 0)?;
            let name: String = arg(args, 1)?;
            composing.sms(Sms {
                options: [("name".to_string(), json!(name))].into(),
                ..Sms::to(to)
            })?;
            Ok(())
        })
        .build()
}

/// Like [`notifier`], but with a rescue handler appended; `matched`
/// counts handled errors.
pub fn rescuing_notifier<M>(matcher: M, matched: Arc<AtomicUsize>) -> ComposerDef
where
    M: Fn(&DeliveryError) -> bool + Send + Sync + 'static,
{
    ComposerDef::builder("notifier")
        .default(Defaults::new().sender("+15559990000"))
        .action("welcome", |composing, args| {
            let to: String = arg(args, 0)?;
            let name: String = arg(args, 1)?;
            composing.sms(Sms {
                options: [("name".to_string(), json!(name))].into(),
                ..Sms::to(to)
            })?;
            Ok(())
        })
        .rescue(matcher, move |_| {
            matched.fetch_add(1, Ordering::SeqCst);
        })
        .build()
}

/// A fully wired test environment with observable collaborators.
pub struct TestEnv {
    pub herald: Herald,
    pub transport: Arc<MockTransport>,
    pub queue: Arc<MemoryQueue>,
    pub templates: Arc<CountingCatalog>,
}

/// Wire an environment around the given composer.
pub fn env_with(composer: ComposerDef) -> TestEnv {
    let templates = Arc::new(CountingCatalog::new(
        StaticCatalog::new().with("notifier.welcome", "Welcome aboard, %{name}!"),
    ));
    let transport = MockTransport::shared();
    let queue = Arc::new(MemoryQueue::new());

    let herald = Herald::builder()
        .composer(composer)
        .templates(Arc::clone(&templates) as Arc<dyn TemplateSource>)
        .transport(Arc::clone(&transport) as Arc<dyn herald_common::Transport>)
        .queue(Arc::clone(&queue) as Arc<dyn herald_delivery::Queue>)
        .build();

    TestEnv {
        herald,
        transport,
        queue,
        templates,
    }
}

/// Wire an environment around the plain [`notifier`] composer.
pub fn env() -> TestEnv {
    env_with(notifier())
}
