//! Composer definitions: named actions that build a [`Message`].
//!
//! A [`ComposerDef`] is the explicit equivalent of a "mailer class": a
//! name, a set of merge-only defaults, an action table populated at
//! definition time, and a rescue chain. Invoking an action produces a
//! deferred [`crate::DeliveryHandle`]; running it produces a [`Composed`]
//! instance holding the finished message.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde::de::DeserializeOwned;
use serde_json::Value;

use herald_common::{Defaults, Message, TemplateSource};

use crate::{error::ComposeError, rescue::RescueChain};

/// An action body: decodes its arguments and calls [`Composing::sms`].
pub type ActionFn = Arc<dyn Fn(&mut Composing, &[Value]) -> Result<(), ComposeError> + Send + Sync>;

/// Decode one positional action argument.
///
/// Arguments travel as plain JSON values so they can cross the job
/// boundary; each action decodes the ones it needs. A missing or
/// undecodable argument is reported with its index so that job-level
/// diagnostics can point at the offending position.
///
/// # Errors
/// [`ComposeError::BadArgument`] if the argument is absent or does not
/// decode as `T`.
pub fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T, ComposeError> {
    let value = args.get(index).ok_or_else(|| ComposeError::BadArgument {
        index,
        reason: "missing".to_string(),
    })?;
    serde_json::from_value(value.clone()).map_err(|e| ComposeError::BadArgument {
        index,
        reason: e.to_string(),
    })
}

/// Field arguments for the [`Composing::sms`] primitive.
///
/// `to` is required; everything else falls back to the composer's
/// defaults, and the body additionally falls back to the template
/// catalog under `"<composer>.<action>"`.
#[derive(Debug, Clone, Default)]
pub struct Sms {
    pub to: String,
    pub from: Option<String>,
    pub body: Option<String>,
    pub callback: Option<String>,
    pub options: BTreeMap<String, Value>,
}

impl Sms {
    /// Start from just a recipient.
    #[must_use]
    pub fn to(recipient: impl Into<String>) -> Self {
        Self {
            to: recipient.into(),
            ..Self::default()
        }
    }
}

/// A named composer: defaults, actions, and a rescue chain.
///
/// Definitions are immutable once built and shared behind an `Arc` by
/// every handle and job that references them.
#[derive(Clone)]
pub struct ComposerDef {
    name: String,
    scope: String,
    defaults: Defaults,
    actions: HashMap<String, ActionFn>,
    rescues: RescueChain,
}

impl std::fmt::Debug for ComposerDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposerDef")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("rescues", &self.rescues)
            .finish()
    }
}

impl ComposerDef {
    /// Begin defining a composer. Names may be path-like
    /// (`"account/notifier"`); the template scope replaces `/` with `.`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ComposerBuilder {
        ComposerBuilder {
            name: name.into(),
            defaults: Defaults::new(),
            actions: HashMap::new(),
            rescues: RescueChain::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    #[must_use]
    pub const fn rescues(&self) -> &RescueChain {
        &self.rescues
    }

    /// Offer an error to this composer's rescue chain.
    ///
    /// Returns `true` if a handler accepted it; `false` means the caller
    /// must propagate the error unchanged.
    #[must_use]
    pub fn handle_error(&self, error: &crate::error::DeliveryError) -> bool {
        self.rescues.handle(error)
    }

    /// Whether an action by this name is declared.
    #[must_use]
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Declared action names, unordered.
    #[must_use]
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Run the named action with `args`, producing the composed message.
    ///
    /// This is the only place user code executes: one ephemeral
    /// [`Composing`] instance is created, the action builds the message
    /// through it, and the finished [`Composed`] value is returned.
    ///
    /// # Errors
    /// [`ComposeError::UnknownAction`] if no such action is declared, or
    /// whatever the action itself raises.
    pub fn process(
        &self,
        templates: &Arc<dyn TemplateSource>,
        action: &str,
        args: &[Value],
    ) -> Result<Composed, ComposeError> {
        let run = self
            .actions
            .get(action)
            .ok_or_else(|| ComposeError::UnknownAction {
                composer: self.name.clone(),
                action: action.to_string(),
            })?;

        let mut composing = Composing {
            composer: self.name.clone(),
            action: action.to_string(),
            scope: self.scope.clone(),
            defaults: self.defaults.clone(),
            templates: Arc::clone(templates),
            message: None,
        };
        run(&mut composing, args)?;
        composing.finish()
    }
}

/// Builder for [`ComposerDef`].
pub struct ComposerBuilder {
    name: String,
    defaults: Defaults,
    actions: HashMap<String, ActionFn>,
    rescues: RescueChain,
}

impl ComposerBuilder {
    /// Layer defaults onto the definition. Repeated calls merge; later
    /// calls win per key.
    #[must_use]
    pub fn default(mut self, defaults: Defaults) -> Self {
        self.defaults = self.defaults.merge(&defaults);
        self
    }

    /// Declare an action. Redeclaring a name replaces the previous body.
    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Composing, &[Value]) -> Result<(), ComposeError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(body));
        self
    }

    /// Append a `(matcher, handler)` pair to the rescue chain.
    #[must_use]
    pub fn rescue<M, H>(mut self, matcher: M, handler: H) -> Self
    where
        M: Fn(&crate::error::DeliveryError) -> bool + Send + Sync + 'static,
        H: Fn(&crate::error::DeliveryError) + Send + Sync + 'static,
    {
        self.rescues.push(matcher, handler);
        self
    }

    #[must_use]
    pub fn build(self) -> ComposerDef {
        let scope = self.name.replace('/', ".");
        ComposerDef {
            name: self.name,
            scope,
            defaults: self.defaults,
            actions: self.actions,
            rescues: self.rescues,
        }
    }
}

/// One in-flight action invocation.
///
/// Created by [`ComposerDef::process`], handed to the action body, and
/// discarded once the composed message has been extracted.
pub struct Composing {
    composer: String,
    action: String,
    scope: String,
    defaults: Defaults,
    templates: Arc<dyn TemplateSource>,
    message: Option<Message>,
}

impl Composing {
    /// The action currently being processed.
    #[must_use]
    pub fn action_name(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn composer_name(&self) -> &str {
        &self.composer
    }

    /// Build (or return the already-built) message for this invocation.
    ///
    /// The first call resolves defaults and the template body and
    /// memoizes the result; later calls within the same invocation
    /// return the memoized message and ignore their arguments.
    ///
    /// # Errors
    /// [`ComposeError::MissingSender`] when neither the call nor the
    /// defaults provide a sender, or a template error when the body
    /// falls back to a missing catalog entry.
    pub fn sms(&mut self, sms: Sms) -> Result<&Message, ComposeError> {
        let message = match self.message.take() {
            Some(message) => message,
            None => self.build_message(sms)?,
        };
        Ok(self.message.insert(message))
    }

    fn build_message(&self, sms: Sms) -> Result<Message, ComposeError> {
        let from = sms
            .from
            .or_else(|| self.defaults.default_sender().map(str::to_string))
            .ok_or_else(|| ComposeError::MissingSender {
                composer: self.composer.clone(),
                action: self.action.clone(),
            })?;
        let callback = sms
            .callback
            .or_else(|| self.defaults.default_callback().map(str::to_string));

        let mut options = self.defaults.default_options().clone();
        options.extend(sms.options);

        let body = match sms.body {
            Some(body) => body,
            None => self.default_body(&options)?,
        };

        Ok(Message::new(sms.to, from, body)
            .with_callback(callback)
            .with_options(options))
    }

    /// Look up the default body under `"<scope>.<action>"`.
    fn default_body(&self, options: &BTreeMap<String, Value>) -> Result<String, ComposeError> {
        let key = format!("{}.{}", self.scope, self.action);
        let interpolations = options
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect();
        Ok(self.templates.lookup(&key, &interpolations)?)
    }

    fn finish(self) -> Result<Composed, ComposeError> {
        let message = self.message.ok_or_else(|| ComposeError::NoMessage {
            composer: self.composer.clone(),
            action: self.action.clone(),
        })?;
        Ok(Composed {
            action: self.action,
            message,
        })
    }
}

/// The outcome of processing an action: the finished message, cached by
/// the delivery handle so the action never runs twice.
#[derive(Debug, Clone)]
pub struct Composed {
    action: String,
    message: Message,
}

impl Composed {
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use herald_common::StaticCatalog;

    use super::*;

    fn catalog() -> Arc<dyn TemplateSource> {
        Arc::new(
            StaticCatalog::new()
                .with("notifier.welcome", "Welcome aboard, %{name}!")
                .with("account.notifier.reset", "Reset your password"),
        )
    }

    fn notifier() -> ComposerDef {
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

    #[test]
    fn test_action_composes_with_defaults_and_template() {
        let templates = catalog();
        let composed = notifier()
            .process(&templates, "welcome", &[json!("+15550001111"), json!("Ada")])
            .unwrap();

        let message = composed.message();
        assert_eq!(message.recipient(), "+15550001111");
        assert_eq!(message.sender(), "+15559990000");
        assert_eq!(message.body(), "Welcome aboard, Ada!");
        assert_eq!(composed.action(), "welcome");
    }

    #[test]
    fn test_unknown_action() {
        let templates = catalog();
        let err = notifier()
            .process(&templates, "goodbye", &[])
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownAction { .. }));
    }

    #[test]
    fn test_missing_sender() {
        let templates = catalog();
        let composer = ComposerDef::builder("bare")
            .action("ping", |composing, _| {
                composing.sms(Sms {
                    body: Some("ping".to_string()),
                    ..Sms::to("+15550001111")
                })?;
                Ok(())
            })
            .build();

        let err = composer.process(&templates, "ping", &[]).unwrap_err();
        assert!(matches!(err, ComposeError::MissingSender { .. }));
    }

    #[test]
    fn test_missing_template_when_no_body() {
        let templates = catalog();
        let composer = ComposerDef::builder("notifier")
            .default(Defaults::new().sender("+15559990000"))
            .action("goodbye", |composing, _| {
                composing.sms(Sms::to("+15550001111"))?;
                Ok(())
            })
            .build();

        let err = composer.process(&templates, "goodbye", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template error: Missing template: notifier.goodbye"
        );
    }

    #[test]
    fn test_sms_memoized_per_invocation() {
        let templates = catalog();
        let composer = ComposerDef::builder("notifier")
            .default(Defaults::new().sender("+15559990000"))
            .action("welcome", |composing, _| {
                let first = composing
                    .sms(Sms {
                        body: Some("first".to_string()),
                        ..Sms::to("+15550001111")
                    })?
                    .clone();
                // A second call ignores its arguments and returns the
                // memoized message
                let second = composing
                    .sms(Sms {
                        body: Some("second".to_string()),
                        ..Sms::to("+15550002222")
                    })?
                    .clone();
                assert_eq!(first, second);
                Ok(())
            })
            .build();

        let composed = composer.process(&templates, "welcome", &[]).unwrap();
        assert_eq!(composed.message().body(), "first");
    }

    #[test]
    fn test_action_without_sms_call() {
        let templates = catalog();
        let composer = ComposerDef::builder("notifier")
            .action("noop", |_, _| Ok(()))
            .build();

        let err = composer.process(&templates, "noop", &[]).unwrap_err();
        assert!(matches!(err, ComposeError::NoMessage { .. }));
    }

    #[test]
    fn test_path_like_name_maps_to_dotted_scope() {
        let templates = catalog();
        let composer = ComposerDef::builder("account/notifier")
            .default(Defaults::new().sender("+15559990000"))
            .action("reset", |composing, args| {
                let to: String = arg(args, 0)?;
                composing.sms(Sms::to(to))?;
                Ok(())
            })
            .build();

        let composed = composer
            .process(&templates, "reset", &[json!("+15550001111")])
            .unwrap();
        assert_eq!(composed.message().body(), "Reset your password");
    }

    #[test]
    fn test_builder_defaults_merge() {
        let composer = ComposerDef::builder("notifier")
            .default(Defaults::new().sender("+15550000000").option("tag", json!("a")))
            .default(Defaults::new().sender("+15551111111"))
            .action("noop", |_, _| Ok(()))
            .build();

        assert_eq!(composer.defaults().default_sender(), Some("+15551111111"));
        assert_eq!(
            composer.defaults().default_options().get("tag"),
            Some(&json!("a"))
        );
    }

    #[test]
    fn test_arg_decoding_failures_carry_index() {
        let args = vec![json!("+15550001111"), json!(42)];
        let err = arg::<String>(&args, 1).unwrap_err();
        assert!(matches!(err, ComposeError::BadArgument { index: 1, .. }));

        let err = arg::<String>(&args, 5).unwrap_err();
        assert!(matches!(err, ComposeError::BadArgument { index: 5, .. }));
    }
}
