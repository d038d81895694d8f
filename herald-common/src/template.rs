//! The template catalog consulted for default message bodies.
//!
//! When an action does not supply an explicit body, the composing layer
//! looks one up under the key `"<composer>.<action>"`. The catalog
//! format itself is out of scope; [`StaticCatalog`] is the in-memory
//! implementation used for development and tests.

use std::collections::{BTreeMap, HashMap};

use crate::error::TemplateError;

/// Source of message-body templates, keyed by `"<composer>.<action>"`.
pub trait TemplateSource: Send + Sync + std::fmt::Debug {
    /// Look up the template under `key` and render it with the given
    /// interpolations.
    ///
    /// # Errors
    /// [`TemplateError::Missing`] if no template is registered for `key`.
    fn lookup(
        &self,
        key: &str,
        interpolations: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError>;
}

/// An in-memory template catalog.
///
/// Templates may reference interpolations as `%{name}`; placeholders
/// without a matching interpolation are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    templates: HashMap<String, String>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any existing one under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateSource for StaticCatalog {
    fn lookup(
        &self,
        key: &str,
        interpolations: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        self.templates
            .get(key)
            .map(|template| interpolate(template, interpolations))
            .ok_or_else(|| TemplateError::Missing(key.to_string()))
    }
}

/// Substitute `%{name}` placeholders from `vars`.
fn interpolate(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            // Unterminated placeholder, emit verbatim
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &rest[start..=start + end];
        let name = &rest[start + 2..start + end];
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(placeholder),
        }
        rest = &rest[start + end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_renders_interpolations() {
        let catalog = StaticCatalog::new().with("notifier.welcome", "Welcome, %{name}!");
        let body = catalog
            .lookup("notifier.welcome", &vars(&[("name", "Ada")]))
            .unwrap();
        assert_eq!(body, "Welcome, Ada!");
    }

    #[test]
    fn test_lookup_missing_key() {
        let catalog = StaticCatalog::new();
        let err = catalog
            .lookup("notifier.welcome", &BTreeMap::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing template: notifier.welcome");
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let catalog = StaticCatalog::new().with("k", "Hi %{name}, code %{code}");
        let body = catalog.lookup("k", &vars(&[("name", "Ada")])).unwrap();
        assert_eq!(body, "Hi Ada, code %{code}");
    }

    #[test]
    fn test_unterminated_placeholder_emitted_verbatim() {
        let catalog = StaticCatalog::new().with("k", "oops %{name");
        let body = catalog.lookup("k", &vars(&[("name", "Ada")])).unwrap();
        assert_eq!(body, "oops %{name");
    }

    #[test]
    fn test_adjacent_placeholders() {
        let catalog = StaticCatalog::new().with("k", "%{a}%{b}");
        let body = catalog.lookup("k", &vars(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(body, "12");
    }
}
