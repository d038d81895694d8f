//! Merge-only default fields for a composer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default message fields declared on a composer definition.
///
/// Defaults are merge-only: layering one set of defaults on top of
/// another never removes a key, and the later layer wins per key. A
/// composer's defaults are fixed at definition time and handed to each
/// composing instance by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    from: Option<String>,
    callback: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, serde_json::Value>,
}

impl Defaults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default sender.
    #[must_use]
    pub fn sender(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set the default status-callback URL.
    #[must_use]
    pub fn callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    /// Set a free-form default option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Layer `other` on top of `self`, returning the merged defaults.
    ///
    /// Keys present in `other` win; keys absent from `other` keep their
    /// existing value.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut options = self.options.clone();
        options.extend(other.options.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            from: other.from.clone().or_else(|| self.from.clone()),
            callback: other.callback.clone().or_else(|| self.callback.clone()),
            options,
        }
    }

    #[must_use]
    pub fn default_sender(&self) -> Option<&str> {
        self.from.as_deref()
    }

    #[must_use]
    pub fn default_callback(&self) -> Option<&str> {
        self.callback.as_deref()
    }

    #[must_use]
    pub const fn default_options(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_merge_later_layer_wins() {
        let base = Defaults::new()
            .sender("+15550000000")
            .option("tag", json!("base"));
        let layered = base.merge(&Defaults::new().sender("+15551111111"));

        assert_eq!(layered.default_sender(), Some("+15551111111"));
        assert_eq!(layered.default_options().get("tag"), Some(&json!("base")));
    }

    #[test]
    fn test_merge_never_removes_keys() {
        let base = Defaults::new()
            .sender("+15550000000")
            .callback("https://example.com/cb");
        let layered = base.merge(&Defaults::new().option("route", json!("a")));

        assert_eq!(layered.default_sender(), Some("+15550000000"));
        assert_eq!(layered.default_callback(), Some("https://example.com/cb"));
        assert_eq!(layered.default_options().get("route"), Some(&json!("a")));
    }

    #[test]
    fn test_merge_options_extend() {
        let base = Defaults::new().option("a", json!(1)).option("b", json!(2));
        let layered = base.merge(&Defaults::new().option("b", json!(3)));

        assert_eq!(layered.default_options().get("a"), Some(&json!(1)));
        assert_eq!(layered.default_options().get("b"), Some(&json!(3)));
    }
}
