//! The outbound message value object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A fully composed outbound SMS message.
///
/// A `Message` is immutable once built: every field is set during
/// construction and only exposed through read accessors. The composing
/// layer owns construction; transports receive the finished value and
/// must not mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    to: String,
    from: String,
    body: String,
    callback: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, serde_json::Value>,
}

impl Message {
    /// Create a message with the three required fields.
    ///
    /// Optional fields are attached with [`Message::with_callback`] and
    /// [`Message::with_options`] before the value is handed out.
    #[must_use]
    pub fn new(to: impl Into<String>, from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            body: body.into(),
            callback: None,
            options: BTreeMap::new(),
        }
    }

    /// Attach a status-callback URL.
    #[must_use]
    pub fn with_callback(mut self, callback: Option<String>) -> Self {
        self.callback = callback;
        self
    }

    /// Attach free-form options (provider hints, tags, etc).
    #[must_use]
    pub fn with_options(mut self, options: BTreeMap<String, serde_json::Value>) -> Self {
        self.options = options;
        self
    }

    /// The recipient phone number.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.to
    }

    /// The sender phone number or alphanumeric id.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.from
    }

    /// The message body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The status-callback URL, if any.
    #[must_use]
    pub fn callback(&self) -> Option<&str> {
        self.callback.as_deref()
    }

    /// Free-form options attached at composition time.
    #[must_use]
    pub const fn options(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_accessors() {
        let message = Message::new("+15550001111", "+15559990000", "hello")
            .with_callback(Some("https://example.com/status".to_string()));

        assert_eq!(message.recipient(), "+15550001111");
        assert_eq!(message.sender(), "+15559990000");
        assert_eq!(message.body(), "hello");
        assert_eq!(message.callback(), Some("https://example.com/status"));
        assert!(message.options().is_empty());
    }

    #[test]
    fn test_message_serde_round_trip() {
        let mut options = BTreeMap::new();
        options.insert("tag".to_string(), json!("welcome"));

        let message = Message::new("+15550001111", "+15559990000", "hello").with_options(options);

        let encoded = serde_json::to_value(&message).unwrap();
        let decoded: Message = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_message_equality_covers_all_fields() {
        let a = Message::new("+1", "+2", "body");
        let b = Message::new("+1", "+2", "body").with_callback(Some("cb".to_string()));
        assert_ne!(a, b);
    }
}
