//! Notification value object shared read-only across a batch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Delivery urgency requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
}

/// Message to be pushed to every recipient of a send or batch
///
/// Optional fields fall back to the adapter's configured defaults
/// (app name as title, default sound, default time-to-live, backend priority).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Title shown on Android; defaults to the configured app name
    pub title: Option<String>,
    /// Message body / alert text
    pub body: String,
    /// Custom key-value data delivered alongside the alert
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub sound: Option<String>,
    #[serde(default, with = "optional_secs")]
    pub time_to_live: Option<Duration>,
    /// Explicit badge; when absent the per-recipient unread counter is used
    pub badge: Option<u32>,
    pub priority: Option<Priority>,
}

impl Notification {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Adds a single custom data entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn with_badge(mut self, badge: u32) -> Self {
        self.badge = Some(badge);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Collapse key used by the Google backends to group identical messages
    pub fn collapse_key(&self) -> &str {
        if self.body.is_empty() {
            "(no message)"
        } else {
            &self.body
        }
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collapse_key_falls_back() {
        assert_eq!(Notification::new("").collapse_key(), "(no message)");
        assert_eq!(Notification::new("hello").collapse_key(), "hello");
    }

    #[test]
    fn test_builder_sets_fields() {
        let n = Notification::new("hello")
            .with_title("App")
            .with_data("k", "v")
            .with_sound("ping.caf")
            .with_time_to_live(Duration::from_secs(7200))
            .with_badge(2)
            .with_priority(Priority::High);

        assert_eq!(n.title.as_deref(), Some("App"));
        assert_eq!(n.payload.get("k"), Some(&json!("v")));
        assert_eq!(n.sound.as_deref(), Some("ping.caf"));
        assert_eq!(n.time_to_live, Some(Duration::from_secs(7200)));
        assert_eq!(n.badge, Some(2));
        assert_eq!(n.priority, Some(Priority::High));
    }

    #[test]
    fn test_ttl_serializes_as_seconds() {
        let n = Notification::new("x").with_time_to_live(Duration::from_secs(60));
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["time_to_live"], json!(60));

        let back: Notification = serde_json::from_value(value).unwrap();
        assert_eq!(back.time_to_live, Some(Duration::from_secs(60)));
    }
}
