//! Notification feed

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use webos_protocol::{Notification, MAX_NOTIFICATIONS};

/// Newest-first notification list, capped at `MAX_NOTIFICATIONS`
pub struct NotificationStore {
    items: Mutex<Vec<Notification>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Store holding the assistant's welcome notification
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let store = Self::new();
        store.push(Notification {
            id: "1".into(),
            kind: Some("ai".into()),
            title: Some("AI Assistant Ready".into()),
            message: Some("Your AI assistant is ready to help with tasks and questions.".into()),
            timestamp: timestamp(now),
            extra: Map::new(),
        });
        store
    }

    pub fn list(&self) -> Vec<Notification> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Add at the front, dropping the oldest beyond the cap
    pub fn push(&self, notification: Notification) {
        let mut items = self.items.lock();
        items.insert(0, notification);
        items.truncate(MAX_NOTIFICATIONS);
    }

    /// Build a notification from a request body and add it.
    ///
    /// `id` and `timestamp` default to `now` but fields in the body win.
    /// Returns `None` if the body is not an object or has unusable fields.
    pub fn create(&self, body: Value, now: DateTime<Utc>) -> Option<Notification> {
        let Value::Object(mut fields) = body else {
            return None;
        };
        fields
            .entry("id")
            .or_insert_with(|| Value::String(now.timestamp_millis().to_string()));
        fields
            .entry("timestamp")
            .or_insert_with(|| Value::String(timestamp(now)));

        let notification: Notification = serde_json::from_value(Value::Object(fields)).ok()?;
        self.push(notification.clone());
        Some(notification)
    }

    /// Remove every notification with `id`. Returns how many were removed.
    pub fn remove(&self, id: &str) -> usize {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|n| n.id != id);
        before - items.len()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
