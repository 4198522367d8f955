//! Daemon shared state

use crate::notifications::NotificationStore;
use std::time::Duration;

/// Shared state across request handlers (must be Send + Sync for axum)
pub struct DaemonState {
    /// Process-wide notification feed
    pub notifications: NotificationStore,
    /// Simulated assistant processing time
    pub ai_delay: Duration,
}

impl DaemonState {
    pub fn new(notifications: NotificationStore, ai_delay: Duration) -> Self {
        Self {
            notifications,
            ai_delay,
        }
    }
}
