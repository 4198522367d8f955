//! Shared JSON types for the WebOS REST API.
//!
//! This crate is intentionally lightweight (only `serde` + `serde_json`).
//! It defines the request and response bodies of:
//! - `/api/ai` (assistant chat)
//! - `/api/developer` (system info, installed apps, developer actions)
//! - `/api/notifications` (notification feed)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default API listen address
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:19480";

/// Notifications kept by the feed; older ones are dropped
pub const MAX_NOTIFICATIONS: usize = 50;

// ── Assistant ──────────────────────────────────────────────────────

/// Request body for POST /api/ai
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub message: String,
    /// Free-form caller context, currently unused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Response for POST /api/ai
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    pub response: String,
    pub suggestions: Vec<String>,
}

// ── Developer ──────────────────────────────────────────────────────

/// Query for GET /api/developer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeveloperQuery {
    pub endpoint: Option<String>,
}

/// Response for GET /api/developer?endpoint=system-info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub version: String,
    pub platform: String,
    pub capabilities: Vec<String>,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// Response for GET /api/developer?endpoint=apps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApps {
    pub installed_apps: Vec<InstalledApp>,
}

/// Response for GET /api/developer with any other endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIndex {
    pub message: String,
    pub endpoints: Vec<String>,
    pub documentation: String,
}

/// Request body for POST /api/developer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperAction {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Response for the `install-app` action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInstalled {
    pub success: bool,
    pub message: String,
    pub app_id: String,
}

/// Response for the `create-card` action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCreated {
    pub success: bool,
    pub card_id: String,
    pub message: String,
}

// ── Notifications ──────────────────────────────────────────────────

/// A notification in the feed.
///
/// Fields other than the ones below are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// RFC 3339 creation time
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response for GET /api/notifications, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
}

/// Response for POST /api/notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationCreated {
    pub success: bool,
    pub notification: Notification,
}

/// Query for DELETE /api/notifications
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    pub id: Option<String>,
}

// ── Shared ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Generic API error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
