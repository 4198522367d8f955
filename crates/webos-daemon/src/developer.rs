//! Developer API: platform description and developer actions

use serde::Serialize;
use webos_protocol::{
    ApiIndex, AppInstalled, CardCreated, DeveloperAction, InstalledApp, InstalledApps, SystemInfo,
};

/// Body of GET /api/developer
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DeveloperInfo {
    System(SystemInfo),
    Apps(InstalledApps),
    Index(ApiIndex),
}

/// Body of a successful POST /api/developer
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    AppInstalled(AppInstalled),
    CardCreated(CardCreated),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// Action name not recognized
    Unknown,
    /// Action recognized but its data is unusable
    Invalid,
}

impl ActionError {
    pub fn message(self) -> &'static str {
        match self {
            ActionError::Unknown => "Unknown action",
            ActionError::Invalid => "Invalid request",
        }
    }
}

pub fn describe(endpoint: Option<&str>) -> DeveloperInfo {
    match endpoint {
        Some("system-info") => DeveloperInfo::System(SystemInfo {
            version: "1.0.0".into(),
            platform: "WebOS AI".into(),
            capabilities: [
                "AI Integration",
                "Card-based UI",
                "Dynamic Glass Effects",
                "Privacy-first Architecture",
                "Cross-platform Compatibility",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            api_version: "1.0".into(),
        }),
        Some("apps") => DeveloperInfo::Apps(InstalledApps {
            installed_apps: [("mail", "Mail"), ("notes", "Notes"), ("calculator", "Calculator")]
                .iter()
                .map(|(id, name)| InstalledApp {
                    id: id.to_string(),
                    name: name.to_string(),
                    version: "1.0.0".into(),
                })
                .collect(),
        }),
        _ => DeveloperInfo::Index(ApiIndex {
            message: "WebOS Developer API".into(),
            endpoints: [
                "/api/developer?endpoint=system-info",
                "/api/developer?endpoint=apps",
                "/api/ai (POST)",
                "/api/notifications (GET/POST)",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
            documentation: "https://webos-ai.dev/docs".into(),
        }),
    }
}

/// Run a developer action. `now_ms` stamps generated ids.
pub fn perform(request: &DeveloperAction, now_ms: i64) -> Result<ActionOutcome, ActionError> {
    match request.action.as_str() {
        "install-app" => {
            let name = request
                .data
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or(ActionError::Invalid)?;
            Ok(ActionOutcome::AppInstalled(AppInstalled {
                success: true,
                message: format!("App {} installed successfully", name),
                app_id: format!("app_{}", now_ms),
            }))
        }
        "create-card" => Ok(ActionOutcome::CardCreated(CardCreated {
            success: true,
            card_id: format!("card_{}", now_ms),
            message: "Card created successfully".into(),
        })),
        _ => Err(ActionError::Unknown),
    }
}
