//! HTTP REST endpoints
//!
//! Request bodies are parsed from raw bytes so malformed input gets the
//! endpoint's own error message instead of axum's rejection.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webos_protocol::{
    AiRequest, AiResponse, ApiError, DeveloperAction, DeveloperQuery, NotificationCreated,
    NotificationList, NotificationQuery, SuccessResponse,
};

use crate::assistant;
use crate::developer::{self, ActionOutcome, DeveloperInfo};
use crate::state::DaemonState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, error: &str) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError::new(error)))
}

/// POST /api/ai
pub async fn post_ai(State(state): State<Arc<DaemonState>>, body: Bytes) -> ApiResult<AiResponse> {
    let request: AiRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected assistant request: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process AI request")
    })?;

    tokio::time::sleep(state.ai_delay).await;
    let intent = assistant::classify(&request.message);
    debug!("Assistant request classified as {:?}", intent);
    Ok(Json(assistant::respond(&request.message)))
}

/// GET /api/developer
pub async fn get_developer(Query(query): Query<DeveloperQuery>) -> Json<DeveloperInfo> {
    Json(developer::describe(query.endpoint.as_deref()))
}

/// POST /api/developer
pub async fn post_developer(body: Bytes) -> ApiResult<ActionOutcome> {
    let request: DeveloperAction = serde_json::from_slice(&body)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid request"))?;

    match developer::perform(&request, Utc::now().timestamp_millis()) {
        Ok(outcome) => {
            info!("Developer action {} done", request.action);
            Ok(Json(outcome))
        }
        Err(e) => {
            warn!("Developer action {} failed: {}", request.action, e.message());
            Err(api_error(StatusCode::BAD_REQUEST, e.message()))
        }
    }
}

/// GET /api/notifications
pub async fn get_notifications(State(state): State<Arc<DaemonState>>) -> Json<NotificationList> {
    Json(NotificationList {
        notifications: state.notifications.list(),
    })
}

/// POST /api/notifications
pub async fn post_notification(
    State(state): State<Arc<DaemonState>>,
    body: Bytes,
) -> ApiResult<NotificationCreated> {
    let invalid = || api_error(StatusCode::BAD_REQUEST, "Invalid notification data");
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|_| invalid())?;
    let notification = state
        .notifications
        .create(value, Utc::now())
        .ok_or_else(invalid)?;

    info!(
        "Notification {} added ({} stored)",
        notification.id,
        state.notifications.len()
    );
    Ok(Json(NotificationCreated {
        success: true,
        notification,
    }))
}

/// DELETE /api/notifications?id=
pub async fn delete_notification(
    State(state): State<Arc<DaemonState>>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<SuccessResponse> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Notification ID required"))?;

    let removed = state.notifications.remove(&id);
    debug!("Removed {} notification(s) with id {}", removed, id);
    Ok(Json(SuccessResponse { success: true }))
}
