use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{bad_request, internal_error, ErrorResponse};
use crate::relay::Relay;

#[derive(Clone)]
pub struct NotificationsState {
    pub relay: Arc<Relay>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TestNotificationRequest {
    /// FCM device token to send the test message to
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestNotificationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Send a test notification to a single device token.
#[utoipa::path(
    post,
    path = "/api/notifications/test",
    request_body = TestNotificationRequest,
    responses(
        (status = 200, description = "Test notification sent", body = TestNotificationResponse),
        (status = 400, description = "Missing device token", body = ErrorResponse),
        (status = 500, description = "Push backend rejected the send", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn send_test_notification(
    State(state): State<NotificationsState>,
    Json(request): Json<TestNotificationRequest>,
) -> Result<Json<TestNotificationResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.token.is_empty() {
        return Err(bad_request("Device token is required"));
    }

    let message_id = state
        .relay
        .publisher()
        .send_to_token(
            &request.token,
            "Test Notification",
            "This is a test notification from the Metro disruption relay",
        )
        .await
        .map_err(internal_error)?;

    Ok(Json(TestNotificationResponse {
        success: true,
        message_id,
    }))
}

pub fn router(relay: Arc<Relay>) -> Router {
    let state = NotificationsState { relay };
    Router::new()
        .route("/test", post(send_test_notification))
        .with_state(state)
}
