use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use super::error::{bad_request, internal_error, ErrorResponse};
use crate::relay::{Relay, GLOBAL_TOPIC};

#[derive(Clone)]
pub struct DevicesState {
    pub pool: SqlitePool,
    pub relay: Arc<Relay>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterDeviceRequest {
    /// FCM device token
    pub token: String,
    /// Device model (e.g. "iPhone 15")
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterDeviceResponse {
    pub success: bool,
    /// Topics the device was subscribed to
    pub subscribed_topics: Vec<String>,
}

/// Register a device token and subscribe it to the disruption topics.
#[utoipa::path(
    post,
    path = "/api/devices",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Device registered", body = RegisterDeviceResponse),
        (status = 400, description = "Missing device token", body = ErrorResponse),
        (status = 500, description = "Registration failed", body = ErrorResponse)
    ),
    tag = "devices"
)]
pub async fn register_device(
    State(state): State<DevicesState>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<Json<RegisterDeviceResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.token.is_empty() {
        return Err(bad_request("Device token is required"));
    }

    sqlx::query(
        r#"
        INSERT INTO devices (token, device, app_version)
        VALUES (?, ?, ?)
        ON CONFLICT(token) DO UPDATE SET
            device = excluded.device,
            app_version = excluded.app_version,
            updated_at = datetime('now')
        "#,
    )
    .bind(&request.token)
    .bind(request.device.as_deref().unwrap_or("unknown"))
    .bind(request.app_version.as_deref().unwrap_or("unknown"))
    .execute(&state.pool)
    .await
    .map_err(internal_error)?;

    // Subscribe to the global topic plus every known route topic. A failed
    // subscription is logged and skipped; the device row is already stored
    // and re-registration retries the subscriptions.
    let mut topics = vec![GLOBAL_TOPIC.to_string()];
    topics.extend(state.relay.topic_router().route_topics().iter().cloned());

    let mut subscribed_topics = Vec::with_capacity(topics.len());
    for topic in topics {
        match state
            .relay
            .publisher()
            .subscribe_token(&request.token, &topic)
            .await
        {
            Ok(()) => subscribed_topics.push(topic),
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to subscribe device to topic");
            }
        }
    }

    tracing::info!(
        topics = subscribed_topics.len(),
        "Registered push device"
    );

    Ok(Json(RegisterDeviceResponse {
        success: true,
        subscribed_topics,
    }))
}

pub fn router(pool: SqlitePool, relay: Arc<Relay>) -> Router {
    let state = DevicesState { pool, relay };
    Router::new()
        .route("/", post(register_device))
        .with_state(state)
}
