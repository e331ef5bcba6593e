use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::{
    auth::auth_context,
    error::AppError,
    models::{ActivitiesBody, ConnectionsBody, ProfileRecord, StatusBody, UserSummary},
    presence::PresenceUpdate,
    state::AppState,
};

pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ProfileRecord>, AppError> {
    let auth = auth_context(&state, &headers);

    state
        .pipeline
        .profile(&id, auth.as_ref())
        .await
        .map(Json)
        .map_err(|e| e.for_mode(state.config.production))
}

pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusBody>, AppError> {
    state
        .pipeline
        .status(&id)
        .await
        .map(|status| Json(StatusBody { status }))
        .map_err(|e| e.for_mode(state.config.production))
}

pub async fn presence_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivitiesBody>, AppError> {
    state
        .pipeline
        .presence(&id)
        .await
        .map(|activities| Json(ActivitiesBody { activities }))
        .map_err(|e| e.for_mode(state.config.production))
}

pub async fn connections_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ConnectionsBody>, AppError> {
    let auth = auth_context(&state, &headers);

    state
        .pipeline
        .connections(&id, auth.as_ref())
        .await
        .map(|connections| Json(ConnectionsBody { connections }))
        .map_err(|e| e.for_mode(state.config.production))
}

pub async fn user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UserSummary>, AppError> {
    let auth = auth_context(&state, &headers);

    state
        .pipeline
        .user(&id, auth.as_ref())
        .await
        .map(Json)
        .map_err(|e| e.for_mode(state.config.production))
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Callers are not authenticated. Anything shaped like a presence update is
/// forwarded to the presence store, everything is kept as the last payload.
pub async fn webhook_handler(State(state): State<Arc<AppState>>, Json(payload): Json<Value>) -> impl IntoResponse {
    info!("Received webhook data");
    debug!("Webhook payload: {payload}");

    let event = serde_json::from_value::<PresenceUpdate>(payload.clone())
        .ok()
        .and_then(PresenceUpdate::into_event);

    if let Some(event) = event {
        match state.presence_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Presence channel full, dropping update for {}", event.user_id);
            }
            Err(TrySendError::Closed(_)) => warn!("Presence ingest is not running"),
        }
    }

    *state.last_webhook.write().await = Some(payload);

    (StatusCode::OK, "Webhook received")
}

pub async fn webhook_profile_handler(State(state): State<Arc<AppState>>) -> Json<Option<Value>> {
    Json(state.last_webhook.read().await.clone())
}
