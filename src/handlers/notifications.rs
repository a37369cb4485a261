use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::auth::authenticate;
use crate::models::Notification;
use crate::state::AppState;

// GET /api/notifications
#[derive(Deserialize)]
pub struct NotificationsQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user = authenticate(&state, &headers)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let db = state.db.lock().unwrap();
    let notifications = queries::list_notifications(&db, &user.id, limit)?;
    Ok(Json(notifications))
}

// PATCH /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = authenticate(&state, &headers)?;

    let db = state.db.lock().unwrap();
    if !queries::mark_notification_read(&db, &id, &user.id)? {
        return Err(AppError::NotFound(format!("notification {id} not found")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
