use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::auth::{authenticate, require_admin};
use crate::models::Service;
use crate::state::AppState;

// GET /api/services
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db.lock().unwrap();
    let services = queries::list_services(&db, true)?;
    Ok(Json(services))
}

// GET /api/services/:id
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Service>, AppError> {
    let db = state.db.lock().unwrap();
    let service = queries::get_service(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("service {id} not found")))?;
    Ok(Json(service))
}

// GET /api/admin/services
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let db = state.db.lock().unwrap();
    let services = queries::list_services(&db, false)?;
    Ok(Json(services))
}

#[derive(Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub category: String,
    pub service_type: String,
    #[serde(default = "default_max_participants")]
    pub max_participants: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_max_participants() -> i32 {
    10
}

fn default_true() -> bool {
    true
}

fn validate(body: &ServiceRequest) -> Result<(), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("a service name is required".to_string()));
    }
    if body.price < 0.0 {
        return Err(AppError::Validation(
            "the price cannot be negative".to_string(),
        ));
    }
    if body.duration_minutes <= 0 {
        return Err(AppError::Validation(
            "the duration must be positive".to_string(),
        ));
    }
    if body.max_participants < 1 {
        return Err(AppError::Validation(
            "at least one participant must be allowed".to_string(),
        ));
    }
    Ok(())
}

// POST /api/admin/services
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ServiceRequest>,
) -> Result<Json<Service>, AppError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;
    validate(&body)?;

    let now = Utc::now().naive_utc();
    let service = Service {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        description: body.description,
        price: body.price,
        duration_minutes: body.duration_minutes,
        category: body.category,
        service_type: body.service_type,
        max_participants: body.max_participants,
        is_active: body.is_active,
        created_at: now,
        updated_at: now,
    };

    let db = state.db.lock().unwrap();
    queries::create_service(&db, &service)?;
    tracing::info!(service_id = %service.id, "service created");
    Ok(Json(service))
}

// PUT /api/admin/services/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ServiceRequest>,
) -> Result<Json<Service>, AppError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;
    validate(&body)?;

    let db = state.db.lock().unwrap();
    let existing = queries::get_service(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("service {id} not found")))?;

    let service = Service {
        id: existing.id,
        name: body.name.trim().to_string(),
        description: body.description,
        price: body.price,
        duration_minutes: body.duration_minutes,
        category: body.category,
        service_type: body.service_type,
        max_participants: body.max_participants,
        is_active: body.is_active,
        created_at: existing.created_at,
        updated_at: Utc::now().naive_utc(),
    };
    queries::update_service(&db, &service)?;
    Ok(Json(service))
}

// DELETE /api/admin/services/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let db = state.db.lock().unwrap();
    if !queries::delete_service(&db, &id)? {
        return Err(AppError::NotFound(format!("service {id} not found")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
