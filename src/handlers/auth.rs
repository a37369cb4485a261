use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services::lifecycle::Actor;
use crate::state::AppState;

/// Resolves the `Authorization: Bearer <token>` header to a user.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let db = state.db.lock().unwrap();
    queries::get_user_by_token(&db, token)?.ok_or(AppError::Unauthorized)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "administrator access required".to_string(),
        ))
    }
}

pub fn actor(user: &User) -> Actor {
    Actor {
        user_id: user.id.clone(),
        role: user.role,
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return Err(AppError::Validation(
            "first and last name are required".to_string(),
        ));
    }
    if body.password.len() < 6 {
        return Err(AppError::Validation(
            "the password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(e.into()))?;

    let db = state.db.lock().unwrap();
    if queries::get_user_by_email(&db, &email)?.is_some() {
        return Err(AppError::Validation(
            "this email is already registered".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let token = Uuid::new_v4().to_string();
    let user = User {
        id: Uuid::new_v4().to_string(),
        first_name: body.first_name.trim().to_string(),
        last_name: body.last_name.trim().to_string(),
        email,
        phone: body.phone,
        password_hash,
        role: Role::Client,
        api_token: Some(token.clone()),
        created_at: now,
        updated_at: now,
    };
    queries::create_user(&db, &user)?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = body.email.trim().to_lowercase();

    let db = state.db.lock().unwrap();
    let user = queries::get_user_by_email(&db, &email)?.ok_or(AppError::Unauthorized)?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.into()))?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    // a fresh token invalidates the previous session
    let token = Uuid::new_v4().to_string();
    queries::set_api_token(&db, &user.id, &token)?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, AppError> {
    let user = authenticate(&state, &headers)?;
    Ok(Json(UserResponse::from(&user)))
}
