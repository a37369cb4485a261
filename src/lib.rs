pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        // auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))
        // services
        .route("/api/services", get(handlers::services::list_active))
        .route("/api/services/:id", get(handlers::services::get_one))
        .route("/api/admin/services", get(handlers::services::list_all))
        .route("/api/admin/services", post(handlers::services::create))
        .route("/api/admin/services/:id", put(handlers::services::update))
        .route(
            "/api/admin/services/:id",
            delete(handlers::services::delete),
        )
        // bookings
        .route("/api/bookings", post(handlers::bookings::create))
        .route("/api/bookings/my", get(handlers::bookings::my_bookings))
        .route(
            "/api/bookings/available-slots",
            get(handlers::bookings::available_slots),
        )
        .route(
            "/api/bookings/check-availability",
            get(handlers::bookings::check_availability),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_one))
        .route("/api/bookings/:id", put(handlers::bookings::update))
        .route("/api/bookings/:id", delete(handlers::bookings::delete))
        .route(
            "/api/bookings/:id/cancel",
            patch(handlers::bookings::cancel),
        )
        // admin booking management
        .route("/api/admin/bookings", get(handlers::bookings::list_all))
        .route(
            "/api/admin/bookings/:id/accept",
            patch(handlers::bookings::accept),
        )
        .route(
            "/api/admin/bookings/:id/reject",
            patch(handlers::bookings::reject),
        )
        .route(
            "/api/admin/bookings/:id/start",
            patch(handlers::bookings::start),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            patch(handlers::bookings::complete),
        )
        .route(
            "/api/admin/bookings/:id/no-show",
            patch(handlers::bookings::no_show),
        )
        .route("/api/admin/stats", get(handlers::bookings::booking_stats))
        // payments
        .route(
            "/api/payments/create-checkout-session",
            post(handlers::payments::create_checkout_session),
        )
        .route(
            "/api/payments/verify/:session_id",
            get(handlers::payments::verify_session),
        )
        // notifications
        .route("/api/notifications", get(handlers::notifications::list))
        .route(
            "/api/notifications/:id/read",
            patch(handlers::notifications::mark_read),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
