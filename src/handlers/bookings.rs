use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::db::queries::BookingFilter;
use crate::errors::AppError;
use crate::handlers::auth::{actor, authenticate, require_admin};
use crate::models::{Booking, BookingStatus, Location, Participants, Photographer, StatusChange};
use crate::services::availability::{self, AvailableSlot};
use crate::services::lifecycle::{self, BookingUpdate, NewBooking};
use crate::services::mailer::templates;
use crate::services::stats::{self, BookingStats};
use crate::services::notifier;
use crate::state::AppState;

async fn send_email(state: &AppState, to: &str, subject: &str, html: &str) {
    if let Err(e) = state.mailer.send(to, subject, html).await {
        tracing::warn!(%to, error = %e, "failed to send email");
    }
}

/// Booking plus the derived flags and status log clients render from.
#[derive(Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub duration_minutes: i32,
    pub is_editable: bool,
    pub is_cancellable: bool,
    pub needs_confirmation: bool,
    pub status_history: Vec<StatusChange>,
}

impl BookingDetail {
    fn build(conn: &rusqlite::Connection, booking: Booking) -> Result<Self, AppError> {
        let history = queries::get_status_history(conn, &booking.id)?;
        let now = Utc::now().naive_utc();
        Ok(Self {
            duration_minutes: booking.duration_minutes(),
            is_editable: booking.is_editable(),
            is_cancellable: booking.is_cancellable(now),
            needs_confirmation: booking.needs_confirmation(),
            status_history: history,
            booking,
        })
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: String,
    pub booking_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub participants: Option<Participants>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub photographer: Option<Photographer>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub client_notes: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;
    if body.photographer.is_some() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "only an admin can assign a photographer".to_string(),
        ));
    }

    let input = NewBooking {
        service_id: body.service_id,
        booking_date: body.booking_date,
        start_time: body.start_time,
        end_time: body.end_time,
        participants: body.participants,
        location: body.location,
        photographer: body.photographer,
        special_requests: body.special_requests,
        client_notes: body.client_notes,
    };

    let mut db = state.db.lock().unwrap();
    let booking = lifecycle::create_booking(&mut db, &actor(&user), input, Utc::now().naive_utc())?;
    Ok(Json(booking))
}

// GET /api/bookings/my
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn page_bounds(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).clamp(1, 100);
    (page, limit)
}

pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<BookingPage>, AppError> {
    let user = authenticate(&state, &headers)?;
    let (page, limit) = page_bounds(query.page, query.limit);

    let filter = BookingFilter {
        client_id: Some(user.id.clone()),
        status: query.status,
        ..Default::default()
    };

    let db = state.db.lock().unwrap();
    let total = queries::count_bookings(&db, &filter)?;
    let bookings = queries::list_bookings(&db, &filter, limit, (page - 1) * limit)?;

    Ok(Json(BookingPage {
        bookings,
        total,
        page,
        limit,
    }))
}

// GET /api/bookings/available-slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub duration: Option<i32>,
    pub service_id: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub slots: Vec<AvailableSlot>,
}

pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let db = state.db.lock().unwrap();

    // explicit duration wins, then the service's own duration
    let duration = match (query.duration, &query.service_id) {
        (Some(duration), _) => duration,
        (None, Some(service_id)) => queries::get_service(&db, service_id)?
            .ok_or_else(|| AppError::NotFound(format!("service {service_id} not found")))?
            .duration_minutes,
        (None, None) => 60,
    };
    if duration <= 0 {
        return Err(AppError::Validation(
            "the duration must be positive".to_string(),
        ));
    }

    let slots = availability::list_available_slots(&db, query.date, duration)?;
    Ok(Json(SlotsResponse {
        date: query.date,
        slots,
    }))
}

// GET /api/bookings/check-availability
#[derive(Deserialize)]
pub struct CheckQuery {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let available =
        availability::is_slot_available(&db, query.date, &query.start_time, &query.end_time, None)?;
    Ok(Json(serde_json::json!({ "available": available })))
}

// GET /api/bookings/:id
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDetail>, AppError> {
    let user = authenticate(&state, &headers)?;

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;
    if booking.client_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }
    Ok(Json(BookingDetail::build(&db, booking)?))
}

// PUT /api/bookings/:id
#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub booking_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub participants: Option<Participants>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub photographer: Option<Photographer>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub client_notes: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;

    let update = BookingUpdate {
        booking_date: body.booking_date,
        start_time: body.start_time,
        end_time: body.end_time,
        participants: body.participants,
        location: body.location,
        photographer: body.photographer,
        special_requests: body.special_requests,
        client_notes: body.client_notes,
        admin_notes: body.admin_notes,
        status: body.status,
    };

    let mut db = state.db.lock().unwrap();
    let booking =
        lifecycle::update_booking(&mut db, &actor(&user), &id, update, Utc::now().naive_utc())?;
    Ok(Json(booking))
}

// PATCH /api/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;

    let (booking, client, service) = {
        let mut db = state.db.lock().unwrap();
        let booking = lifecycle::cancel_booking(
            &mut db,
            &actor(&user),
            &id,
            &body.reason,
            Utc::now().naive_utc(),
        )?;
        let client = queries::get_user_by_id(&db, &booking.client_id)?;
        let service = queries::get_service(&db, &booking.service_id)?;
        if let Some(service) = &service {
            notifier::booking_cancelled(&db, &booking, &service.name, &body.reason);
        }
        (booking, client, service)
    };

    if let (Some(client), Some(service)) = (client, service) {
        send_email(
            &state,
            &client.email,
            &templates::cancellation_subject(&service),
            &templates::cancellation_body(&client, &booking, &service, &body.reason),
        )
        .await;
    }

    Ok(Json(booking))
}

// DELETE /api/bookings/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = authenticate(&state, &headers)?;

    let mut db = state.db.lock().unwrap();
    lifecycle::delete_booking(&mut db, &actor(&user), &id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ── Admin endpoints ──

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct AdminBookingsQuery {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub service_id: Option<String>,
    pub photographer: Option<String>,
    pub date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<BookingPage>, AppError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;
    let (page, limit) = page_bounds(query.page, query.limit);

    let filter = BookingFilter {
        client_id: query.client_id,
        service_id: query.service_id,
        status: query.status,
        photographer: query.photographer,
        date: query.date,
    };

    let db = state.db.lock().unwrap();
    let total = queries::count_bookings(&db, &filter)?;
    let bookings = queries::list_bookings(&db, &filter, limit, (page - 1) * limit)?;

    Ok(Json(BookingPage {
        bookings,
        total,
        page,
        limit,
    }))
}

// GET /api/admin/stats
#[derive(Deserialize)]
pub struct StatsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn booking_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> Result<Json<BookingStats>, AppError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    // both bounds inclusive over the whole day
    let range = match (query.from, query.to) {
        (Some(from), Some(to)) => {
            let from = from.and_hms_opt(0, 0, 0).expect("midnight is always valid");
            let to = to.and_hms_opt(23, 59, 59).expect("valid time of day");
            if to < from {
                return Err(AppError::Validation(
                    "the 'to' date must not precede the 'from' date".to_string(),
                ));
            }
            Some((from, to))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "'from' and 'to' must be provided together".to_string(),
            ))
        }
    };

    let db = state.db.lock().unwrap();
    let stats = stats::compute_stats(&db, range)?;
    Ok(Json(stats))
}

// PATCH /api/admin/bookings/:id/accept
#[derive(Deserialize, Default)]
pub struct AcceptRequest {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

pub async fn accept(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<AcceptRequest>>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;
    let admin_notes = body.and_then(|Json(b)| b.admin_notes);

    let (booking, client, service) = {
        let mut db = state.db.lock().unwrap();
        let booking = lifecycle::accept_booking(
            &mut db,
            &actor(&user),
            &id,
            admin_notes,
            Utc::now().naive_utc(),
        )?;
        let client = queries::get_user_by_id(&db, &booking.client_id)?;
        let service = queries::get_service(&db, &booking.service_id)?;
        if let Some(service) = &service {
            notifier::booking_confirmed(&db, &booking, &service.name);
        }
        (booking, client, service)
    };

    if let (Some(client), Some(service)) = (client, service) {
        send_email(
            &state,
            &client.email,
            &templates::confirmation_subject(&service),
            &templates::confirmation_body(&client, &booking, &service),
        )
        .await;
    }

    Ok(Json(booking))
}

// PATCH /api/admin/bookings/:id/reject
pub async fn reject(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;

    let (booking, client, service) = {
        let mut db = state.db.lock().unwrap();
        let booking = lifecycle::reject_booking(
            &mut db,
            &actor(&user),
            &id,
            &body.reason,
            Utc::now().naive_utc(),
        )?;
        let client = queries::get_user_by_id(&db, &booking.client_id)?;
        let service = queries::get_service(&db, &booking.service_id)?;
        if let Some(service) = &service {
            notifier::booking_cancelled(&db, &booking, &service.name, &body.reason);
        }
        (booking, client, service)
    };

    if let (Some(client), Some(service)) = (client, service) {
        send_email(
            &state,
            &client.email,
            &templates::cancellation_subject(&service),
            &templates::cancellation_body(&client, &booking, &service, &body.reason),
        )
        .await;
    }

    Ok(Json(booking))
}

// PATCH /api/admin/bookings/:id/start
pub async fn start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;

    let mut db = state.db.lock().unwrap();
    let booking = lifecycle::start_session(&mut db, &actor(&user), &id, Utc::now().naive_utc())?;
    Ok(Json(booking))
}

// PATCH /api/admin/bookings/:id/complete
pub async fn complete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;

    let mut db = state.db.lock().unwrap();
    let booking = lifecycle::complete_session(&mut db, &actor(&user), &id, Utc::now().naive_utc())?;
    Ok(Json(booking))
}

// PATCH /api/admin/bookings/:id/no-show
pub async fn no_show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let user = authenticate(&state, &headers)?;

    let mut db = state.db.lock().unwrap();
    let booking = lifecycle::mark_no_show(&mut db, &actor(&user), &id, Utc::now().naive_utc())?;
    Ok(Json(booking))
}
