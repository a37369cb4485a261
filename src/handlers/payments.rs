use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::auth::{actor, authenticate};
use crate::models::Booking;
use crate::services::lifecycle;
use crate::services::mailer::templates;
use crate::services::notifier;
use crate::services::payments::CheckoutRequest;
use crate::state::AppState;

// POST /api/payments/create-checkout-session
#[derive(Deserialize)]
pub struct CheckoutSessionRequest {
    pub booking_id: String,
}

#[derive(Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: String,
}

pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CheckoutSessionRequest>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let user = authenticate(&state, &headers)?;

    let (booking, service) = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking(&db, &body.booking_id)?.ok_or_else(|| {
            AppError::NotFound(format!("booking {} not found", body.booking_id))
        })?;
        if booking.client_id != user.id && !user.is_admin() {
            return Err(AppError::Forbidden(
                "you do not have access to this booking".to_string(),
            ));
        }
        if !booking.is_payable() {
            return Err(AppError::InvalidTransition(
                "this booking cannot be paid in its current state".to_string(),
            ));
        }
        let service = queries::get_service(&db, &booking.service_id)?.ok_or_else(|| {
            AppError::NotFound(format!("service {} not found", booking.service_id))
        })?;
        (booking, service)
    };

    let request = CheckoutRequest {
        booking_id: booking.id.clone(),
        description: format!(
            "{} on {} at {}",
            service.name,
            booking.booking_date.format("%Y-%m-%d"),
            booking.start_time,
        ),
        amount_cents: (booking.pricing.total_amount * 100.0).round() as i64,
        currency: booking.pricing.currency.clone(),
        customer_email: user.email.clone(),
    };

    let session = state
        .payments
        .create_checkout_session(&request)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    {
        let db = state.db.lock().unwrap();
        queries::set_checkout_session(&db, &booking.id, &session.session_id)?;
    }

    tracing::info!(booking_id = %booking.id, session_id = %session.session_id, "checkout session created");
    Ok(Json(CheckoutSessionResponse {
        session_id: session.session_id,
        url: session.url,
    }))
}

// GET /api/payments/verify/:session_id
#[derive(Serialize)]
pub struct VerifyResponse {
    pub paid: bool,
    pub needs_confirmation: bool,
    pub booking: Booking,
}

pub async fn verify_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<VerifyResponse>, AppError> {
    let user = authenticate(&state, &headers)?;

    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_session(&db, &session_id)?.ok_or_else(|| {
            AppError::NotFound("no booking matches this checkout session".to_string())
        })?
    };
    if booking.client_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }

    let status = state
        .payments
        .fetch_session(&session_id)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    if !status.paid {
        return Ok(Json(VerifyResponse {
            paid: false,
            needs_confirmation: false,
            booking,
        }));
    }

    let payment_ref = status.payment_ref.unwrap_or_else(|| session_id.clone());
    let (booking, newly_paid, client, service) = {
        let mut db = state.db.lock().unwrap();
        let (booking, newly_paid) = lifecycle::confirm_payment(
            &mut db,
            &actor(&user),
            &booking.id,
            &payment_ref,
            Utc::now().naive_utc(),
        )?;
        let client = queries::get_user_by_id(&db, &booking.client_id)?;
        let service = queries::get_service(&db, &booking.service_id)?;
        if newly_paid {
            if let Some(service) = &service {
                notifier::payment_received(&db, &booking, &service.name);
            }
        }
        (booking, newly_paid, client, service)
    };

    if newly_paid {
        if let (Some(client), Some(service)) = (client, service) {
            let subject = templates::payment_received_subject(&service);
            let body = templates::payment_received_body(&client, &booking, &service);
            if let Err(e) = state.mailer.send(&client.email, &subject, &body).await {
                tracing::warn!(error = %e, "failed to send payment email");
            }
        }
    }

    Ok(Json(VerifyResponse {
        paid: true,
        needs_confirmation: booking.needs_confirmation(),
        booking,
    }))
}
