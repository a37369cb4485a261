use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    validate_interval, Booking, BookingStatus, Location, Participants, PaymentStatus,
    Photographer, Pricing, Role, StatusChange,
};
use crate::services::availability;

/// Acting principal, as supplied by the auth layer.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn can_access(&self, booking: &Booking) -> bool {
        self.is_admin() || booking.client_id == self.user_id
    }
}

#[derive(Debug)]
pub struct NewBooking {
    pub service_id: String,
    pub booking_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub participants: Option<Participants>,
    pub location: Option<Location>,
    pub photographer: Option<Photographer>,
    pub special_requests: Option<String>,
    pub client_notes: Option<String>,
}

/// Explicit partial update: every mutable field is enumerated, admin-only
/// fields are gated separately from owner-editable ones.
#[derive(Debug, Default)]
pub struct BookingUpdate {
    pub booking_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub participants: Option<Participants>,
    pub location: Option<Location>,
    pub photographer: Option<Photographer>,
    pub special_requests: Option<String>,
    pub client_notes: Option<String>,
    // admin-only
    pub admin_notes: Option<String>,
    pub status: Option<BookingStatus>,
}

/// Creates a booking in `pending`. The availability check runs twice: once
/// as an advisory pre-check and again inside an IMMEDIATE transaction right
/// before the insert, so a losing concurrent writer fails with
/// `SlotUnavailable` instead of double-booking.
pub fn create_booking(
    conn: &mut Connection,
    actor: &Actor,
    input: NewBooking,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    validate_interval(
        input.booking_date,
        &input.start_time,
        &input.end_time,
        now.date(),
    )?;

    let service = queries::get_service(conn, &input.service_id)?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::NotFound("service not found or inactive".to_string()))?;

    let participants = input.participants.unwrap_or(Participants {
        count: 1,
        details: vec![],
    });
    if participants.count < 1 {
        return Err(AppError::Validation(
            "at least one participant is required".to_string(),
        ));
    }
    if participants.count > service.max_participants {
        return Err(AppError::CapacityExceeded(format!(
            "the maximum number of participants for this service is {}",
            service.max_participants
        )));
    }

    if !availability::is_slot_available(
        conn,
        input.booking_date,
        &input.start_time,
        &input.end_time,
        None,
    )? {
        return Err(AppError::SlotUnavailable);
    }

    let total_amount = service.price * participants.count as f64;
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        client_id: actor.user_id.clone(),
        service_id: service.id.clone(),
        booking_date: input.booking_date,
        start_time: input.start_time,
        end_time: input.end_time,
        status: BookingStatus::Pending,
        pricing: Pricing {
            base_price: service.price,
            additional_fees: 0.0,
            discount: 0.0,
            total_amount,
            currency: "MAD".to_string(),
            payment_status: PaymentStatus::Pending,
        },
        participants,
        location: input.location.unwrap_or_default(),
        photographer: input.photographer.unwrap_or_default(),
        special_requests: input.special_requests,
        client_notes: input.client_notes,
        admin_notes: None,
        confirmed_at: None,
        cancellation: None,
        checkout_session_id: None,
        payment_ref: None,
        created_by: actor.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let conflicts = queries::count_conflicts(
        &tx,
        booking.booking_date,
        &booking.start_time,
        &booking.end_time,
        None,
    )?;
    if conflicts > 0 {
        return Err(AppError::SlotUnavailable);
    }
    queries::insert_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, "booking created");
    Ok(booking)
}

fn load_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))
}

fn load_for_actor(conn: &Connection, actor: &Actor, id: &str) -> Result<Booking, AppError> {
    let booking = load_booking(conn, id)?;
    if !actor.can_access(&booking) {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }
    Ok(booking)
}

/// Persists a transition: the state write and its history append commit in
/// one transaction.
fn apply_transition(
    conn: &mut Connection,
    booking: &Booking,
    change: &StatusChange,
) -> Result<(), AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::update_booking(&tx, booking)?;
    queries::insert_status_change(&tx, &booking.id, change)?;
    tx.commit()?;
    Ok(())
}

pub fn accept_booking(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    admin_notes: Option<String>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "only an admin can accept a booking".to_string(),
        ));
    }

    let mut booking = load_booking(conn, id)?;
    let change = booking.confirm(&actor.user_id, now)?;
    if let Some(notes) = admin_notes {
        booking.admin_notes = Some(notes);
    }
    apply_transition(conn, &booking, &change)?;

    tracing::info!(booking_id = %booking.id, "booking accepted");
    Ok(booking)
}

pub fn reject_booking(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "only an admin can reject a booking".to_string(),
        ));
    }

    let mut booking = load_booking(conn, id)?;
    let change = booking.cancel(reason, &actor.user_id, true, now)?;
    apply_transition(conn, &booking, &change)?;

    tracing::info!(booking_id = %booking.id, "booking rejected");
    Ok(booking)
}

/// Self-service or admin cancellation. Non-admins may only cancel their own
/// bookings, and only while more than 24 hours remain before the start.
pub fn cancel_booking(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let mut booking = load_for_actor(conn, actor, id)?;
    let change = booking.cancel(reason, &actor.user_id, actor.is_admin(), now)?;
    apply_transition(conn, &booking, &change)?;

    tracing::info!(booking_id = %booking.id, "booking cancelled");
    Ok(booking)
}

pub fn start_session(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "only an admin can start a session".to_string(),
        ));
    }
    let mut booking = load_booking(conn, id)?;
    let change = booking.start_session(&actor.user_id, now)?;
    apply_transition(conn, &booking, &change)?;
    Ok(booking)
}

pub fn complete_session(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "only an admin can complete a session".to_string(),
        ));
    }
    let mut booking = load_booking(conn, id)?;
    let change = booking.complete(&actor.user_id, now)?;
    apply_transition(conn, &booking, &change)?;
    Ok(booking)
}

pub fn mark_no_show(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "only an admin can mark a no-show".to_string(),
        ));
    }
    let mut booking = load_booking(conn, id)?;
    let change = booking.mark_no_show(&actor.user_id, now)?;
    apply_transition(conn, &booking, &change)?;
    Ok(booking)
}

/// Applies the external payment collaborator's "paid" signal. Idempotent;
/// the booking status stays pending until an admin confirms.
pub fn confirm_payment(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    payment_ref: &str,
    now: NaiveDateTime,
) -> Result<(Booking, bool), AppError> {
    let mut booking = load_for_actor(conn, actor, id)?;
    match booking.confirm_payment(&actor.user_id, payment_ref, now) {
        Some(change) => {
            apply_transition(conn, &booking, &change)?;
            tracing::info!(booking_id = %booking.id, "payment confirmed, awaiting admin approval");
            Ok((booking, true))
        }
        None => Ok((booking, false)),
    }
}

pub fn update_booking(
    conn: &mut Connection,
    actor: &Actor,
    id: &str,
    update: BookingUpdate,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let mut booking = load_for_actor(conn, actor, id)?;

    if !booking.is_editable() && !actor.is_admin() {
        return Err(AppError::InvalidTransition(
            "this booking can no longer be modified".to_string(),
        ));
    }

    let reschedule = update.booking_date.is_some()
        || update.start_time.is_some()
        || update.end_time.is_some();

    if reschedule {
        let new_date = update.booking_date.unwrap_or(booking.booking_date);
        let new_start = update
            .start_time
            .clone()
            .unwrap_or_else(|| booking.start_time.clone());
        let new_end = update
            .end_time
            .clone()
            .unwrap_or_else(|| booking.end_time.clone());

        // date-in-the-future only applies at creation; rescheduling keeps
        // the interval rules
        validate_interval(new_date, &new_start, &new_end, new_date - chrono::Duration::days(1))?;

        booking.booking_date = new_date;
        booking.start_time = new_start;
        booking.end_time = new_end;
    }

    if let Some(participants) = update.participants {
        let service = queries::get_service(conn, &booking.service_id)?
            .ok_or_else(|| AppError::NotFound("service not found".to_string()))?;
        if participants.count < 1 {
            return Err(AppError::Validation(
                "at least one participant is required".to_string(),
            ));
        }
        if participants.count > service.max_participants {
            return Err(AppError::CapacityExceeded(format!(
                "the maximum number of participants for this service is {}",
                service.max_participants
            )));
        }
        booking.pricing.total_amount = booking.pricing.base_price * participants.count as f64;
        booking.participants = participants;
    }

    if let Some(location) = update.location {
        booking.location = location;
    }
    if let Some(mut photographer) = update.photographer {
        if photographer.assigned_at.is_none() && photographer.name != "unassigned" {
            photographer.assigned_at = Some(now);
        }
        booking.photographer = photographer;
    }
    if let Some(requests) = update.special_requests {
        booking.special_requests = Some(requests);
    }
    if let Some(notes) = update.client_notes {
        booking.client_notes = Some(notes);
    }

    let mut status_change = None;
    if actor.is_admin() {
        if let Some(notes) = update.admin_notes {
            booking.admin_notes = Some(notes);
        }
        if let Some(status) = update.status {
            if status != booking.status {
                status_change = Some(booking.override_status(status, &actor.user_id, now));
            }
        }
    } else if update.admin_notes.is_some() || update.status.is_some() {
        return Err(AppError::Forbidden(
            "only an admin can change these fields".to_string(),
        ));
    }

    booking.updated_at = now;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if reschedule {
        // the edited booking is excluded so it does not conflict with itself
        let conflicts = queries::count_conflicts(
            &tx,
            booking.booking_date,
            &booking.start_time,
            &booking.end_time,
            Some(&booking.id),
        )?;
        if conflicts > 0 {
            return Err(AppError::SlotUnavailable);
        }
    }
    queries::update_booking(&tx, &booking)?;
    if let Some(change) = &status_change {
        queries::insert_status_change(&tx, &booking.id, change)?;
    }
    tx.commit()?;

    Ok(booking)
}

/// Permanent deletion: distinct from cancellation, allowed from any state
/// for the owner or an admin. The row disappears along with its history and
/// notifications.
pub fn delete_booking(conn: &mut Connection, actor: &Actor, id: &str) -> Result<(), AppError> {
    let booking = load_for_actor(conn, actor, id)?;
    queries::delete_booking(conn, &booking.id)?;
    tracing::info!(booking_id = %booking.id, "booking deleted");
    Ok(())
}
