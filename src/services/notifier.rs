//! Durable in-app notifications written alongside booking transitions.
//! A failed write is logged and swallowed so it never aborts the
//! transition that triggered it.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{Booking, Notification, NotificationKind};

fn record(conn: &Connection, booking: &Booking, kind: NotificationKind, title: &str, message: String) {
    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: booking.client_id.clone(),
        booking_id: Some(booking.id.clone()),
        kind,
        title: title.to_string(),
        message,
        is_read: false,
        created_at: Utc::now().naive_utc(),
    };
    if let Err(e) = queries::insert_notification(conn, &notification) {
        tracing::warn!(booking_id = %booking.id, error = %e, "failed to record notification");
    }
}

pub fn booking_confirmed(conn: &Connection, booking: &Booking, service_name: &str) {
    record(
        conn,
        booking,
        NotificationKind::BookingConfirmed,
        "Booking confirmed",
        format!(
            "Your {} session on {} at {} has been confirmed.",
            service_name,
            booking.booking_date.format("%Y-%m-%d"),
            booking.start_time,
        ),
    );
}

pub fn booking_cancelled(conn: &Connection, booking: &Booking, service_name: &str, reason: &str) {
    record(
        conn,
        booking,
        NotificationKind::BookingCancelled,
        "Booking cancelled",
        format!(
            "Your {} session on {} was cancelled: {}",
            service_name,
            booking.booking_date.format("%Y-%m-%d"),
            reason,
        ),
    );
}

pub fn payment_received(conn: &Connection, booking: &Booking, service_name: &str) {
    record(
        conn,
        booking,
        NotificationKind::PaymentReceived,
        "Payment received",
        format!(
            "We received your payment of {:.2} {} for the {} session on {}.",
            booking.pricing.total_amount,
            booking.pricing.currency,
            service_name,
            booking.booking_date.format("%Y-%m-%d"),
        ),
    );
}
