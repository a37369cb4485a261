use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
    PaymentReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::PaymentReceived => "payment_received",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booking_confirmed" => Some(NotificationKind::BookingConfirmed),
            "booking_cancelled" => Some(NotificationKind::BookingCancelled),
            "payment_received" => Some(NotificationKind::PaymentReceived),
            _ => None,
        }
    }
}

/// Durable, user-visible notification record. Deleted together with the
/// booking it references.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub booking_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
