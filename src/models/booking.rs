use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Minutes past midnight for a zero-padded `HH:MM` string. Both components
/// must be exactly two ASCII digits; `str::parse` alone would also accept
/// signed strings like `"+9"`, which break the lexicographic ordering the
/// conflict query relies on.
pub fn time_to_minutes(t: &str) -> Option<i32> {
    let (h, m) = t.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: i32 = h.parse().ok()?;
    let minute: i32 = m.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

pub fn minutes_to_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no-show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in-progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "no-show" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    /// Only pending and confirmed bookings occupy a time slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::PartiallyPaid => "partially-paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "partially-paid" => Some(PaymentStatus::PartiallyPaid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    pub base_price: f64,
    pub additional_fees: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub currency: String,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participants {
    pub count: i32,
    #[serde(default)]
    pub details: Vec<Participant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub kind: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            kind: "studio".to_string(),
            address: Address::default(),
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photographer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<NaiveDateTime>,
}

impl Default for Photographer {
    fn default() -> Self {
        Self {
            name: "unassigned".to_string(),
            email: None,
            phone: None,
            assigned_at: None,
        }
    }
}

/// One append-only entry of the booking's status log.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub changed_by: String,
    pub changed_at: NaiveDateTime,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_by: String,
    pub cancelled_at: NaiveDateTime,
    pub refund_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    pub service_id: String,
    pub booking_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: BookingStatus,
    pub pricing: Pricing,
    pub participants: Participants,
    pub location: Location,
    pub photographer: Photographer,
    pub special_requests: Option<String>,
    pub client_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub cancellation: Option<Cancellation>,
    pub checkout_session_id: Option<String>,
    pub payment_ref: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn duration_minutes(&self) -> i32 {
        match (
            time_to_minutes(&self.start_time),
            time_to_minutes(&self.end_time),
        ) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        }
    }

    /// Scheduled start as a full timestamp.
    pub fn starts_at(&self) -> NaiveDateTime {
        let minutes = time_to_minutes(&self.start_time).unwrap_or(0);
        self.booking_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            + chrono::Duration::minutes(minutes as i64)
    }

    pub fn is_editable(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_cancellable(&self, now: NaiveDateTime) -> bool {
        self.status.is_active() && self.starts_at() - now > chrono::Duration::hours(24)
    }

    pub fn is_payable(&self) -> bool {
        self.status == BookingStatus::Pending
            && self.pricing.payment_status == PaymentStatus::Pending
    }

    /// Paid but still awaiting explicit admin confirmation.
    pub fn needs_confirmation(&self) -> bool {
        self.status == BookingStatus::Pending && self.pricing.payment_status == PaymentStatus::Paid
    }

    // ── Transitions ──
    //
    // Each transition mutates the booking and returns exactly one
    // StatusChange; the persistence layer appends it to the history table
    // in the same transaction as the state write.

    pub fn confirm(&mut self, by: &str, now: NaiveDateTime) -> Result<StatusChange, AppError> {
        if self.status != BookingStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "cannot accept a booking with status '{}'",
                self.status.as_str()
            )));
        }
        self.status = BookingStatus::Confirmed;
        self.confirmed_at = Some(now);
        self.updated_at = now;
        Ok(self.record_change(by, now, "Reservation confirmed"))
    }

    pub fn cancel(
        &mut self,
        reason: &str,
        by: &str,
        is_admin: bool,
        now: NaiveDateTime,
    ) -> Result<StatusChange, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "a cancellation reason is required".to_string(),
            ));
        }
        if !self.status.is_active() {
            return Err(AppError::InvalidTransition(format!(
                "cannot cancel a booking with status '{}'",
                self.status.as_str()
            )));
        }
        if !is_admin && !self.is_cancellable(now) {
            return Err(AppError::InvalidTransition(
                "bookings can no longer be cancelled less than 24 hours before the session"
                    .to_string(),
            ));
        }
        self.status = BookingStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            reason: reason.to_string(),
            cancelled_by: by.to_string(),
            cancelled_at: now,
            refund_status: "none".to_string(),
        });
        self.updated_at = now;
        Ok(self.record_change(by, now, reason))
    }

    pub fn start_session(
        &mut self,
        by: &str,
        now: NaiveDateTime,
    ) -> Result<StatusChange, AppError> {
        if self.status != BookingStatus::Confirmed {
            return Err(AppError::InvalidTransition(format!(
                "cannot start a session for a booking with status '{}'",
                self.status.as_str()
            )));
        }
        self.status = BookingStatus::InProgress;
        self.updated_at = now;
        Ok(self.record_change(by, now, "Session started"))
    }

    pub fn complete(&mut self, by: &str, now: NaiveDateTime) -> Result<StatusChange, AppError> {
        if self.status != BookingStatus::InProgress {
            return Err(AppError::InvalidTransition(format!(
                "cannot complete a booking with status '{}'",
                self.status.as_str()
            )));
        }
        self.status = BookingStatus::Completed;
        self.updated_at = now;
        Ok(self.record_change(by, now, "Session completed"))
    }

    pub fn mark_no_show(&mut self, by: &str, now: NaiveDateTime) -> Result<StatusChange, AppError> {
        if !matches!(
            self.status,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress
        ) {
            return Err(AppError::InvalidTransition(format!(
                "cannot mark a booking with status '{}' as no-show",
                self.status.as_str()
            )));
        }
        self.status = BookingStatus::NoShow;
        self.updated_at = now;
        Ok(self.record_change(by, now, "Client did not show up"))
    }

    /// Applies an external "paid" signal. The booking status is left
    /// untouched: a paid booking still needs explicit admin confirmation.
    /// Idempotent, a second confirmation writes nothing.
    pub fn confirm_payment(
        &mut self,
        by: &str,
        payment_ref: &str,
        now: NaiveDateTime,
    ) -> Option<StatusChange> {
        if self.pricing.payment_status == PaymentStatus::Paid {
            return None;
        }
        self.pricing.payment_status = PaymentStatus::Paid;
        self.payment_ref = Some(payment_ref.to_string());
        self.updated_at = now;
        Some(self.record_change(by, now, "Payment received, awaiting admin confirmation"))
    }

    /// Direct status override by an admin through the update endpoint.
    pub fn override_status(
        &mut self,
        status: BookingStatus,
        by: &str,
        now: NaiveDateTime,
    ) -> StatusChange {
        self.status = status;
        self.updated_at = now;
        self.record_change(by, now, "Status changed by admin")
    }

    fn record_change(&self, by: &str, now: NaiveDateTime, reason: &str) -> StatusChange {
        StatusChange {
            status: self.status,
            changed_by: by.to_string(),
            changed_at: now,
            reason: reason.to_string(),
        }
    }
}

/// Write-time interval validation: well-formed times, end strictly after
/// start, date strictly in the future.
pub fn validate_interval(
    date: NaiveDate,
    start_time: &str,
    end_time: &str,
    today: NaiveDate,
) -> Result<(), AppError> {
    let start = time_to_minutes(start_time).ok_or_else(|| {
        AppError::Validation(format!("invalid start time '{start_time}', expected HH:MM"))
    })?;
    let end = time_to_minutes(end_time).ok_or_else(|| {
        AppError::Validation(format!("invalid end time '{end_time}', expected HH:MM"))
    })?;
    if end <= start {
        return Err(AppError::InvalidInterval(
            "the end time must be after the start time".to_string(),
        ));
    }
    if date <= today {
        return Err(AppError::InvalidInterval(
            "the booking date must be in the future".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_booking() -> Booking {
        let now = dt("2024-06-01 12:00");
        Booking {
            id: "b1".to_string(),
            client_id: "u1".to_string(),
            service_id: "s1".to_string(),
            booking_date: date("2024-06-10"),
            start_time: "10:00".to_string(),
            end_time: "11:00".to_string(),
            status: BookingStatus::Pending,
            pricing: Pricing {
                base_price: 100.0,
                additional_fees: 0.0,
                discount: 0.0,
                total_amount: 100.0,
                currency: "MAD".to_string(),
                payment_status: PaymentStatus::Pending,
            },
            participants: Participants {
                count: 1,
                details: vec![],
            },
            location: Location::default(),
            photographer: Photographer::default(),
            special_requests: None,
            client_notes: None,
            admin_notes: None,
            confirmed_at: None,
            cancellation: None,
            checkout_session_id: None,
            payment_ref: None,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_time_to_minutes() {
        assert_eq!(time_to_minutes("09:00"), Some(540));
        assert_eq!(time_to_minutes("18:00"), Some(1080));
        assert_eq!(time_to_minutes("00:00"), Some(0));
        assert_eq!(time_to_minutes("24:00"), None);
        assert_eq!(time_to_minutes("9:00"), None);
        assert_eq!(time_to_minutes("0900"), None);
    }

    #[test]
    fn test_time_to_minutes_rejects_signed_components() {
        // "+9" and "-1" parse as i32 and are two characters long, but they
        // sort before every digit and would defeat the conflict query
        assert_eq!(time_to_minutes("+9:00"), None);
        assert_eq!(time_to_minutes("-1:00"), None);
        assert_eq!(time_to_minutes("09:+5"), None);
        assert_eq!(time_to_minutes(" 9:00"), None);
    }

    #[test]
    fn test_minutes_to_time_round_trip() {
        assert_eq!(minutes_to_time(540), "09:00");
        assert_eq!(minutes_to_time(630), "10:30");
        assert_eq!(time_to_minutes(&minutes_to_time(1050)), Some(1050));
    }

    #[test]
    fn test_duration_minutes() {
        let booking = sample_booking();
        assert_eq!(booking.duration_minutes(), 60);
    }

    #[test]
    fn test_confirm_pending() {
        let mut booking = sample_booking();
        let change = booking.confirm("admin", dt("2024-06-02 09:00")).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(booking.confirmed_at.is_some());
        assert_eq!(change.status, BookingStatus::Confirmed);
        assert_eq!(change.changed_by, "admin");
    }

    #[test]
    fn test_confirm_rejects_non_pending() {
        let mut booking = sample_booking();
        booking.status = BookingStatus::Cancelled;
        let err = booking.confirm("admin", dt("2024-06-02 09:00")).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn test_cancel_requires_reason() {
        let mut booking = sample_booking();
        let err = booking
            .cancel("   ", "u1", false, dt("2024-06-02 09:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_cancel_within_24h_rejected_for_client() {
        let mut booking = sample_booking();
        // 18 hours before the 10:00 start
        let err = booking
            .cancel("sick", "u1", false, dt("2024-06-09 16:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn test_cancel_within_24h_allowed_for_admin() {
        let mut booking = sample_booking();
        let change = booking
            .cancel("client request", "admin", true, dt("2024-06-09 16:00"))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(change.reason, "client request");
        let cancellation = booking.cancellation.unwrap();
        assert_eq!(cancellation.cancelled_by, "admin");
    }

    #[test]
    fn test_cancelled_booking_stays_cancelled() {
        let mut booking = sample_booking();
        booking
            .cancel("first", "admin", true, dt("2024-06-02 09:00"))
            .unwrap();
        assert!(booking
            .cancel("second", "admin", true, dt("2024-06-02 10:00"))
            .is_err());
        assert!(booking.confirm("admin", dt("2024-06-02 10:00")).is_err());
    }

    #[test]
    fn test_session_flow() {
        let mut booking = sample_booking();
        booking.confirm("admin", dt("2024-06-02 09:00")).unwrap();
        booking
            .start_session("admin", dt("2024-06-10 10:00"))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::InProgress);
        booking.complete("admin", dt("2024-06-10 11:00")).unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let mut booking = sample_booking();
        assert!(booking.complete("admin", dt("2024-06-02 09:00")).is_err());
    }

    #[test]
    fn test_no_show_from_active_statuses() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
        ] {
            let mut booking = sample_booking();
            booking.status = status;
            assert!(booking
                .mark_no_show("admin", dt("2024-06-10 10:30"))
                .is_ok());
        }
        let mut booking = sample_booking();
        booking.status = BookingStatus::Completed;
        assert!(booking
            .mark_no_show("admin", dt("2024-06-10 12:00"))
            .is_err());
    }

    #[test]
    fn test_confirm_payment_is_idempotent() {
        let mut booking = sample_booking();
        let first = booking.confirm_payment("u1", "pi_123", dt("2024-06-02 09:00"));
        assert!(first.is_some());
        assert_eq!(booking.pricing.payment_status, PaymentStatus::Paid);
        // status untouched, booking now awaits admin confirmation
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.needs_confirmation());

        let second = booking.confirm_payment("u1", "pi_456", dt("2024-06-02 09:05"));
        assert!(second.is_none());
        assert_eq!(booking.payment_ref.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_payable_flags() {
        let mut booking = sample_booking();
        assert!(booking.is_payable());
        booking.confirm_payment("u1", "pi_1", dt("2024-06-02 09:00"));
        assert!(!booking.is_payable());
        assert!(booking.needs_confirmation());
    }

    #[test]
    fn test_validate_interval() {
        let today = date("2024-06-01");
        assert!(validate_interval(date("2024-06-10"), "10:00", "11:00", today).is_ok());
        assert!(matches!(
            validate_interval(date("2024-06-10"), "11:00", "10:00", today),
            Err(AppError::InvalidInterval(_))
        ));
        assert!(matches!(
            validate_interval(date("2024-06-10"), "10:00", "10:00", today),
            Err(AppError::InvalidInterval(_))
        ));
        assert!(matches!(
            validate_interval(date("2024-06-01"), "10:00", "11:00", today),
            Err(AppError::InvalidInterval(_))
        ));
        assert!(matches!(
            validate_interval(date("2024-06-10"), "25:00", "11:00", today),
            Err(AppError::Validation(_))
        ));
    }
}
