use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, Cancellation, Location, Notification, NotificationKind, Participants,
    PaymentStatus, Photographer, Pricing, Role, Service, StatusChange, User,
};

const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DT_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

/// Bookings store their calendar day as a midnight timestamp; day-scoped
/// queries still use a half-open range so any stray time-of-day portion is
/// ignored.
fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let end = start + chrono::Duration::days(1);
    (fmt_dt(&start), fmt_dt(&end))
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, first_name, last_name, email, phone, password_hash, role, api_token, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user.id,
            user.first_name,
            user.last_name,
            user.email,
            user.phone,
            user.password_hash,
            user.role.as_str(),
            user.api_token,
            fmt_dt(&user.created_at),
            fmt_dt(&user.updated_at),
        ],
    )?;
    Ok(())
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        role: Role::parse(&role),
        api_token: row.get(7)?,
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, phone, password_hash, role, api_token, created_at, updated_at";

fn get_user_where(
    conn: &Connection,
    clause: &str,
    value: &str,
) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = ?1");
    let result = conn.query_row(&sql, params![value], |row| Ok(parse_user_row(row)));

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    get_user_where(conn, "id", id)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    get_user_where(conn, "email", email)
}

pub fn get_user_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<User>> {
    get_user_where(conn, "api_token", token)
}

pub fn set_api_token(conn: &Connection, user_id: &str, token: &str) -> anyhow::Result<()> {
    let now = fmt_dt(&Utc::now().naive_utc());
    conn.execute(
        "UPDATE users SET api_token = ?1, updated_at = ?2 WHERE id = ?3",
        params![token, now, user_id],
    )?;
    Ok(())
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description, price, duration_minutes, category, service_type, max_participants, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            service.id,
            service.name,
            service.description,
            service.price,
            service.duration_minutes,
            service.category,
            service.service_type,
            service.max_participants,
            service.is_active as i32,
            fmt_dt(&service.created_at),
            fmt_dt(&service.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, description = ?2, price = ?3, duration_minutes = ?4,
                category = ?5, service_type = ?6, max_participants = ?7, is_active = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            service.name,
            service.description,
            service.price,
            service.duration_minutes,
            service.category,
            service.service_type,
            service.max_participants,
            service.is_active as i32,
            fmt_dt(&service.updated_at),
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_service(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        duration_minutes: row.get(4)?,
        category: row.get(5)?,
        service_type: row.get(6)?,
        max_participants: row.get(7)?,
        is_active: row.get::<_, i32>(8)? != 0,
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

const SERVICE_COLUMNS: &str =
    "id, name, description, price, duration_minutes, category, service_type, max_participants, is_active, created_at, updated_at";

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_service_row(row)));

    match result {
        Ok(service) => Ok(Some(service?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_services(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Service>> {
    let sql = if active_only {
        format!("SELECT {SERVICE_COLUMNS} FROM services WHERE is_active = 1 ORDER BY name ASC")
    } else {
        format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY name ASC")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, client_id, service_id, booking_date, start_time, end_time, status, \
     base_price, additional_fees, discount, total_amount, currency, payment_status, \
     participant_count, participant_details, location_type, location_address, location_notes, \
     photographer_name, photographer_email, photographer_phone, photographer_assigned_at, \
     special_requests, client_notes, admin_notes, confirmed_at, \
     cancellation_reason, cancelled_by, cancelled_at, refund_status, \
     checkout_session_id, payment_ref, created_by, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let booking_date: String = row.get(3)?;
    let status: String = row.get(6)?;
    let payment_status: String = row.get(12)?;
    let details_json: String = row.get(14)?;
    let address_json: String = row.get(16)?;
    let assigned_at: Option<String> = row.get(21)?;
    let confirmed_at: Option<String> = row.get(25)?;
    let cancellation_reason: Option<String> = row.get(26)?;
    let cancelled_by: Option<String> = row.get(27)?;
    let cancelled_at: Option<String> = row.get(28)?;
    let refund_status: Option<String> = row.get(29)?;
    let created_at: String = row.get(33)?;
    let updated_at: String = row.get(34)?;

    let cancellation = match (cancellation_reason, cancelled_by, cancelled_at) {
        (Some(reason), Some(by), Some(at)) => Some(Cancellation {
            reason,
            cancelled_by: by,
            cancelled_at: parse_dt(&at),
            refund_status: refund_status.unwrap_or_else(|| "none".to_string()),
        }),
        _ => None,
    };

    Ok(Booking {
        id: row.get(0)?,
        client_id: row.get(1)?,
        service_id: row.get(2)?,
        booking_date: parse_dt(&booking_date).date(),
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: BookingStatus::parse(&status).unwrap_or(BookingStatus::Pending),
        pricing: Pricing {
            base_price: row.get(7)?,
            additional_fees: row.get(8)?,
            discount: row.get(9)?,
            total_amount: row.get(10)?,
            currency: row.get(11)?,
            payment_status: PaymentStatus::parse(&payment_status).unwrap_or(PaymentStatus::Pending),
        },
        participants: Participants {
            count: row.get(13)?,
            details: serde_json::from_str(&details_json).unwrap_or_default(),
        },
        location: Location {
            kind: row.get(15)?,
            address: serde_json::from_str(&address_json).unwrap_or_default(),
            notes: row.get(17)?,
        },
        photographer: Photographer {
            name: row.get(18)?,
            email: row.get(19)?,
            phone: row.get(20)?,
            assigned_at: assigned_at.as_deref().map(parse_dt),
        },
        special_requests: row.get(22)?,
        client_notes: row.get(23)?,
        admin_notes: row.get(24)?,
        confirmed_at: confirmed_at.as_deref().map(parse_dt),
        cancellation,
        checkout_session_id: row.get(30)?,
        payment_ref: row.get(31)?,
        created_by: row.get(32)?,
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

fn booking_write_params(booking: &Booking) -> anyhow::Result<Vec<Box<dyn rusqlite::types::ToSql>>> {
    let date_midnight = booking
        .booking_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid");
    let (reason, by, at, refund) = match &booking.cancellation {
        Some(c) => (
            Some(c.reason.clone()),
            Some(c.cancelled_by.clone()),
            Some(fmt_dt(&c.cancelled_at)),
            Some(c.refund_status.clone()),
        ),
        None => (None, None, None, None),
    };

    Ok(vec![
        Box::new(booking.id.clone()),
        Box::new(booking.client_id.clone()),
        Box::new(booking.service_id.clone()),
        Box::new(fmt_dt(&date_midnight)),
        Box::new(booking.start_time.clone()),
        Box::new(booking.end_time.clone()),
        Box::new(booking.status.as_str()),
        Box::new(booking.pricing.base_price),
        Box::new(booking.pricing.additional_fees),
        Box::new(booking.pricing.discount),
        Box::new(booking.pricing.total_amount),
        Box::new(booking.pricing.currency.clone()),
        Box::new(booking.pricing.payment_status.as_str()),
        Box::new(booking.participants.count),
        Box::new(serde_json::to_string(&booking.participants.details)?),
        Box::new(booking.location.kind.clone()),
        Box::new(serde_json::to_string(&booking.location.address)?),
        Box::new(booking.location.notes.clone()),
        Box::new(booking.photographer.name.clone()),
        Box::new(booking.photographer.email.clone()),
        Box::new(booking.photographer.phone.clone()),
        Box::new(booking.photographer.assigned_at.as_ref().map(fmt_dt)),
        Box::new(booking.special_requests.clone()),
        Box::new(booking.client_notes.clone()),
        Box::new(booking.admin_notes.clone()),
        Box::new(booking.confirmed_at.as_ref().map(fmt_dt)),
        Box::new(reason),
        Box::new(by),
        Box::new(at),
        Box::new(refund),
        Box::new(booking.checkout_session_id.clone()),
        Box::new(booking.payment_ref.clone()),
        Box::new(booking.created_by.clone()),
        Box::new(fmt_dt(&booking.created_at)),
        Box::new(fmt_dt(&booking.updated_at)),
    ])
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let values = booking_write_params(booking)?;
    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let placeholders = (1..=values.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES ({placeholders})");
    conn.execute(&sql, refs.as_slice())?;
    Ok(())
}

pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let values = booking_write_params(booking)?;
    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let assignments = BOOKING_COLUMNS
        .split(", ")
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", col.trim(), i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE bookings SET {assignments} WHERE id = ?1");
    let count = conn.execute(&sql, refs.as_slice())?;
    Ok(count > 0)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_session(
    conn: &Connection,
    session_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE checkout_session_id = ?1");
    let result = conn.query_row(&sql, params![session_id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Conflict query of the availability engine: active bookings on the same
/// calendar day whose `[start, end)` interval overlaps the candidate.
/// Time-of-day strings are zero-padded `HH:MM`, so lexicographic comparison
/// is chronological.
pub fn count_conflicts(
    conn: &Connection,
    date: NaiveDate,
    start_time: &str,
    end_time: &str,
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<i64> {
    let (day_start, day_end) = day_bounds(date);

    let count: i64 = match exclude_booking_id {
        Some(exclude) => conn.query_row(
            "SELECT COUNT(*) FROM bookings
             WHERE booking_date >= ?1 AND booking_date < ?2
               AND status IN ('pending', 'confirmed')
               AND start_time < ?3 AND end_time > ?4
               AND id != ?5",
            params![day_start, day_end, end_time, start_time, exclude],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM bookings
             WHERE booking_date >= ?1 AND booking_date < ?2
               AND status IN ('pending', 'confirmed')
               AND start_time < ?3 AND end_time > ?4",
            params![day_start, day_end, end_time, start_time],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

#[derive(Debug, Default)]
pub struct BookingFilter {
    pub client_id: Option<String>,
    pub service_id: Option<String>,
    pub status: Option<String>,
    pub photographer: Option<String>,
    pub date: Option<NaiveDate>,
}

fn filter_clauses(
    filter: &BookingFilter,
) -> (Vec<String>, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut clauses = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(client_id) = &filter.client_id {
        values.push(Box::new(client_id.clone()));
        clauses.push(format!("client_id = ?{}", values.len()));
    }
    if let Some(service_id) = &filter.service_id {
        values.push(Box::new(service_id.clone()));
        clauses.push(format!("service_id = ?{}", values.len()));
    }
    if let Some(status) = &filter.status {
        values.push(Box::new(status.clone()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(photographer) = &filter.photographer {
        values.push(Box::new(format!("%{photographer}%")));
        clauses.push(format!("photographer_name LIKE ?{}", values.len()));
    }
    if let Some(date) = filter.date {
        let (day_start, day_end) = day_bounds(date);
        values.push(Box::new(day_start));
        clauses.push(format!("booking_date >= ?{}", values.len()));
        values.push(Box::new(day_end));
        clauses.push(format!("booking_date < ?{}", values.len()));
    }

    (clauses, values)
}

pub fn list_bookings(
    conn: &Connection,
    filter: &BookingFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (clauses, mut values) = filter_clauses(filter);
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    values.push(Box::new(limit));
    let limit_idx = values.len();
    values.push(Box::new(offset));
    let offset_idx = values.len();

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_sql}
         ORDER BY booking_date DESC, start_time DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );

    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn count_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<i64> {
    let (clauses, values) = filter_clauses(filter);
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!("SELECT COUNT(*) FROM bookings {where_sql}");
    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let count = conn.query_row(&sql, refs.as_slice(), |row| row.get(0))?;
    Ok(count)
}

/// Removes the booking row; status history and dependent notifications go
/// with it through the cascading foreign keys.
pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn set_checkout_session(
    conn: &Connection,
    booking_id: &str,
    session_id: &str,
) -> anyhow::Result<()> {
    let now = fmt_dt(&Utc::now().naive_utc());
    conn.execute(
        "UPDATE bookings SET checkout_session_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![session_id, now, booking_id],
    )?;
    Ok(())
}

// ── Status history ──

pub fn insert_status_change(
    conn: &Connection,
    booking_id: &str,
    change: &StatusChange,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO status_history (booking_id, status, changed_by, changed_at, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            booking_id,
            change.status.as_str(),
            change.changed_by,
            fmt_dt(&change.changed_at),
            change.reason,
        ],
    )?;
    Ok(())
}

pub fn get_status_history(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<StatusChange>> {
    let mut stmt = conn.prepare(
        "SELECT status, changed_by, changed_at, reason FROM status_history
         WHERE booking_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        let status: String = row.get(0)?;
        let changed_at: String = row.get(2)?;
        Ok(StatusChange {
            status: BookingStatus::parse(&status).unwrap_or(BookingStatus::Pending),
            changed_by: row.get(1)?,
            changed_at: parse_dt(&changed_at),
            reason: row.get(3)?,
        })
    })?;

    let mut history = vec![];
    for row in rows {
        history.push(row?);
    }
    Ok(history)
}

// ── Notifications ──

pub fn insert_notification(conn: &Connection, notification: &Notification) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, booking_id, kind, title, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            notification.id,
            notification.user_id,
            notification.booking_id,
            notification.kind.as_str(),
            notification.title,
            notification.message,
            notification.is_read as i32,
            fmt_dt(&notification.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, booking_id, kind, title, message, is_read, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![user_id, limit], |row| {
        let kind: String = row.get(3)?;
        let created_at: String = row.get(7)?;
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            booking_id: row.get(2)?,
            kind: NotificationKind::parse(&kind).unwrap_or(NotificationKind::BookingConfirmed),
            title: row.get(4)?,
            message: row.get(5)?,
            is_read: row.get::<_, i32>(6)? != 0,
            created_at: parse_dt(&created_at),
        })
    })?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn mark_notification_read(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}
