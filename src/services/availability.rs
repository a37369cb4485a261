use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::minutes_to_time;

/// Business hours: 09:00 to 18:00.
pub const OPENING_MINUTES: i32 = 9 * 60;
pub const CLOSING_MINUTES: i32 = 18 * 60;
/// Candidate slot starts are stepped every half hour.
pub const SLOT_STEP_MINUTES: i32 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlot {
    pub start_time: String,
    pub end_time: String,
    pub duration: i32,
}

/// Side-effect-free conflict check: true iff no pending or confirmed booking
/// on `date` overlaps `[start_time, end_time)`. `exclude_booking_id` lets a
/// booking being edited be re-checked against everyone but itself.
pub fn is_slot_available(
    conn: &Connection,
    date: NaiveDate,
    start_time: &str,
    end_time: &str,
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<bool> {
    let conflicts =
        queries::count_conflicts(conn, date, start_time, end_time, exclude_booking_id)?;
    Ok(conflicts == 0)
}

/// Enumerates the free slots of `duration_minutes` within business hours,
/// ascending by start time. A fully booked day yields an empty list, as does
/// a duration longer than the business-hours window.
pub fn list_available_slots(
    conn: &Connection,
    date: NaiveDate,
    duration_minutes: i32,
) -> anyhow::Result<Vec<AvailableSlot>> {
    let mut slots = vec![];
    if duration_minutes <= 0 {
        return Ok(slots);
    }

    let mut start = OPENING_MINUTES;
    while start + duration_minutes <= CLOSING_MINUTES {
        let start_time = minutes_to_time(start);
        let end_time = minutes_to_time(start + duration_minutes);

        if is_slot_available(conn, date, &start_time, &end_time, None)? {
            slots.push(AvailableSlot {
                start_time,
                end_time,
                duration: duration_minutes,
            });
        }

        start += SLOT_STEP_MINUTES;
    }

    Ok(slots)
}

/// Overlap test on two same-day intervals, used where both sides are already
/// in memory. Matches the SQL predicate in `queries::count_conflicts`.
pub fn overlaps(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    a_start < b_end && a_end > b_start
}
