use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries::fmt_dt;
use crate::models::BookingStatus;

#[derive(Debug, Serialize)]
pub struct TopService {
    pub service_id: String,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct TopPhotographer {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingStats {
    pub total_bookings: i64,
    /// One entry per status, zero included.
    pub by_status: BTreeMap<&'static str, i64>,
    /// Sum of total amounts over confirmed and completed bookings.
    pub total_revenue: f64,
    /// Mean total amount across every booking in range, regardless of status.
    pub average_booking_value: f64,
    pub total_discounts: f64,
    pub top_services: Vec<TopService>,
    pub top_photographers: Vec<TopPhotographer>,
}

fn range_clause(
    range: Option<(NaiveDateTime, NaiveDateTime)>,
    prefix: &str,
) -> (String, Vec<String>) {
    match range {
        Some((from, to)) => (
            format!("{prefix}created_at >= ? AND {prefix}created_at <= ?"),
            vec![fmt_dt(&from), fmt_dt(&to)],
        ),
        None => ("1 = 1".to_string(), vec![]),
    }
}

/// Aggregates booking statistics, optionally restricted to bookings created
/// within an inclusive timestamp range.
pub fn compute_stats(
    conn: &Connection,
    range: Option<(NaiveDateTime, NaiveDateTime)>,
) -> anyhow::Result<BookingStats> {
    let (clause, params) = range_clause(range, "");
    let refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();

    let mut by_status: BTreeMap<&'static str, i64> = BTreeMap::new();
    for status in BookingStatus::ALL {
        by_status.insert(status.as_str(), 0);
    }

    let mut total_bookings = 0;
    {
        let sql = format!("SELECT status, COUNT(*) FROM bookings WHERE {clause} GROUP BY status");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            total_bookings += count;
            if let Some(parsed) = BookingStatus::parse(&status) {
                by_status.insert(parsed.as_str(), count);
            }
        }
    }

    let sql = format!(
        "SELECT COALESCE(SUM(total_amount), 0) FROM bookings
         WHERE {clause} AND status IN ('confirmed', 'completed')"
    );
    let total_revenue: f64 = conn.query_row(&sql, refs.as_slice(), |row| row.get(0))?;

    // averaged over every booking in range, whatever its status
    let sql = format!("SELECT COALESCE(AVG(total_amount), 0) FROM bookings WHERE {clause}");
    let average_booking_value: f64 = conn.query_row(&sql, refs.as_slice(), |row| row.get(0))?;

    let sql = format!("SELECT COALESCE(SUM(discount), 0) FROM bookings WHERE {clause}");
    let total_discounts: f64 = conn.query_row(&sql, refs.as_slice(), |row| row.get(0))?;

    // ties resolve to the earliest-created entry
    let (b_clause, b_params) = range_clause(range, "b.");
    let b_refs: Vec<&dyn rusqlite::types::ToSql> =
        b_params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();

    let mut top_services = vec![];
    {
        let sql = format!(
            "SELECT b.service_id, s.name, COUNT(*) AS n
             FROM bookings b JOIN services s ON s.id = b.service_id
             WHERE {b_clause}
             GROUP BY b.service_id
             ORDER BY n DESC, MIN(b.rowid) ASC
             LIMIT 5"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(b_refs.as_slice(), |row| {
            Ok(TopService {
                service_id: row.get(0)?,
                name: row.get(1)?,
                count: row.get(2)?,
            })
        })?;
        for row in rows {
            top_services.push(row?);
        }
    }

    let mut top_photographers = vec![];
    {
        let sql = format!(
            "SELECT b.photographer_name, COUNT(*) AS n
             FROM bookings b
             WHERE {b_clause} AND b.photographer_name != 'unassigned'
             GROUP BY b.photographer_name
             ORDER BY n DESC, MIN(b.rowid) ASC
             LIMIT 5"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(b_refs.as_slice(), |row| {
            Ok(TopPhotographer {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        for row in rows {
            top_photographers.push(row?);
        }
    }

    Ok(BookingStats {
        total_bookings,
        by_status,
        total_revenue,
        average_booking_value,
        total_discounts,
        top_services,
        top_photographers,
    })
}
