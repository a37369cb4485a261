use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bookable offering. Read-only input to booking validation: its price
/// drives the total amount, its duration feeds slot enumeration and its
/// participant cap bounds the booking's party size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub category: String,
    pub service_type: String,
    pub max_participants: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
