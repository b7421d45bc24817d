use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Availability status of a room type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Maintenance,
    Busy,
}

/// A bookable room type. A room type may have several interchangeable
/// physical units; `total_units` counts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub name: String,
    pub base_rate_minor: i64,
    pub discounted_rate_minor: Option<i64>,
    /// Maximum occupants per unit.
    pub capacity: i32,
    pub total_units: i32,
    /// Per-date unit counts overriding `total_units` for that date.
    #[serde(default)]
    pub inventory_overrides: HashMap<NaiveDate, i32>,
    pub status: RoomStatus,
}

impl Room {
    /// The nightly rate pricing starts from: the discounted rate when one is
    /// set and positive, otherwise the base rate.
    pub fn effective_nightly_rate(&self) -> i64 {
        match self.discounted_rate_minor {
            Some(rate) if rate > 0 => rate,
            _ => self.base_rate_minor,
        }
    }

    /// Units sellable on a given date. An override never raises the count
    /// above `total_units`.
    pub fn units_on(&self, date: NaiveDate) -> i32 {
        self.inventory_overrides
            .get(&date)
            .copied()
            .unwrap_or(self.total_units)
            .min(self.total_units)
    }

    pub fn is_bookable(&self) -> bool {
        self.status == RoomStatus::Available
    }
}
