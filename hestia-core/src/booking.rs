use crate::payment::PaymentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking state as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

/// The backend's view of a booking, as returned by the read endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub updated_at: DateTime<Utc>,
}

impl BookingRecord {
    /// A booking only counts as settled once it is confirmed and paid.
    pub fn is_settled(&self) -> bool {
        self.status == BookingStatus::Confirmed && self.payment_status == PaymentStatus::Paid
    }
}

/// Contact details the backend requires for multi-room bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}
