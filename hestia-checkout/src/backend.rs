use crate::models::ChildGuest;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hestia_core::booking::{BookingRecord, CustomerDetails};
use hestia_core::payment::{GatewayProvider, PaymentMethod, TransferInstructions};
use hestia_core::BackendResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single-room booking creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub room_id: Uuid,
    pub units: i32,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub adults: i32,
    pub children: Vec<ChildGuest>,
    pub payment_method: PaymentMethod,
    #[serde(rename = "totalAmount")]
    pub total_minor: i64,
}

/// One room type and the unit count booked from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingLine {
    pub room_id: Uuid,
    pub units: i32,
}

/// Multi-room booking creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMultiBookingRequest {
    pub rooms: Vec<BookingLine>,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub adults: i32,
    pub children: Vec<ChildGuest>,
    pub payment_method: PaymentMethod,
    #[serde(rename = "totalAmount")]
    pub total_minor: i64,
    pub customer: CustomerDetails,
}

/// What the backend hands back when it accepts a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreated {
    pub booking: BookingRecord,
    pub instructions: Option<TransferInstructions>,
    pub payment_deadline: Option<DateTime<Utc>>,
}

/// Countdown state of a bank-transfer deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineStatus {
    #[serde(rename = "timeRemaining")]
    pub time_remaining_secs: i64,
    pub expired: bool,
}

/// Order details forwarded to an external payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub booking_id: Uuid,
    #[serde(rename = "orderId")]
    pub order_ref: String,
    #[serde(rename = "amount")]
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRedirect {
    pub pay_url: String,
}

/// Points granted by the loyalty checkout endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAward {
    pub points_earned: i64,
    pub total_points: i64,
}

/// The authoritative booking backend. The engine orchestrates; the backend
/// decides.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn create_booking(&self, req: &CreateBookingRequest) -> BackendResult<BookingCreated>;

    async fn create_multi_booking(
        &self,
        req: &CreateMultiBookingRequest,
    ) -> BackendResult<BookingCreated>;

    async fn booking_by_id(&self, booking_id: Uuid) -> BackendResult<BookingRecord>;

    /// Manual payment confirmation (the "simulate payment" action).
    async fn confirm_payment(&self, booking_id: Uuid) -> BackendResult<BookingRecord>;

    async fn payment_deadline(&self, booking_id: Uuid) -> BackendResult<DeadlineStatus>;

    async fn create_gateway_redirect(
        &self,
        provider: GatewayProvider,
        order: &GatewayOrder,
    ) -> BackendResult<GatewayRedirect>;

    async fn loyalty_checkout(&self, booking_id: Uuid) -> BackendResult<LoyaltyAward>;
}
