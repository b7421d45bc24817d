use crate::config::BackendConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use hestia_catalog::inventory::AvailabilitySource;
use hestia_catalog::pricing::{DiscountOutcome, DiscountService};
use hestia_catalog::room::Room;
use hestia_checkout::backend::{
    BookingBackend, BookingCreated, CreateBookingRequest, CreateMultiBookingRequest,
    DeadlineStatus, GatewayOrder, GatewayRedirect, LoyaltyAward,
};
use hestia_core::booking::BookingRecord;
use hestia_core::payment::GatewayProvider;
use hestia_core::{BackendError, BackendResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityRequest {
    room_id: Uuid,
    checkin: NaiveDate,
    checkout: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    available_units: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomLookupRequest {
    room_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyDiscountsRequest<'a> {
    codes: &'a [String],
    booking_value: i64,
    hotel_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoyaltyCheckoutRequest {
    booking_id: Uuid,
}

/// The booking backend over HTTP. One client instance serves every seam the
/// engine consumes.
pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> BackendResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Self::decode(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> BackendResult<R> {
        debug!("GET {}", path);
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Self::decode(response).await
    }

    async fn put_json<R: DeserializeOwned>(&self, path: &str) -> BackendResult<R> {
        debug!("PUT {}", path);
        let response = self
            .http
            .put(self.url(path))
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> BackendResult<R> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::NotFound(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(BackendError::Rejected(message));
        }
        response
            .json::<R>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }
}

#[async_trait]
impl AvailabilitySource for HttpBackend {
    async fn units_free(
        &self,
        room_id: Uuid,
        checkin: NaiveDate,
        checkout: NaiveDate,
    ) -> BackendResult<i32> {
        let response: AvailabilityResponse = self
            .post_json(
                "/rooms/check-availability",
                &AvailabilityRequest {
                    room_id,
                    checkin,
                    checkout,
                },
            )
            .await?;
        Ok(response.available_units)
    }

    async fn room_by_id(&self, room_id: Uuid) -> BackendResult<Room> {
        self.post_json("/rooms/by-id", &RoomLookupRequest { room_id })
            .await
    }
}

#[async_trait]
impl DiscountService for HttpBackend {
    async fn apply(
        &self,
        codes: &[String],
        booking_value_minor: i64,
        hotel_id: Uuid,
    ) -> BackendResult<DiscountOutcome> {
        self.post_json(
            "/discounts/apply",
            &ApplyDiscountsRequest {
                codes,
                booking_value: booking_value_minor,
                hotel_id,
            },
        )
        .await
    }
}

#[async_trait]
impl BookingBackend for HttpBackend {
    async fn create_booking(&self, req: &CreateBookingRequest) -> BackendResult<BookingCreated> {
        self.post_json("/bookings/create", req).await
    }

    async fn create_multi_booking(
        &self,
        req: &CreateMultiBookingRequest,
    ) -> BackendResult<BookingCreated> {
        self.post_json("/bookings/create-multi", req).await
    }

    async fn booking_by_id(&self, booking_id: Uuid) -> BackendResult<BookingRecord> {
        self.get_json(&format!("/bookings/{}", booking_id)).await
    }

    async fn confirm_payment(&self, booking_id: Uuid) -> BackendResult<BookingRecord> {
        self.put_json(&format!("/bookings/{}/confirm", booking_id))
            .await
    }

    async fn payment_deadline(&self, booking_id: Uuid) -> BackendResult<DeadlineStatus> {
        self.get_json(&format!("/bookings/{}/payment-deadline", booking_id))
            .await
    }

    async fn create_gateway_redirect(
        &self,
        provider: GatewayProvider,
        order: &GatewayOrder,
    ) -> BackendResult<GatewayRedirect> {
        self.post_json(&format!("/payments/{}/create", provider.slug()), order)
            .await
    }

    async fn loyalty_checkout(&self, booking_id: Uuid) -> BackendResult<LoyaltyAward> {
        self.post_json("/bookings/checkout", &LoyaltyCheckoutRequest { booking_id })
            .await
    }
}
