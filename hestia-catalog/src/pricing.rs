use crate::room::Room;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use hestia_core::BackendResult;

/// How a seasonal discount reduces the nightly rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeasonalRate {
    /// Percentage of the nightly rate, 0..=100.
    Percent(u32),
    /// Fixed amount off each night, in minor units.
    FixedPerNight(i64),
}

/// A time-boxed, hotel-scoped discount applied to the nightly rate before
/// any voucher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalDiscount {
    pub id: Uuid,
    pub name: String,
    pub rate: SeasonalRate,
    pub hotel_ids: HashSet<Uuid>,
}

impl SeasonalDiscount {
    pub fn applies_to(&self, hotel_id: Uuid) -> bool {
        self.hotel_ids.contains(&hotel_id)
    }

    /// Discount per night per unit, in minor units.
    pub fn amount_per_night(&self, nightly_rate_minor: i64) -> i64 {
        match self.rate {
            SeasonalRate::Percent(pct) => nightly_rate_minor * i64::from(pct) / 100,
            SeasonalRate::FixedPerNight(amount) => amount,
        }
    }
}

/// A voucher code the external discount service has priced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub code: String,
    #[serde(rename = "amount")]
    pub amount_minor: i64,
}

/// Result of resolving voucher codes against a booking value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscountOutcome {
    #[serde(rename = "appliedDiscounts")]
    pub applied: Vec<AppliedDiscount>,
    #[serde(rename = "totalDiscountAmount")]
    pub total_discount_minor: i64,
}

/// External discount service resolving voucher codes against the
/// post-seasonal booking value.
#[async_trait]
pub trait DiscountService: Send + Sync {
    async fn apply(
        &self,
        codes: &[String],
        booking_value_minor: i64,
        hotel_id: Uuid,
    ) -> BackendResult<DiscountOutcome>;
}

/// The priced stay, term by term. The seasonal and voucher figures are the
/// applied (clamped) amounts, so `base - seasonal - voucher + services`
/// always equals the grand total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub base_minor: i64,
    pub seasonal_minor: i64,
    pub voucher_minor: i64,
    pub service_minor: i64,
    pub grand_total_minor: i64,
}

/// Compute the payable total for `units` of a room over `nights` nights.
///
/// Order of operations matters: the discounts are not commutative under the
/// zero-floor clamp. Base first, then the seasonal discount (zero when the
/// room's hotel is outside the discount's hotel set), then the voucher
/// amount resolved against the post-seasonal value, then add-on services
/// added last.
pub fn compute_total(
    room: &Room,
    nights: i64,
    units: i64,
    seasonal: Option<&SeasonalDiscount>,
    voucher_minor: i64,
    service_minor: i64,
) -> PriceBreakdown {
    let nights = nights.max(0);
    let units = units.max(0);
    let nightly_rate = room.effective_nightly_rate().max(0);

    let base = nightly_rate * nights * units;

    let seasonal_amount = seasonal
        .filter(|discount| discount.applies_to(room.hotel_id))
        .map(|discount| discount.amount_per_night(nightly_rate) * nights * units)
        .unwrap_or(0);
    let seasonal_applied = seasonal_amount.clamp(0, base);
    let after_seasonal = base - seasonal_applied;

    let voucher_applied = voucher_minor.clamp(0, after_seasonal);
    let after_voucher = after_seasonal - voucher_applied;

    let service_total = service_minor.max(0);

    PriceBreakdown {
        base_minor: base,
        seasonal_minor: seasonal_applied,
        voucher_minor: voucher_applied,
        service_minor: service_total,
        grand_total_minor: after_voucher + service_total,
    }
}
