use crate::backend::BookingBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A recorded points award for a settled booking. Created at most once per
/// booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyTransaction {
    pub booking_id: Uuid,
    pub points_earned: i64,
    pub total_points: i64,
    pub completed: bool,
}

/// Awards loyalty points when a booking settles. Failures never roll the
/// booking back; at worst the guest keeps their booking and misses points.
pub struct LoyaltyTrigger {
    backend: Arc<dyn BookingBackend>,
}

impl LoyaltyTrigger {
    pub fn new(backend: Arc<dyn BookingBackend>) -> Self {
        Self { backend }
    }

    /// Re-reads the booking and, only if it is confirmed and paid, runs the
    /// loyalty checkout. A locally-cached "paid" is never trusted.
    pub async fn on_booking_settled(&self, booking_id: Uuid) -> Option<LoyaltyTransaction> {
        let record = match self.backend.booking_by_id(booking_id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    "Skipping points for booking {}: re-read failed: {}",
                    booking_id, err
                );
                return None;
            }
        };

        if !record.is_settled() {
            info!(
                "Booking {} not confirmed+paid yet, no points awarded",
                booking_id
            );
            return None;
        }

        match self.backend.loyalty_checkout(booking_id).await {
            Ok(award) => {
                info!(
                    "Awarded {} points for booking {} (balance {})",
                    award.points_earned, booking_id, award.total_points
                );
                Some(LoyaltyTransaction {
                    booking_id,
                    points_earned: award.points_earned,
                    total_points: award.total_points,
                    completed: true,
                })
            }
            Err(err) => {
                warn!("Points award failed for booking {}: {}", booking_id, err);
                None
            }
        }
    }
}
