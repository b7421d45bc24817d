use crate::room::Room;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use hestia_core::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// An existing booking occupying units of a room over `[checkin, checkout)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedStay {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub units: i32,
}

impl BookedStay {
    /// Checkout is exclusive: a stay ending on a date does not occupy it.
    pub fn occupies(&self, date: NaiveDate) -> bool {
        self.checkin <= date && date < self.checkout
    }
}

/// Free units over a stay, computed as the minimum over its days.
///
/// Each day starts from the per-date override (else the room's total unit
/// count) and subtracts every overlapping booked stay. A stay is only as
/// available as its tightest day. An invalid or empty date range degrades to
/// the raw total unit count, since no date filter can be applied.
pub fn min_units_free(
    room: &Room,
    checkin: NaiveDate,
    checkout: NaiveDate,
    existing: &[BookedStay],
) -> i32 {
    if checkout <= checkin {
        return room.total_units;
    }

    let mut min_free = i32::MAX;
    for date in checkin.iter_days().take_while(|d| *d < checkout) {
        let booked: i32 = existing
            .iter()
            .filter(|stay| stay.occupies(date))
            .map(|stay| stay.units)
            .sum();
        let free = (room.units_on(date) - booked).max(0);
        min_free = min_free.min(free);
    }
    min_free
}

/// Backend seam for per-room availability and room lookups.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Free units for the room over `[checkin, checkout)`.
    async fn units_free(
        &self,
        room_id: Uuid,
        checkin: NaiveDate,
        checkout: NaiveDate,
    ) -> BackendResult<i32>;

    async fn room_by_id(&self, room_id: Uuid) -> BackendResult<Room>;
}

/// Broadcast whenever a room's availability has been re-resolved, so
/// dependent views recompute without a full reload.
#[derive(Debug, Clone)]
pub struct AvailabilityUpdate {
    pub room_id: Uuid,
    pub units_free: i32,
}

/// Outcome of one availability refresh over a candidate room set.
#[derive(Debug, Default)]
pub struct AvailabilityReport {
    pub units_free: HashMap<Uuid, i32>,
    pub failures: Vec<(Uuid, BackendError)>,
}

impl AvailabilityReport {
    pub fn units_for(&self, room_id: Uuid) -> Option<i32> {
        self.units_free.get(&room_id).copied()
    }
}

/// Re-resolves availability for a candidate room set whenever the stay dates
/// change. Checks run with a bounded fan-out and every result is attributed
/// back to its originating room id, never by response order.
pub struct InventoryResolver {
    source: Arc<dyn AvailabilitySource>,
    max_in_flight: usize,
    updates: broadcast::Sender<AvailabilityUpdate>,
}

impl InventoryResolver {
    pub fn new(source: Arc<dyn AvailabilitySource>, max_in_flight: usize) -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            source,
            max_in_flight: max_in_flight.max(1),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AvailabilityUpdate> {
        self.updates.subscribe()
    }

    /// Resolve free units for every candidate room. A failed check only
    /// drops that room from the report; the rest of the batch still resolves.
    pub async fn refresh(
        &self,
        room_ids: &[Uuid],
        checkin: NaiveDate,
        checkout: NaiveDate,
    ) -> AvailabilityReport {
        let results: Vec<(Uuid, BackendResult<i32>)> = stream::iter(room_ids.iter().copied())
            .map(|room_id| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.units_free(room_id, checkin, checkout).await;
                    (room_id, result)
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut report = AvailabilityReport::default();
        for (room_id, result) in results {
            match result {
                Ok(units_free) => {
                    report.units_free.insert(room_id, units_free);
                    let _ = self.updates.send(AvailabilityUpdate {
                        room_id,
                        units_free,
                    });
                }
                Err(err) => {
                    tracing::warn!("Availability check failed for room {}: {}", room_id, err);
                    report.failures.push((room_id, err));
                }
            }
        }
        report
    }
}
