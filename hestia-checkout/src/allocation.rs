use hestia_catalog::room::Room;
use serde::{Deserialize, Serialize};

/// A room offered to the allocator, paired with its resolved free units.
#[derive(Debug, Clone)]
pub struct CandidateRoom {
    pub room: Room,
    pub units_free: i32,
}

/// One allocated room type and how many of its units to book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPick {
    pub room: Room,
    pub units: i32,
}

impl RoomPick {
    /// Occupants this pick can sleep.
    pub fn covered_capacity(&self) -> i32 {
        self.room.capacity * self.units
    }
}

/// Outcome of an automatic allocation. Computed fresh on every change to
/// guests, dates or candidate rooms; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub picks: Vec<RoomPick>,
    pub success: bool,
    /// Guests not covered by the achieved allocation.
    pub shortfall: i32,
}

impl AllocationResult {
    pub fn covered_capacity(&self) -> i32 {
        self.picks.iter().map(RoomPick::covered_capacity).sum()
    }

    pub fn total_units(&self) -> i32 {
        self.picks.iter().map(|pick| pick.units).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Guest count must be positive")]
    NoGuests,
}

fn units_needed(guests: i32, capacity: i32) -> i32 {
    (guests + capacity - 1) / capacity
}

/// Cover `total_guests` with the fewest, largest-capacity rooms first.
///
/// Rooms out of service are skipped, candidates are consumed in descending
/// capacity order (equal capacities keep their input order), and each room
/// contributes at most its free unit count. A non-positive guest count is a
/// caller input error, not a trivially satisfied request.
pub fn auto_allocate_by_guests(
    rooms: &[CandidateRoom],
    total_guests: i32,
) -> Result<AllocationResult, AllocationError> {
    if total_guests <= 0 {
        return Err(AllocationError::NoGuests);
    }

    let mut candidates: Vec<&CandidateRoom> = rooms
        .iter()
        .filter(|c| c.room.is_bookable() && c.room.capacity > 0 && c.units_free > 0)
        .collect();
    candidates.sort_by(|a, b| b.room.capacity.cmp(&a.room.capacity));

    let mut remaining = total_guests;
    let mut picks = Vec::new();
    for candidate in candidates {
        if remaining <= 0 {
            break;
        }
        let capacity = candidate.room.capacity;
        let take = units_needed(remaining, capacity).min(candidate.units_free);
        if take == 0 {
            continue;
        }
        picks.push(RoomPick {
            room: candidate.room.clone(),
            units: take,
        });
        remaining -= take * capacity;
    }

    Ok(AllocationResult {
        success: remaining <= 0,
        shortfall: remaining.max(0),
        picks,
    })
}

/// Suggest exactly `rooms_needed` room picks (duplicates allowed), one entry
/// per unit.
///
/// Largest-capacity types are consumed first, never taking more than the
/// remaining quota from one type; leftover quota is backfilled with the
/// smallest type so large rooms are not over-provisioned. The suggestion
/// never fails and may be under-capacity; the caller checks sufficiency
/// before treating it as bookable. Only an empty candidate set yields an
/// empty suggestion.
pub fn suggest_combo(rooms: &[CandidateRoom], total_guests: i32, rooms_needed: i32) -> Vec<Room> {
    if rooms_needed <= 0 {
        return Vec::new();
    }
    let needed = rooms_needed as usize;

    let mut available: Vec<&CandidateRoom> = rooms
        .iter()
        .filter(|c| c.room.is_bookable() && c.room.capacity > 0)
        .collect();
    if available.is_empty() {
        return Vec::new();
    }
    available.sort_by(|a, b| b.room.capacity.cmp(&a.room.capacity));

    if available.len() == 1 {
        return std::iter::repeat(available[0].room.clone())
            .take(needed)
            .collect();
    }

    let mut picks: Vec<Room> = Vec::with_capacity(needed);
    let mut remaining = total_guests;
    for candidate in &available {
        if picks.len() >= needed || remaining <= 0 {
            break;
        }
        let capacity = candidate.room.capacity;
        let quota = needed - picks.len();
        let take = (units_needed(remaining.max(0), capacity) as usize).min(quota);
        for _ in 0..take {
            picks.push(candidate.room.clone());
        }
        remaining -= take as i32 * capacity;
    }

    if let Some(smallest) = available.last() {
        while picks.len() < needed {
            picks.push(smallest.room.clone());
        }
    }
    picks
}
