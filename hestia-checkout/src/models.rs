use chrono::{DateTime, NaiveDate, Utc};
use hestia_core::payment::{PaymentStatus, TransferInstructions};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Children at or above this age occupy an adult-equivalent spot.
pub const ADULT_EQUIVALENT_AGE: u8 = 6;
/// Children below this age are not counted as occupants.
pub const CHILD_EQUIVALENT_MIN_AGE: u8 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildGuest {
    pub age: u8,
}

/// The stay a guest is asking for. Check-out is exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StayRequest {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub adults: i32,
    pub children: Vec<ChildGuest>,
    pub rooms_requested: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum StayError {
    #[error("Check-out must be after check-in")]
    InvalidDates,
    #[error("At least one occupant is required")]
    NoOccupants,
}

impl StayRequest {
    pub fn validate(&self) -> Result<(), StayError> {
        if self.checkout <= self.checkin {
            return Err(StayError::InvalidDates);
        }
        if self.occupants() < 1 {
            return Err(StayError::NoOccupants);
        }
        Ok(())
    }

    pub fn nights(&self) -> i64 {
        (self.checkout - self.checkin).num_days().max(0)
    }

    /// Adults plus children old enough to take an adult spot.
    pub fn adult_equivalents(&self) -> i32 {
        let older_children = self
            .children
            .iter()
            .filter(|child| child.age >= ADULT_EQUIVALENT_AGE)
            .count() as i32;
        self.adults + older_children
    }

    /// Children in the counted child bracket.
    pub fn child_equivalents(&self) -> i32 {
        self.children
            .iter()
            .filter(|child| {
                child.age >= CHILD_EQUIVALENT_MIN_AGE && child.age < ADULT_EQUIVALENT_AGE
            })
            .count() as i32
    }

    /// Occupants a room allocation must cover. Infants below the child
    /// bracket share beds and are not separately counted.
    pub fn occupants(&self) -> i32 {
        self.adult_equivalents() + self.child_equivalents()
    }
}

/// The in-flight payment for a created booking. Terminal once paid,
/// canceled or expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub booking_id: Uuid,
    pub status: PaymentStatus,
    pub instructions: Option<TransferInstructions>,
    pub deadline: Option<DateTime<Utc>>,
}

impl PaymentSession {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stay_with_children(ages: &[u8]) -> StayRequest {
        StayRequest {
            checkin: date(2026, 9, 1),
            checkout: date(2026, 9, 3),
            adults: 2,
            children: ages.iter().map(|&age| ChildGuest { age }).collect(),
            rooms_requested: 1,
        }
    }

    #[test]
    fn test_children_rebucketed_by_age() {
        let stay = stay_with_children(&[8, 4, 1]);
        // 8-year-old joins the adults, 4-year-old counts as a child,
        // the infant is not counted
        assert_eq!(stay.adult_equivalents(), 3);
        assert_eq!(stay.child_equivalents(), 1);
        assert_eq!(stay.occupants(), 4);
    }

    #[test]
    fn test_nights_and_date_validation() {
        let stay = stay_with_children(&[]);
        assert_eq!(stay.nights(), 2);
        assert!(stay.validate().is_ok());

        let mut same_day = stay.clone();
        same_day.checkout = same_day.checkin;
        assert!(matches!(same_day.validate(), Err(StayError::InvalidDates)));
    }

    #[test]
    fn test_infants_alone_are_not_occupants() {
        let mut stay = stay_with_children(&[1]);
        stay.adults = 0;
        assert_eq!(stay.occupants(), 0);
        assert!(matches!(stay.validate(), Err(StayError::NoOccupants)));
    }
}
