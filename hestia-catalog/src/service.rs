use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An add-on service the guest can attach to a booking (airport pickup,
/// breakfast, late checkout). Priced flat, never discounted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnService {
    pub id: Uuid,
    pub name: String,
    pub price_minor: i64,
}

/// Flat sum of the selected services' prices.
pub fn service_total(selected: &[AddOnService]) -> i64 {
    selected.iter().map(|service| service.price_minor.max(0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_total_is_flat_sum() {
        let services = vec![
            AddOnService {
                id: Uuid::new_v4(),
                name: "Airport pickup".to_string(),
                price_minor: 30_000,
            },
            AddOnService {
                id: Uuid::new_v4(),
                name: "Breakfast".to_string(),
                price_minor: 20_000,
            },
        ];
        assert_eq!(service_total(&services), 50_000);
        assert_eq!(service_total(&[]), 0);
    }
}
