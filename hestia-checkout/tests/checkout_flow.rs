use async_trait::async_trait;
use chrono::NaiveDate;
use hestia_catalog::inventory::{min_units_free, AvailabilitySource, BookedStay, InventoryResolver};
use hestia_catalog::pricing::{
    compute_total, AppliedDiscount, DiscountOutcome, DiscountService, SeasonalDiscount,
    SeasonalRate,
};
use hestia_catalog::room::{Room, RoomStatus};
use hestia_catalog::service::{service_total, AddOnService};
use hestia_checkout::allocation::{auto_allocate_by_guests, CandidateRoom};
use hestia_checkout::draft::{DraftStore, InMemoryDraftStorage};
use hestia_checkout::models::{ChildGuest, StayRequest};
use hestia_checkout::orchestrator::{
    CheckoutEvent, CheckoutOrchestrator, CheckoutRules, CheckoutState, MockBookingBackend,
};
use hestia_core::booking::CustomerDetails;
use hestia_core::payment::{PaymentMethod, PaymentStatus};
use hestia_core::{BackendError, BackendResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::Duration;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn room(name: &str, hotel_id: Uuid, capacity: i32, total_units: i32, rate_minor: i64) -> Room {
    Room {
        id: Uuid::new_v4(),
        hotel_id,
        name: name.to_string(),
        base_rate_minor: rate_minor,
        discounted_rate_minor: None,
        capacity,
        total_units,
        inventory_overrides: HashMap::new(),
        status: RoomStatus::Available,
    }
}

/// Catalog backend computing availability from booked stays, the way the
/// real backend does on its side of the wire.
struct InMemoryCatalog {
    rooms: HashMap<Uuid, Room>,
    booked: HashMap<Uuid, Vec<BookedStay>>,
}

#[async_trait]
impl AvailabilitySource for InMemoryCatalog {
    async fn units_free(
        &self,
        room_id: Uuid,
        checkin: NaiveDate,
        checkout: NaiveDate,
    ) -> BackendResult<i32> {
        let room = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| BackendError::NotFound(room_id.to_string()))?;
        let booked = self.booked.get(&room_id).cloned().unwrap_or_default();
        Ok(min_units_free(room, checkin, checkout, &booked))
    }

    async fn room_by_id(&self, room_id: Uuid) -> BackendResult<Room> {
        self.rooms
            .get(&room_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(room_id.to_string()))
    }
}

#[async_trait]
impl DiscountService for InMemoryCatalog {
    async fn apply(
        &self,
        codes: &[String],
        booking_value_minor: i64,
        _hotel_id: Uuid,
    ) -> BackendResult<DiscountOutcome> {
        let mut applied = Vec::new();
        let mut total = 0i64;
        for code in codes {
            if code == "WELCOME" {
                let amount = 100_000i64.min(booking_value_minor - total);
                applied.push(AppliedDiscount {
                    code: code.clone(),
                    amount_minor: amount,
                });
                total += amount;
            } else {
                return Err(BackendError::Rejected(format!("unknown code {}", code)));
            }
        }
        Ok(DiscountOutcome {
            applied,
            total_discount_minor: total,
        })
    }
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<CheckoutEvent>) -> Vec<CheckoutEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_full_bank_transfer_flow_settles_and_awards_points() {
    init_tracing();

    let hotel_id = Uuid::new_v4();
    let suite = room("Family Suite", hotel_id, 4, 2, 1_000_000);
    let double = room("Standard Double", hotel_id, 2, 5, 600_000);
    let suite_id = suite.id;

    let mut booked = HashMap::new();
    booked.insert(
        suite_id,
        vec![BookedStay {
            checkin: date(2026, 9, 1),
            checkout: date(2026, 9, 2),
            units: 1,
        }],
    );
    let catalog = Arc::new(InMemoryCatalog {
        rooms: HashMap::from([(suite_id, suite.clone()), (double.id, double.clone())]),
        booked,
    });

    // Stay dates picked: availability re-resolves for every candidate room
    let stay = StayRequest {
        checkin: date(2026, 9, 1),
        checkout: date(2026, 9, 3),
        adults: 2,
        children: vec![ChildGuest { age: 7 }, ChildGuest { age: 3 }],
        rooms_requested: 1,
    };
    let resolver = InventoryResolver::new(catalog.clone(), 4);
    let report = resolver
        .refresh(&[suite_id, double.id], stay.checkin, stay.checkout)
        .await;
    assert_eq!(report.units_for(suite_id), Some(1));
    assert_eq!(report.units_for(double.id), Some(5));

    // Allocation covers the 4 occupants with the single free suite
    let candidates = vec![
        CandidateRoom {
            room: suite.clone(),
            units_free: 1,
        },
        CandidateRoom {
            room: double.clone(),
            units_free: 5,
        },
    ];
    let allocation = auto_allocate_by_guests(&candidates, stay.occupants()).unwrap();
    assert!(allocation.success);
    assert_eq!(allocation.picks[0].room.id, suite_id);

    // Pricing: 20% festival discount, WELCOME voucher, one add-on
    let seasonal = SeasonalDiscount {
        id: Uuid::new_v4(),
        name: "Festival Sale".to_string(),
        rate: SeasonalRate::Percent(20),
        hotel_ids: HashSet::from([hotel_id]),
    };
    let base_breakdown = compute_total(&suite, stay.nights(), 1, Some(&seasonal), 0, 0);
    let voucher = catalog
        .apply(
            &["WELCOME".to_string()],
            base_breakdown.grand_total_minor,
            hotel_id,
        )
        .await
        .unwrap();
    let services = vec![AddOnService {
        id: Uuid::new_v4(),
        name: "Airport pickup".to_string(),
        price_minor: 50_000,
    }];
    let breakdown = compute_total(
        &suite,
        stay.nights(),
        1,
        Some(&seasonal),
        voucher.total_discount_minor,
        service_total(&services),
    );
    assert_eq!(breakdown.base_minor, 2_000_000);
    assert_eq!(breakdown.grand_total_minor, 1_550_000);

    // The draft is the one source of truth the submission reads from
    let mut draft_store = DraftStore::open(Arc::new(InMemoryDraftStorage::default()))
        .await
        .unwrap();
    draft_store.set_stay(stay).await.unwrap();
    draft_store.set_room_units(suite_id, 1).await.unwrap();
    draft_store
        .set_payment_method(PaymentMethod::BankTransfer)
        .await
        .unwrap();
    draft_store
        .set_discount_codes(vec!["WELCOME".to_string()])
        .await
        .unwrap();
    draft_store.set_services(services).await.unwrap();
    draft_store
        .set_customer(CustomerDetails {
            full_name: "Mai Tran".to_string(),
            email: "mai@example.com".to_string(),
            phone: Some("+84 90 123 4567".to_string()),
        })
        .await
        .unwrap();

    let backend = Arc::new(MockBookingBackend::new());
    let orchestrator = CheckoutOrchestrator::new(backend.clone(), CheckoutRules::default());
    let mut events = orchestrator.subscribe();

    let state = orchestrator
        .submit(
            draft_store.draft(),
            &allocation.picks,
            breakdown.grand_total_minor,
        )
        .await
        .unwrap();
    assert_eq!(state, CheckoutState::AwaitingBankTransfer);

    // The transfer lands on the backend; the next poll observes it
    let booking_id = orchestrator.session().unwrap().booking_id;
    backend.settle_payment(booking_id);
    tokio::time::sleep(Duration::from_secs(40)).await;

    assert_eq!(orchestrator.state(), CheckoutState::Paid);
    assert_eq!(orchestrator.session().unwrap().status, PaymentStatus::Paid);
    assert_eq!(backend.loyalty_calls(), 1);

    let seen = drain_events(&mut events);
    assert!(seen
        .iter()
        .any(|e| matches!(e, CheckoutEvent::LoyaltyAwarded { points_earned: 50, .. })));

    draft_store.clear().await.unwrap();
    assert!(draft_store.draft().stay.is_none());
}

fn bank_transfer_draft() -> hestia_checkout::draft::BookingDraft {
    hestia_checkout::draft::BookingDraft {
        stay: Some(StayRequest {
            checkin: date(2026, 9, 1),
            checkout: date(2026, 9, 3),
            adults: 2,
            children: Vec::new(),
            rooms_requested: 1,
        }),
        payment_method: Some(PaymentMethod::BankTransfer),
        customer: Some(CustomerDetails {
            full_name: "Mai Tran".to_string(),
            email: "mai@example.com".to_string(),
            phone: None,
        }),
        ..Default::default()
    }
}

fn one_pick() -> Vec<hestia_checkout::allocation::RoomPick> {
    vec![hestia_checkout::allocation::RoomPick {
        room: room("Standard Double", Uuid::new_v4(), 2, 5, 600_000),
        units: 1,
    }]
}

#[tokio::test(start_paused = true)]
async fn test_deadline_expires_exactly_once() {
    init_tracing();

    let backend = Arc::new(MockBookingBackend::new());
    backend.expire_after_deadline_checks(2);
    let orchestrator = CheckoutOrchestrator::new(backend.clone(), CheckoutRules::default());
    let mut events = orchestrator.subscribe();

    orchestrator
        .submit(&bank_transfer_draft(), &one_pick(), 2_400_000)
        .await
        .unwrap();

    // First check at +5s sees time remaining, second at +35s sees expiry
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(orchestrator.state(), CheckoutState::Expired);
    assert_eq!(
        orchestrator.session().unwrap().status,
        PaymentStatus::Expired
    );

    let expiries = drain_events(&mut events)
        .iter()
        .filter(|e| matches!(e, CheckoutEvent::DeadlineExpired { .. }))
        .count();
    assert_eq!(expiries, 1);

    // Long after expiry nothing fires again and no points were touched
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(drain_events(&mut events).is_empty());
    assert_eq!(backend.deadline_checks(), 2);
    assert_eq!(backend.loyalty_calls(), 0);

    // The terminal state also refuses manual confirmation
    assert!(orchestrator.simulate_payment().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_backend_cancellation_is_observed_once() {
    init_tracing();

    let backend = Arc::new(MockBookingBackend::new());
    let orchestrator = CheckoutOrchestrator::new(backend.clone(), CheckoutRules::default());

    orchestrator
        .submit(&bank_transfer_draft(), &one_pick(), 2_400_000)
        .await
        .unwrap();
    let booking_id = orchestrator.session().unwrap().booking_id;
    backend.cancel_booking(booking_id);

    tokio::time::sleep(Duration::from_secs(40)).await;

    assert_eq!(orchestrator.state(), CheckoutState::Canceled);
    assert_eq!(
        orchestrator.session().unwrap().status,
        PaymentStatus::Canceled
    );
    assert_eq!(backend.loyalty_calls(), 0);
    assert!(orchestrator.simulate_payment().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_surfaces_and_stops_polling() {
    init_tracing();

    let backend = Arc::new(MockBookingBackend::new());
    let orchestrator = CheckoutOrchestrator::new(backend.clone(), CheckoutRules::default());
    let mut events = orchestrator.subscribe();

    orchestrator
        .submit(&bank_transfer_draft(), &one_pick(), 2_400_000)
        .await
        .unwrap();
    backend.set_fail_status_poll(true);

    tokio::time::sleep(Duration::from_secs(40)).await;

    // The failure is surfaced once and polling stops; the machine stays in
    // its last known-good state for a manual re-check
    let failures = drain_events(&mut events)
        .iter()
        .filter(|e| matches!(e, CheckoutEvent::PollFailed { .. }))
        .count();
    assert_eq!(failures, 1);
    assert_eq!(orchestrator.state(), CheckoutState::AwaitingBankTransfer);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(drain_events(&mut events).is_empty());
    assert_eq!(backend.deadline_checks(), 0);

    // Manual re-check still works once the backend recovers
    backend.set_fail_status_poll(false);
    orchestrator.simulate_payment().await.unwrap();
    assert_eq!(orchestrator.state(), CheckoutState::Paid);
}
