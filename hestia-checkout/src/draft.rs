use crate::backend::BookingLine;
use crate::models::StayRequest;
use async_trait::async_trait;
use hestia_catalog::service::AddOnService;
use hestia_core::booking::CustomerDetails;
use hestia_core::payment::PaymentMethod;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Everything the guest is editing on the booking screen. One instance per
/// screen, one writer path per field; discarded on navigation away or on
/// successful submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDraft {
    pub stay: Option<StayRequest>,
    pub rooms: Vec<BookingLine>,
    pub payment_method: Option<PaymentMethod>,
    pub discount_codes: Vec<String>,
    pub services: Vec<AddOnService>,
    pub customer: Option<CustomerDetails>,
    /// Bumped on every mutation; lets late subscribers detect staleness.
    pub revision: u64,
}

impl BookingDraft {
    pub fn units_for(&self, room_id: Uuid) -> i32 {
        self.rooms
            .iter()
            .find(|line| line.room_id == room_id)
            .map(|line| line.units)
            .unwrap_or(0)
    }
}

/// Which field of the draft just changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftEvent {
    StayChanged,
    RoomsChanged,
    PaymentMethodChanged,
    DiscountCodesChanged,
    ServicesChanged,
    CustomerChanged,
    Cleared,
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Draft storage failed: {0}")]
    Storage(String),
}

/// Where the draft survives between screen loads. In-memory for tests,
/// durable adapters plug in for production.
#[async_trait]
pub trait DraftStorage: Send + Sync {
    async fn save(&self, draft: &BookingDraft) -> Result<(), DraftError>;
    async fn load(&self) -> Result<Option<BookingDraft>, DraftError>;
    async fn clear(&self) -> Result<(), DraftError>;
}

#[derive(Default)]
pub struct InMemoryDraftStorage {
    slot: Mutex<Option<BookingDraft>>,
}

#[async_trait]
impl DraftStorage for InMemoryDraftStorage {
    async fn save(&self, draft: &BookingDraft) -> Result<(), DraftError> {
        *self.slot.lock().expect("draft storage lock poisoned") = Some(draft.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<BookingDraft>, DraftError> {
        Ok(self.slot.lock().expect("draft storage lock poisoned").clone())
    }

    async fn clear(&self) -> Result<(), DraftError> {
        *self.slot.lock().expect("draft storage lock poisoned") = None;
        Ok(())
    }
}

/// The single source of truth for the booking screen. The stay picker, the
/// room table and the payment form all write through here and subscribe
/// for changes; no component keeps its own copy of a field.
pub struct DraftStore {
    draft: BookingDraft,
    storage: Arc<dyn DraftStorage>,
    events: broadcast::Sender<DraftEvent>,
}

impl DraftStore {
    /// Open the store, resuming any persisted draft.
    pub async fn open(storage: Arc<dyn DraftStorage>) -> Result<Self, DraftError> {
        let draft = storage.load().await?.unwrap_or_default();
        let (events, _) = broadcast::channel(32);
        Ok(Self {
            draft,
            storage,
            events,
        })
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.events.subscribe()
    }

    pub async fn set_stay(&mut self, stay: StayRequest) -> Result<(), DraftError> {
        self.draft.stay = Some(stay);
        self.commit(DraftEvent::StayChanged).await
    }

    /// Set the unit count for one room type; zero removes the line.
    pub async fn set_room_units(&mut self, room_id: Uuid, units: i32) -> Result<(), DraftError> {
        self.draft.rooms.retain(|line| line.room_id != room_id);
        if units > 0 {
            self.draft.rooms.push(BookingLine { room_id, units });
        }
        self.commit(DraftEvent::RoomsChanged).await
    }

    /// Replace the whole selection at once (the combo suggestion applying
    /// itself to the room table).
    pub async fn set_rooms(&mut self, rooms: Vec<BookingLine>) -> Result<(), DraftError> {
        self.draft.rooms = rooms;
        self.commit(DraftEvent::RoomsChanged).await
    }

    pub async fn set_payment_method(&mut self, method: PaymentMethod) -> Result<(), DraftError> {
        self.draft.payment_method = Some(method);
        self.commit(DraftEvent::PaymentMethodChanged).await
    }

    pub async fn set_discount_codes(&mut self, codes: Vec<String>) -> Result<(), DraftError> {
        self.draft.discount_codes = codes;
        self.commit(DraftEvent::DiscountCodesChanged).await
    }

    pub async fn set_services(&mut self, services: Vec<AddOnService>) -> Result<(), DraftError> {
        self.draft.services = services;
        self.commit(DraftEvent::ServicesChanged).await
    }

    pub async fn set_customer(&mut self, customer: CustomerDetails) -> Result<(), DraftError> {
        self.draft.customer = Some(customer);
        self.commit(DraftEvent::CustomerChanged).await
    }

    /// Drop the draft after submission or navigation away.
    pub async fn clear(&mut self) -> Result<(), DraftError> {
        self.draft = BookingDraft::default();
        self.storage.clear().await?;
        let _ = self.events.send(DraftEvent::Cleared);
        Ok(())
    }

    async fn commit(&mut self, event: DraftEvent) -> Result<(), DraftError> {
        self.draft.revision += 1;
        self.storage.save(&self.draft).await?;
        let _ = self.events.send(event);
        Ok(())
    }
}
