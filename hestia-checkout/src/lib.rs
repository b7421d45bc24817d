pub mod allocation;
pub mod backend;
pub mod draft;
pub mod loyalty;
pub mod models;
pub mod orchestrator;

pub use allocation::{auto_allocate_by_guests, suggest_combo, AllocationResult, CandidateRoom};
pub use backend::BookingBackend;
pub use draft::{BookingDraft, DraftStore};
pub use loyalty::LoyaltyTrigger;
pub use models::{PaymentSession, StayRequest};
pub use orchestrator::{CheckoutOrchestrator, CheckoutState};
