pub mod inventory;
pub mod pricing;
pub mod room;
pub mod service;

pub use inventory::{AvailabilitySource, BookedStay, InventoryResolver};
pub use pricing::{PriceBreakdown, SeasonalDiscount};
pub use room::{Room, RoomStatus};
pub use service::AddOnService;
