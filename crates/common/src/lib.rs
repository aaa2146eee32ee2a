//! Shared identifiers and value types for the reservation system.

pub mod identity;
pub mod money;
pub mod status;
pub mod types;

pub use identity::{Identity, Role, UnknownRole};
pub use money::Money;
pub use status::{ReservationStatus, UnknownStatus};
pub use types::{
    AuditEntryId, CategoryId, ProductId, ReservationId, ReservationItemId, UserId,
};
