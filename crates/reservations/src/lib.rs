//! Reservation and inventory core.
//!
//! The interesting part is [`ReservationCoordinator::create_reservation`]:
//! one call validates every requested line, snapshots prices, decrements
//! stock and records an audit entry inside a single transaction, so other
//! readers see either the whole reservation or nothing.
//!
//! Around it sit the [`StatusTransitionHandler`], the best-effort
//! [`AuditRecorder`], the [`ReservationService`] entry points, the
//! [`CatalogService`] and the [`AuditTrail`] reader. Callers are expected
//! to have checked [`access::authorize`] first.

pub mod access;
pub mod audit;
pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod service;
pub mod status;
pub mod validator;

pub use access::{Operation, authorize};
pub use audit::{AuditAction, AuditRecorder, AuditTrail, RESERVATIONS_ENTITY};
pub use catalog::CatalogService;
pub use coordinator::{ReservationCoordinator, ReservationItemRequest};
pub use error::{ErrorKind, ReservationError, Result};
pub use service::ReservationService;
pub use status::StatusTransitionHandler;
pub use validator::{PricingValidator, ValidatedItem};
