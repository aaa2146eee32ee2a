//! Transactional store for the reservation system.
//!
//! [`Store`] covers the single-statement operations; [`Transaction`] covers
//! the multi-step reservation write path. [`with_transaction`] runs a
//! closure inside a transaction that commits on `Ok` and rolls back on
//! anything else.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    AuditEntry, NewAuditEntry, NewProduct, NewReservationLine, Product, ProductChanges,
    ProductPricing, Reservation, ReservationItemView, ReservationLine, ReservationWithItems,
};
pub use postgres::PostgresStore;
pub use store::{Store, StoreExt, Transaction, with_transaction};
