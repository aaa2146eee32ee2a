//! Process wiring for the reservation core.
//!
//! Loads [`Config`] from the environment, initialises tracing and builds an
//! [`AppContext`] that owns the database pool and hands the store to every
//! service.

pub mod config;
pub mod context;
pub mod error;
pub mod telemetry;

pub use config::{Config, LogFormat};
pub use context::AppContext;
pub use error::{AppError, Result};
pub use telemetry::init_tracing;
