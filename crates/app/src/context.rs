//! Long-lived handles shared by every request.

use reservations::{AuditTrail, CatalogService, ReservationService};
use sqlx::postgres::PgPoolOptions;
use store::PostgresStore;

use crate::config::Config;
use crate::error::Result;

/// Owns the database pool and the services built on it.
///
/// Each service holds a clone of the same store handle; the pool lives as
/// long as the context and is closed by [`AppContext::shutdown`].
pub struct AppContext {
    store: PostgresStore,
    pub reservations: ReservationService<PostgresStore>,
    pub catalog: CatalogService<PostgresStore>,
    pub audit_trail: AuditTrail<PostgresStore>,
}

impl AppContext {
    /// Opens the pool described by `config` and builds the services.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout.as_secs(),
            "database pool ready"
        );

        Ok(Self::with_store(PostgresStore::new(pool)))
    }

    /// Builds the services over an existing store.
    pub fn with_store(store: PostgresStore) -> Self {
        Self {
            reservations: ReservationService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            audit_trail: AuditTrail::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &PostgresStore {
        &self.store
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        self.store.run_migrations().await?;
        tracing::info!("schema up to date");
        Ok(())
    }

    /// Closes the pool once in-flight queries finish.
    pub async fn shutdown(self) {
        self.store.pool().close().await;
        tracing::info!("database pool closed");
    }
}
