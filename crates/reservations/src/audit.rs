//! Audit recording and audit trail reads.

use common::{AuditEntryId, UserId};
use serde::Serialize;
use store::{AuditEntry, NewAuditEntry, Store, StoreError, Transaction};

use crate::error::{ReservationError, Result};

/// Entity type recorded for reservation actions.
pub const RESERVATIONS_ENTITY: &str = "reservations";

/// Number of entries returned by [`AuditTrail::recent`].
pub const RECENT_LIMIT: usize = 200;

/// State-changing actions that are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    ReservationCreate,
    ReservationStatusUpdate,
    ReservationDelete,
}

impl AuditAction {
    /// Returns the persisted action tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ReservationCreate => "RESERVATION_CREATE",
            AuditAction::ReservationStatusUpdate => "RESERVATION_STATUS_UPDATE",
            AuditAction::ReservationDelete => "RESERVATION_DELETE",
        }
    }

    /// Returns the entity type the action applies to.
    pub fn entity_type(&self) -> &'static str {
        RESERVATIONS_ENTITY
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort writer of audit entries.
///
/// Recording never fails visibly: serialization and store errors are
/// logged, counted and dropped, and the caller's outcome is unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditRecorder;

impl AuditRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the entry for an action on a reservation.
    pub fn entry<T>(
        actor_user_id: UserId,
        action: AuditAction,
        entity_id: i64,
        details: &T,
    ) -> std::result::Result<NewAuditEntry, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        Ok(NewAuditEntry {
            actor_user_id,
            action: action.as_str().to_string(),
            entity_type: action.entity_type().to_string(),
            entity_id: Some(entity_id),
            details: serde_json::to_value(details)?,
        })
    }

    /// Records an entry directly against the store.
    pub async fn record<S, T>(
        &self,
        store: &S,
        actor_user_id: UserId,
        action: AuditAction,
        entity_id: i64,
        details: &T,
    ) where
        S: Store + ?Sized,
        T: Serialize + Sync + ?Sized,
    {
        let outcome = match Self::entry(actor_user_id, action, entity_id, details) {
            Ok(entry) => store.append_audit(&entry).await,
            Err(e) => Err(StoreError::from(e)),
        };
        Self::settle(action, entity_id, outcome);
    }

    /// Records an entry inside an open transaction.
    ///
    /// A failed append leaves the transaction usable, so the caller can
    /// still commit.
    pub async fn record_in<T>(
        &self,
        tx: &mut dyn Transaction,
        actor_user_id: UserId,
        action: AuditAction,
        entity_id: i64,
        details: &T,
    ) where
        T: Serialize + Sync + ?Sized,
    {
        let outcome = match Self::entry(actor_user_id, action, entity_id, details) {
            Ok(entry) => tx.append_audit(&entry).await,
            Err(e) => Err(StoreError::from(e)),
        };
        Self::settle(action, entity_id, outcome);
    }

    fn settle(action: AuditAction, entity_id: i64, outcome: store::Result<AuditEntryId>) {
        match outcome {
            Ok(audit_id) => {
                tracing::debug!(%action, entity_id, %audit_id, "audit entry recorded");
            }
            Err(e) => {
                metrics::counter!("audit_write_failures_total").increment(1);
                tracing::error!(%action, entity_id, error = %e, "audit write failed");
            }
        }
    }
}

/// Read access to the audit trail.
#[derive(Clone)]
pub struct AuditTrail<S: Store> {
    store: S,
}

impl<S: Store> AuditTrail<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the latest entries, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn recent(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.store.list_audit(RECENT_LIMIT).await?)
    }

    /// Returns one entry.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: AuditEntryId) -> Result<AuditEntry> {
        self.store
            .get_audit(id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Audit entry", id))
    }
}
