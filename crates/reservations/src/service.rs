//! Reservation entry points used by the surrounding request layer.

use common::{ReservationId, Role, UserId};
use serde_json::json;
use store::{Reservation, ReservationWithItems, Store};

use crate::audit::{AuditAction, AuditRecorder};
use crate::coordinator::{ReservationCoordinator, ReservationItemRequest};
use crate::error::{ReservationError, Result};
use crate::status::StatusTransitionHandler;

/// Service for managing reservations.
///
/// Provides a high-level API over the coordinator and the status handler,
/// plus the listing and administrative delete that need no transaction.
pub struct ReservationService<S: Store> {
    store: S,
    coordinator: ReservationCoordinator<S>,
    status_handler: StatusTransitionHandler<S>,
    audit: AuditRecorder,
}

impl<S: Store + Clone> ReservationService<S> {
    /// Creates a new reservation service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            coordinator: ReservationCoordinator::new(store.clone()),
            status_handler: StatusTransitionHandler::new(store.clone()),
            audit: AuditRecorder::new(),
            store,
        }
    }
}

impl<S: Store> ReservationService<S> {
    /// Places a reservation owned by the caller.
    pub async fn create_reservation(
        &self,
        caller_id: UserId,
        items: Vec<ReservationItemRequest>,
    ) -> Result<Reservation> {
        self.coordinator.create_reservation(caller_id, items).await
    }

    /// Changes the status of a reservation on behalf of a staff member.
    pub async fn update_status(
        &self,
        reservation_id: ReservationId,
        new_status: Option<&str>,
        caller_id: UserId,
    ) -> Result<Reservation> {
        self.status_handler
            .update_status(reservation_id, new_status, caller_id)
            .await
    }

    /// Lists reservations visible to the caller, newest first.
    ///
    /// Staff see every reservation; clients only their own.
    #[tracing::instrument(skip(self))]
    pub async fn list_reservations(
        &self,
        caller_id: UserId,
        caller_role: Role,
    ) -> Result<Vec<ReservationWithItems>> {
        let owner = (!caller_role.is_privileged()).then_some(caller_id);
        Ok(self.store.list_reservations(owner).await?)
    }

    /// Deletes a reservation and its line items.
    ///
    /// Stock is not returned, matching cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn delete_reservation(
        &self,
        reservation_id: ReservationId,
        caller_id: UserId,
    ) -> Result<()> {
        let deleted = self.store.delete_reservation(reservation_id).await?;
        if !deleted {
            return Err(ReservationError::not_found("Reservation", reservation_id));
        }

        self.audit
            .record(
                &self.store,
                caller_id,
                AuditAction::ReservationDelete,
                reservation_id.as_i64(),
                &json!({}),
            )
            .await;

        tracing::info!(%reservation_id, deleted_by = %caller_id, "reservation deleted");
        Ok(())
    }
}
