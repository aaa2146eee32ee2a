//! Reservation status changes.

use common::{ReservationId, ReservationStatus, UserId};
use serde::Serialize;
use store::{Reservation, Store};

use crate::audit::{AuditAction, AuditRecorder};
use crate::error::{ReservationError, Result};

#[derive(Serialize)]
struct StatusDetails {
    status: ReservationStatus,
}

/// Applies status changes to reservation headers.
///
/// Any accepted status may follow any other, and no status change touches
/// stock: cancelling a reservation does not restock its products.
pub struct StatusTransitionHandler<S: Store> {
    store: S,
    audit: AuditRecorder,
}

impl<S: Store> StatusTransitionHandler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: AuditRecorder::new(),
        }
    }

    /// Sets the status of a reservation and records who handled it.
    ///
    /// `new_status` is the raw tag from the request; it must be one of the
    /// six accepted values.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        reservation_id: ReservationId,
        new_status: Option<&str>,
        handler_user_id: UserId,
    ) -> Result<Reservation> {
        let status = parse_status(new_status)?;

        let reservation = self
            .store
            .update_reservation_status(reservation_id, status, handler_user_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Reservation", reservation_id))?;

        self.audit
            .record(
                &self.store,
                handler_user_id,
                AuditAction::ReservationStatusUpdate,
                reservation.id.as_i64(),
                &StatusDetails { status },
            )
            .await;

        metrics::counter!("reservation_status_updates_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(%reservation_id, %status, handled_by = %handler_user_id, "reservation status updated");

        Ok(reservation)
    }
}

fn parse_status(raw: Option<&str>) -> Result<ReservationStatus> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ReservationError::BadRequest("status required".to_string()))?;

    raw.parse()
        .map_err(|e: common::UnknownStatus| ReservationError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_blank_status_is_rejected() {
        for raw in [None, Some(""), Some("   ")] {
            let err = parse_status(raw).unwrap_err();
            assert!(matches!(err, ReservationError::BadRequest(_)), "{raw:?}");
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = parse_status(Some("EXPEDIEE")).unwrap_err();
        assert_eq!(err.to_string(), "Bad request: unknown reservation status: EXPEDIEE");
    }

    #[test]
    fn accepted_statuses_parse() {
        assert_eq!(parse_status(Some("PRETE")).unwrap(), ReservationStatus::Prete);
        assert_eq!(parse_status(Some(" ANNULEE ")).unwrap(), ReservationStatus::Annulee);
    }
}
