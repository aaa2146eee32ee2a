//! All-or-nothing reservation placement.

use std::time::Instant;

use common::{ProductId, ReservationStatus, UserId};
use serde::{Deserialize, Serialize};
use store::{NewReservationLine, Reservation, Store, with_transaction};

use crate::audit::{AuditAction, AuditRecorder};
use crate::error::{ReservationError, Result};
use crate::validator::{PricingValidator, check_quantity};

/// One requested line: `{ "product_id": 1, "quantity": 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl ReservationItemRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

#[derive(Serialize)]
struct CreateDetails<'a> {
    items: &'a [ReservationItemRequest],
}

/// Orchestrates reservation creation.
///
/// Inside one transaction: insert the header, then for each item in the
/// order given validate it, insert the line with its snapshot price and
/// decrement stock, then record the audit entry and commit. The first
/// failing item aborts the whole call and nothing it wrote survives.
pub struct ReservationCoordinator<S: Store> {
    store: S,
    validator: PricingValidator,
    audit: AuditRecorder,
}

impl<S: Store> ReservationCoordinator<S> {
    /// Creates a new coordinator over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            validator: PricingValidator::new(),
            audit: AuditRecorder::new(),
        }
    }

    /// Places a reservation for `user_id`.
    ///
    /// Returns the committed header (without items), status `EN_ATTENTE`.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn create_reservation(
        &self,
        user_id: UserId,
        items: Vec<ReservationItemRequest>,
    ) -> Result<Reservation> {
        let started = Instant::now();

        let outcome = match check_items(&items) {
            Ok(()) => self.place(user_id, items).await,
            Err(e) => Err(e),
        };

        metrics::histogram!("reservation_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(reservation) => {
                metrics::counter!("reservations_created_total").increment(1);
                tracing::info!(reservation_id = %reservation.id, %user_id, "reservation created");
            }
            Err(e) => {
                metrics::counter!("reservations_rejected_total", "reason" => e.reason())
                    .increment(1);
                match e {
                    ReservationError::Internal(_) => {
                        tracing::error!(%user_id, error = %e, "reservation failed");
                    }
                    _ => tracing::warn!(%user_id, error = %e, "reservation rejected"),
                }
            }
        }

        outcome
    }

    async fn place(
        &self,
        user_id: UserId,
        items: Vec<ReservationItemRequest>,
    ) -> Result<Reservation> {
        let validator = self.validator;
        let audit = self.audit;

        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let reservation = tx
                    .insert_reservation(user_id, ReservationStatus::EnAttente)
                    .await?;

                for item in &items {
                    let validated = validator
                        .validate(&mut *tx, item.product_id, item.quantity)
                        .await?;

                    tx.insert_line(&NewReservationLine {
                        reservation_id: reservation.id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                        unit_price_snapshot: validated.unit_price,
                    })
                    .await?;
                    tx.decrement_stock(item.product_id, item.quantity).await?;

                    tracing::debug!(
                        reservation_id = %reservation.id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        unit_price = %validated.unit_price,
                        "line reserved"
                    );
                }

                audit
                    .record_in(
                        &mut *tx,
                        user_id,
                        AuditAction::ReservationCreate,
                        reservation.id.as_i64(),
                        &CreateDetails { items: &items },
                    )
                    .await;

                Ok::<_, ReservationError>(reservation)
            })
        })
        .await
    }
}

/// Rejects requests that cannot succeed before any store work happens.
fn check_items(items: &[ReservationItemRequest]) -> Result<()> {
    if items.is_empty() {
        return Err(ReservationError::BadRequest("items required".to_string()));
    }
    for item in items {
        if item.product_id.as_i64() <= 0 {
            return Err(ReservationError::BadRequest(format!(
                "invalid product id: {}",
                item.product_id
            )));
        }
        check_quantity(item.product_id, item.quantity)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_is_rejected() {
        let err = check_items(&[]).unwrap_err();
        assert!(matches!(err, ReservationError::BadRequest(_)));
    }

    #[test]
    fn non_positive_product_id_is_rejected() {
        let err =
            check_items(&[ReservationItemRequest::new(ProductId::new(0), 1)]).unwrap_err();
        assert!(matches!(err, ReservationError::BadRequest(_)));
    }

    #[test]
    fn first_invalid_quantity_is_reported() {
        let items = [
            ReservationItemRequest::new(ProductId::new(1), 1),
            ReservationItemRequest::new(ProductId::new(2), 0),
            ReservationItemRequest::new(ProductId::new(3), -1),
        ];
        let err = check_items(&items).unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InvalidQuantity { product_id, quantity: 0 } if product_id == ProductId::new(2)
        ));
    }

    #[test]
    fn item_request_deserializes_from_client_payload() {
        let items: Vec<ReservationItemRequest> =
            serde_json::from_str(r#"[{"product_id": 1, "quantity": 2}]"#).unwrap();
        assert_eq!(items, vec![ReservationItemRequest::new(ProductId::new(1), 2)]);
    }
}
