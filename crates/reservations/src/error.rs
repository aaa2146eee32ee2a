//! Reservation error types.

use common::{ProductId, Role};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during reservation, catalog and audit operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Malformed input: missing or invalid fields.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A requested quantity is zero or negative.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// Not enough stock left to satisfy a line.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The product has no price in any of its price columns.
    #[error("Product {product_id} has no price to snapshot")]
    MissingPrice { product_id: ProductId },

    /// The caller's role may not perform the operation.
    #[error("Role {role} may not {operation}")]
    Forbidden { role: Role, operation: &'static str },

    /// A store constraint rejected a catalog write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unexpected store failure.
    #[error("Internal error: {0}")]
    Internal(#[from] StoreError),
}

/// Stable classification of [`ReservationError`] for callers that only
/// need the outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    InsufficientStock,
    MissingPrice,
    Forbidden,
    Conflict,
    Internal,
}

impl ReservationError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        ReservationError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Maps a catalog write failure, keeping constraint violations visible.
    pub(crate) fn from_catalog_write(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { constraint } => ReservationError::Conflict(constraint),
            other => ReservationError::Internal(other),
        }
    }

    /// Returns the outcome class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::BadRequest(_) | ReservationError::InvalidQuantity { .. } => {
                ErrorKind::BadRequest
            }
            ReservationError::NotFound { .. } => ErrorKind::NotFound,
            ReservationError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ReservationError::MissingPrice { .. } => ErrorKind::MissingPrice,
            ReservationError::Forbidden { .. } => ErrorKind::Forbidden,
            ReservationError::Conflict(_) => ErrorKind::Conflict,
            ReservationError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status the surrounding layer answers with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::BadRequest | ErrorKind::InsufficientStock => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::MissingPrice | ErrorKind::Internal => 500,
        }
    }

    /// Short tag used as a metrics label.
    pub(crate) fn reason(&self) -> &'static str {
        match self.kind() {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::MissingPrice => "missing_price",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Convenience type alias for reservation results.
pub type Result<T> = std::result::Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_quantity_is_a_bad_request() {
        let err = ReservationError::InvalidQuantity {
            product_id: ProductId::new(1),
            quantity: 0,
        };
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn status_codes_follow_kind() {
        let cases = [
            (ReservationError::BadRequest("items".into()), 400),
            (ReservationError::not_found("Reservation", 3), 404),
            (
                ReservationError::InsufficientStock {
                    product_id: ProductId::new(2),
                    requested: 100,
                    available: 5,
                },
                400,
            ),
            (
                ReservationError::MissingPrice {
                    product_id: ProductId::new(2),
                },
                500,
            ),
            (
                ReservationError::Forbidden {
                    role: Role::Client,
                    operation: "delete reservations",
                },
                403,
            ),
            (ReservationError::Conflict("users_email_key".into()), 409),
            (
                ReservationError::Internal(StoreError::Unavailable("down".into())),
                500,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(err.status_code(), code, "{err}");
        }
    }

    #[test]
    fn catalog_conflicts_stay_visible() {
        let err = ReservationError::from_catalog_write(StoreError::Conflict {
            constraint: "products_stock_quantity_check".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = ReservationError::from_catalog_write(StoreError::Unavailable("down".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn messages_name_the_entity() {
        let err = ReservationError::not_found("Product", 12);
        assert_eq!(err.to_string(), "Product not found: 12");
    }
}
