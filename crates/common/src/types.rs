use serde::{Deserialize, Serialize};

/// Declares a newtype over the `BIGSERIAL` key of a table.
///
/// Wrapping the raw integer keeps a product id from being passed where a
/// reservation id is expected.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw key.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of a user account (client, employee or administrator).
    UserId
);
row_id!(
    /// Identifier of a catalog product.
    ProductId
);
row_id!(
    /// Identifier of a product category.
    CategoryId
);
row_id!(
    /// Identifier of a reservation header.
    ReservationId
);
row_id!(
    /// Identifier of a single reservation line item.
    ReservationItemId
);
row_id!(
    /// Identifier of an audit log entry.
    AuditEntryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_preserve_raw_value() {
        let id = ProductId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(ProductId::from(42), id);
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&ReservationId::new(7)).unwrap();
        assert_eq!(json, "7");

        let parsed: UserId = serde_json::from_str("13").unwrap();
        assert_eq!(parsed, UserId::new(13));
    }

    #[test]
    fn ids_order_by_raw_value() {
        assert!(ReservationId::new(1) < ReservationId::new(2));
        assert_eq!(AuditEntryId::new(3).to_string(), "3");
    }
}
