//! Row models shared by the store implementations.

use chrono::{DateTime, Utc};
use common::{
    AuditEntryId, CategoryId, Money, ProductId, ReservationId, ReservationItemId,
    ReservationStatus, UserId,
};
use serde::{Deserialize, Serialize};

/// Price columns of a product, in resolution priority order.
///
/// `price` is the current column; `unit_price` and `unit_price_cents` are
/// older columns that some rows still rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductPricing {
    pub price: Option<Money>,
    pub unit_price: Option<Money>,
    pub unit_price_cents: Option<i64>,
}

impl ProductPricing {
    /// Pricing with only the primary column set.
    pub fn priced(price: Money) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub pricing: ProductPricing,
    pub stock_quantity: i64,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Money>,
    /// Defaults to zero when absent.
    pub stock_quantity: Option<i64>,
    pub category_id: Option<CategoryId>,
}

/// Partial product update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock_quantity: Option<i64>,
    pub category_id: Option<CategoryId>,
}

/// A reservation header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub status: ReservationStatus,
    pub handled_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a reservation line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewReservationLine {
    pub reservation_id: ReservationId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_snapshot: Money,
}

/// A persisted reservation line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub id: ReservationItemId,
    pub reservation_id: ReservationId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_snapshot: Money,
}

/// A line item as shown in reservation listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price_snapshot: Money,
}

/// A reservation header together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationWithItems {
    #[serde(flatten)]
    pub reservation: Reservation,
    /// Empty, never absent, when the reservation has no lines.
    pub items: Vec<ReservationItemView>,
}

impl ReservationWithItems {
    /// Sum of `quantity * unit_price_snapshot` over all lines, saturating
    /// instead of overflowing.
    pub fn total(&self) -> Money {
        self.items
            .iter()
            .map(|item| item.unit_price_snapshot.multiply(item.quantity))
            .sum()
    }
}

/// Fields for appending an audit entry.
///
/// The payload is written to both the `meta` and `details` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub actor_user_id: UserId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor_user_id: UserId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub meta: serde_json::Value,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
