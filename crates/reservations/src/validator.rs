//! Pricing and stock validation for a single requested line.

use common::{Money, ProductId};
use store::{Product, ProductPricing, Transaction};

use crate::error::{ReservationError, Result};

/// A line that passed validation, with the price to snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    pub product: Product,
    pub unit_price: Money,
}

/// Resolves the unit price of a product.
///
/// Columns are tried in a fixed order and the first one present wins:
/// `price`, then the legacy `unit_price`, then the legacy
/// `unit_price_cents`.
///
/// `unit_price_cents` is read as cents: a stored `725` snapshots as `7.25`.
/// Older writers copied that column into the snapshot unchanged, recording
/// `725.00`, so snapshots taken from products priced only through this
/// column are a hundred times smaller than they used to be.
pub fn resolve_unit_price(pricing: &ProductPricing) -> Option<Money> {
    pricing
        .price
        .or(pricing.unit_price)
        .or(pricing.unit_price_cents.map(Money::from_cents))
}

/// Checks that a requested quantity is positive.
pub fn check_quantity(product_id: ProductId, quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(ReservationError::InvalidQuantity {
            product_id,
            quantity,
        });
    }
    Ok(())
}

/// Decides whether `quantity` units of the looked-up product can be reserved.
pub fn check(
    product_id: ProductId,
    product: Option<Product>,
    quantity: i64,
) -> Result<ValidatedItem> {
    check_quantity(product_id, quantity)?;

    let product = product.ok_or_else(|| ReservationError::not_found("Product", product_id))?;

    if product.stock_quantity < quantity {
        return Err(ReservationError::InsufficientStock {
            product_id,
            requested: quantity,
            available: product.stock_quantity,
        });
    }

    let unit_price = resolve_unit_price(&product.pricing)
        .ok_or(ReservationError::MissingPrice { product_id })?;

    Ok(ValidatedItem {
        product,
        unit_price,
    })
}

/// Confirms a product exists, has enough stock and has a price.
///
/// Reads happen through the caller's transaction, which locks the product
/// row, so the stock it sees cannot change before the caller decrements it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingValidator;

impl PricingValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates one requested line. Has no side effects.
    pub async fn validate(
        &self,
        tx: &mut dyn Transaction,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<ValidatedItem> {
        check_quantity(product_id, quantity)?;
        let product = tx.find_product_for_update(product_id).await?;
        check(product_id, product, quantity)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::ErrorKind;

    fn product(stock: i64, pricing: ProductPricing) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Thermomètre".to_string(),
            description: None,
            pricing,
            stock_quantity: stock,
            category_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn primary_price_wins() {
        let pricing = ProductPricing {
            price: Some(Money::from_cents(1000)),
            unit_price: Some(Money::from_cents(900)),
            unit_price_cents: Some(800),
        };
        assert_eq!(resolve_unit_price(&pricing), Some(Money::from_cents(1000)));
    }

    #[test]
    fn falls_back_in_fixed_order() {
        let pricing = ProductPricing {
            price: None,
            unit_price: Some(Money::from_cents(900)),
            unit_price_cents: Some(800),
        };
        assert_eq!(resolve_unit_price(&pricing), Some(Money::from_cents(900)));

        let pricing = ProductPricing {
            unit_price_cents: Some(800),
            ..ProductPricing::default()
        };
        assert_eq!(resolve_unit_price(&pricing), Some(Money::from_cents(800)));

        assert_eq!(resolve_unit_price(&ProductPricing::default()), None);
    }

    #[test]
    fn zero_price_is_still_a_price() {
        let pricing = ProductPricing {
            price: Some(Money::zero()),
            unit_price: Some(Money::from_cents(900)),
            unit_price_cents: None,
        };
        assert_eq!(resolve_unit_price(&pricing), Some(Money::zero()));
    }

    #[test]
    fn accepts_exact_stock() {
        let item = check(
            ProductId::new(1),
            Some(product(2, ProductPricing::priced(Money::from_cents(1000)))),
            2,
        )
        .unwrap();
        assert_eq!(item.unit_price, Money::from_cents(1000));
    }

    #[test]
    fn rejects_missing_product() {
        let err = check(ProductId::new(1), None, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn rejects_non_positive_quantity_before_lookup() {
        for quantity in [0, -3] {
            let err = check(ProductId::new(1), None, quantity).unwrap_err();
            assert!(matches!(err, ReservationError::InvalidQuantity { .. }));
        }
    }

    #[test]
    fn rejects_insufficient_stock() {
        let err = check(
            ProductId::new(1),
            Some(product(5, ProductPricing::priced(Money::from_cents(1000)))),
            100,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InsufficientStock {
                requested: 100,
                available: 5,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unpriced_product() {
        let err = check(
            ProductId::new(1),
            Some(product(5, ProductPricing::default())),
            1,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingPrice);
    }
}
