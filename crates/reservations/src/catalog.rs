//! Product catalog management.

use common::ProductId;
use store::{NewProduct, Product, ProductChanges, Store};

use crate::error::{ReservationError, Result};

/// Catalog reads for everyone and writes for staff.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists products, newest first.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Product", id))
    }

    /// Adds a product. The name is required; stock defaults to zero.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        if product.name.trim().is_empty() {
            return Err(ReservationError::BadRequest("name required".to_string()));
        }
        check_stock(product.stock_quantity)?;

        let created = self
            .store
            .insert_product(&product)
            .await
            .map_err(ReservationError::from_catalog_write)?;
        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// Updates the given fields of a product and keeps the others.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_product(&self, id: ProductId, changes: ProductChanges) -> Result<Product> {
        if changes.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ReservationError::BadRequest("name cannot be blank".to_string()));
        }
        check_stock(changes.stock_quantity)?;

        self.store
            .update_product(id, &changes)
            .await
            .map_err(ReservationError::from_catalog_write)?
            .ok_or_else(|| ReservationError::not_found("Product", id))
    }

    /// Removes a product that no reservation line references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        let deleted = self
            .store
            .delete_product(id)
            .await
            .map_err(ReservationError::from_catalog_write)?;
        if !deleted {
            return Err(ReservationError::not_found("Product", id));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

fn check_stock(stock: Option<i64>) -> Result<()> {
    match stock {
        Some(s) if s < 0 => Err(ReservationError::BadRequest(format!(
            "stock_quantity cannot be negative: {s}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::InMemoryStore;

    use super::*;
    use crate::ErrorKind;

    fn catalog() -> CatalogService<InMemoryStore> {
        CatalogService::new(InMemoryStore::new())
    }

    fn gloves() -> NewProduct {
        NewProduct {
            name: "Gants nitrile".to_string(),
            price: Some(Money::from_cents(899)),
            stock_quantity: Some(20),
            ..NewProduct::default()
        }
    }

    #[tokio::test]
    async fn create_requires_name() {
        let err = catalog()
            .create_product(NewProduct {
                name: "  ".to_string(),
                ..NewProduct::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn create_defaults_stock_to_zero() {
        let product = catalog()
            .create_product(NewProduct {
                name: "Pansements".to_string(),
                ..NewProduct::default()
            })
            .await
            .unwrap();
        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.pricing.price, None);
    }

    #[tokio::test]
    async fn update_keeps_unspecified_fields() {
        let catalog = catalog();
        let product = catalog.create_product(gloves()).await.unwrap();

        let updated = catalog
            .update_product(
                product.id,
                ProductChanges {
                    stock_quantity: Some(3),
                    ..ProductChanges::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stock_quantity, 3);
        assert_eq!(updated.name, "Gants nitrile");
        assert_eq!(updated.pricing.price, Some(Money::from_cents(899)));
    }

    #[tokio::test]
    async fn update_rejects_negative_stock() {
        let catalog = catalog();
        let product = catalog.create_product(gloves()).await.unwrap();

        let err = catalog
            .update_product(
                product.id,
                ProductChanges {
                    stock_quantity: Some(-1),
                    ..ProductChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let catalog = catalog();
        let id = ProductId::new(77);

        assert_eq!(catalog.get_product(id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            catalog
                .update_product(id, ProductChanges::default())
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(catalog.delete_product(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let catalog = catalog();
        let first = catalog.create_product(gloves()).await.unwrap();
        let second = catalog.create_product(gloves()).await.unwrap();

        let ids: Vec<ProductId> = catalog
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
