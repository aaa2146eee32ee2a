use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{
    AuditEntryId, ProductId, ReservationId, ReservationItemId, ReservationStatus, UserId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    AuditEntry, NewAuditEntry, NewProduct, NewReservationLine, Product, ProductChanges,
    ProductPricing, Reservation, ReservationItemView, ReservationLine, ReservationWithItems,
    Result, StoreError,
    store::{Store, Transaction},
};

const STOCK_CHECK: &str = "products_stock_quantity_check";
const QUANTITY_CHECK: &str = "reservation_items_quantity_check";
const ITEM_PRODUCT_FK: &str = "reservation_items_product_id_fkey";
const ITEM_RESERVATION_FK: &str = "reservation_items_reservation_id_fkey";

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    reservations: BTreeMap<ReservationId, Reservation>,
    lines: Vec<ReservationLine>,
    audit: Vec<AuditEntry>,
    last_product_id: i64,
    last_reservation_id: i64,
    last_line_id: i64,
    last_audit_id: i64,
}

impl Tables {
    fn append_audit(&mut self, entry: &NewAuditEntry) -> AuditEntryId {
        self.last_audit_id += 1;
        let id = AuditEntryId::new(self.last_audit_id);
        self.audit.push(AuditEntry {
            id,
            actor_user_id: entry.actor_user_id,
            action: entry.action.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            meta: entry.details.clone(),
            details: entry.details.clone(),
            created_at: Utc::now(),
        });
        id
    }
}

/// One-shot failure switches used to simulate an unavailable store.
#[derive(Debug, Default)]
struct Faults {
    audit_write: AtomicBool,
    line_insert: AtomicBool,
}

impl Faults {
    fn trip(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("simulated {what} failure")));
        }
        Ok(())
    }
}

/// In-memory store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. A
/// transaction holds the table lock for its whole lifetime and writes to a
/// staged copy, so concurrent transactions run one after another and an
/// uncommitted transaction is never observed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    transactions_started: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next audit append fail with `Unavailable`.
    pub fn fail_next_audit_write(&self) {
        self.faults.audit_write.store(true, Ordering::SeqCst);
    }

    /// Makes the next line item insert fail with `Unavailable`.
    pub fn fail_next_line_insert(&self) {
        self.faults.line_insert.store(true, Ordering::SeqCst);
    }

    /// Inserts a product with explicit pricing columns, including the
    /// legacy ones the regular insert path never writes.
    pub async fn seed_product(&self, name: &str, pricing: ProductPricing, stock: i64) -> Product {
        let mut tables = self.tables.lock().await;
        tables.last_product_id += 1;
        let product = Product {
            id: ProductId::new(tables.last_product_id),
            name: name.to_string(),
            description: None,
            pricing,
            stock_quantity: stock,
            category_id: None,
            created_at: Utc::now(),
        };
        tables.products.insert(product.id, product.clone());
        product
    }

    /// Returns how many transactions have been opened.
    pub fn transactions_started(&self) -> usize {
        self.transactions_started.load(Ordering::SeqCst)
    }

    /// Returns the number of stored reservation headers.
    pub async fn reservation_count(&self) -> usize {
        self.tables.lock().await.reservations.len()
    }

    /// Returns the number of stored line items.
    pub async fn line_count(&self) -> usize {
        self.tables.lock().await.lines.len()
    }

    /// Returns the stored line items of one reservation.
    pub async fn lines_of(&self, reservation_id: ReservationId) -> Vec<ReservationLine> {
        self.tables
            .lock()
            .await
            .lines
            .iter()
            .filter(|l| l.reservation_id == reservation_id)
            .copied()
            .collect()
    }

    /// Returns the number of stored audit entries.
    pub async fn audit_count(&self) -> usize {
        self.tables.lock().await.audit.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        self.transactions_started.fetch_add(1, Ordering::SeqCst);
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            staged,
            faults: self.faults.clone(),
        }))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.values().rev().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let pricing = ProductPricing {
            price: product.price,
            ..ProductPricing::default()
        };
        let stock = product.stock_quantity.unwrap_or(0);
        if stock < 0 {
            return Err(StoreError::Conflict {
                constraint: STOCK_CHECK.to_string(),
            });
        }

        let mut tables = self.tables.lock().await;
        tables.last_product_id += 1;
        let stored = Product {
            id: ProductId::new(tables.last_product_id),
            name: product.name.clone(),
            description: product.description.clone(),
            pricing,
            stock_quantity: stock,
            category_id: product.category_id,
            created_at: Utc::now(),
        };
        tables.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>> {
        if changes.stock_quantity.is_some_and(|s| s < 0) {
            return Err(StoreError::Conflict {
                constraint: STOCK_CHECK.to_string(),
            });
        }

        let mut tables = self.tables.lock().await;
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            product.name = name.clone();
        }
        if let Some(description) = &changes.description {
            product.description = Some(description.clone());
        }
        if let Some(price) = changes.price {
            product.pricing.price = Some(price);
        }
        if let Some(stock) = changes.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(category_id) = changes.category_id {
            product.category_id = Some(category_id);
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.lines.iter().any(|l| l.product_id == id) {
            return Err(StoreError::Conflict {
                constraint: ITEM_PRODUCT_FK.to_string(),
            });
        }
        Ok(tables.products.remove(&id).is_some())
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.tables.lock().await.reservations.get(&id).cloned())
    }

    async fn update_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
        handled_by: UserId,
    ) -> Result<Option<Reservation>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.reservations.get_mut(&id).map(|reservation| {
            reservation.status = status;
            reservation.handled_by = Some(handled_by);
            reservation.clone()
        }))
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.reservations.remove(&id).is_none() {
            return Ok(false);
        }
        tables.lines.retain(|l| l.reservation_id != id);
        Ok(true)
    }

    async fn list_reservations(&self, owner: Option<UserId>) -> Result<Vec<ReservationWithItems>> {
        let tables = self.tables.lock().await;
        let listed = tables
            .reservations
            .values()
            .rev()
            .filter(|r| owner.is_none_or(|owner| r.user_id == owner))
            .map(|reservation| ReservationWithItems {
                reservation: reservation.clone(),
                items: tables
                    .lines
                    .iter()
                    .filter(|l| l.reservation_id == reservation.id)
                    .filter_map(|l| {
                        tables.products.get(&l.product_id).map(|p| ReservationItemView {
                            product_id: l.product_id,
                            name: p.name.clone(),
                            quantity: l.quantity,
                            unit_price_snapshot: l.unit_price_snapshot,
                        })
                    })
                    .collect(),
            })
            .collect();
        Ok(listed)
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntryId> {
        Faults::trip(&self.faults.audit_write, "audit write")?;
        Ok(self.tables.lock().await.append_audit(entry))
    }

    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let tables = self.tables.lock().await;
        Ok(tables.audit.iter().rev().take(limit).cloned().collect())
    }

    async fn get_audit(&self, id: AuditEntryId) -> Result<Option<AuditEntry>> {
        let tables = self.tables.lock().await;
        Ok(tables.audit.iter().find(|e| e.id == id).cloned())
    }
}

/// A transaction over a staged copy of the in-memory tables.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    faults: Arc<Faults>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn insert_reservation(
        &mut self,
        user_id: UserId,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        self.staged.last_reservation_id += 1;
        let reservation = Reservation {
            id: ReservationId::new(self.staged.last_reservation_id),
            user_id,
            status,
            handled_by: None,
            created_at: Utc::now(),
        };
        self.staged
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn insert_line(&mut self, line: &NewReservationLine) -> Result<ReservationLine> {
        Faults::trip(&self.faults.line_insert, "line insert")?;
        if line.quantity <= 0 {
            return Err(StoreError::Conflict {
                constraint: QUANTITY_CHECK.to_string(),
            });
        }
        if !self.staged.reservations.contains_key(&line.reservation_id) {
            return Err(StoreError::Conflict {
                constraint: ITEM_RESERVATION_FK.to_string(),
            });
        }
        if !self.staged.products.contains_key(&line.product_id) {
            return Err(StoreError::Conflict {
                constraint: ITEM_PRODUCT_FK.to_string(),
            });
        }

        self.staged.last_line_id += 1;
        let stored = ReservationLine {
            id: ReservationItemId::new(self.staged.last_line_id),
            reservation_id: line.reservation_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price_snapshot: line.unit_price_snapshot,
        };
        self.staged.lines.push(stored);
        Ok(stored)
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: i64) -> Result<()> {
        let product = self.staged.products.get_mut(&product_id).ok_or_else(|| {
            StoreError::InvalidData(format!("product {product_id} disappeared while locked"))
        })?;
        if product.stock_quantity < quantity {
            return Err(StoreError::Conflict {
                constraint: STOCK_CHECK.to_string(),
            });
        }
        product.stock_quantity -= quantity;
        Ok(())
    }

    async fn append_audit(&mut self, entry: &NewAuditEntry) -> Result<AuditEntryId> {
        Faults::trip(&self.faults.audit_write, "audit write")?;
        Ok(self.staged.append_audit(entry))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;
    use crate::store::StoreExt;

    async fn store_with_product(stock: i64) -> (InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let product = store
            .insert_product(&NewProduct {
                name: "Masques FFP2".to_string(),
                price: Some(Money::from_cents(1000)),
                stock_quantity: Some(stock),
                ..NewProduct::default()
            })
            .await
            .unwrap();
        (store, product.id)
    }

    fn audit_entry() -> NewAuditEntry {
        NewAuditEntry {
            actor_user_id: UserId::new(1),
            action: "RESERVATION_CREATE".to_string(),
            entity_type: "reservations".to_string(),
            entity_id: Some(1),
            details: serde_json::json!({"items": []}),
        }
    }

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let (store, product_id) = store_with_product(5).await;

        let mut tx = store.begin().await.unwrap();
        let reservation = tx
            .insert_reservation(UserId::new(1), ReservationStatus::EnAttente)
            .await
            .unwrap();
        tx.insert_line(&NewReservationLine {
            reservation_id: reservation.id,
            product_id,
            quantity: 2,
            unit_price_snapshot: Money::from_cents(1000),
        })
        .await
        .unwrap();
        tx.decrement_stock(product_id, 2).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.reservation_count().await, 1);
        assert_eq!(store.line_count().await, 1);
        assert_eq!(store.stock_of(product_id).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let (store, product_id) = store_with_product(5).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_reservation(UserId::new(1), ReservationStatus::EnAttente)
                .await
                .unwrap();
            tx.decrement_stock(product_id, 4).await.unwrap();
        }

        assert_eq!(store.reservation_count().await, 0);
        assert_eq!(store.stock_of(product_id).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn explicit_rollback_discards_writes() {
        let (store, product_id) = store_with_product(5).await;

        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(product_id, 1).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.stock_of(product_id).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn stock_cannot_go_negative() {
        let (store, product_id) = store_with_product(1).await;

        let mut tx = store.begin().await.unwrap();
        let err = tx.decrement_stock(product_id, 2).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn failed_audit_write_leaves_transaction_usable() {
        let (store, product_id) = store_with_product(5).await;
        store.fail_next_audit_write();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.append_audit(&audit_entry()).await.is_err());
        tx.decrement_stock(product_id, 1).await.unwrap();
        tx.append_audit(&audit_entry()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock_of(product_id).await.unwrap(), Some(4));
        assert_eq!(store.audit_count().await, 1);
    }

    #[tokio::test]
    async fn audit_payload_is_written_to_meta_and_details() {
        let store = InMemoryStore::new();
        let id = store.append_audit(&audit_entry()).await.unwrap();

        let entry = store.get_audit(id).await.unwrap().unwrap();
        assert_eq!(entry.meta, entry.details);
        assert_eq!(entry.details, serde_json::json!({"items": []}));
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let (store, product_id) = store_with_product(5).await;

        let mut tx = store.begin().await.unwrap();
        let reservation = tx
            .insert_reservation(UserId::new(1), ReservationStatus::EnAttente)
            .await
            .unwrap();
        tx.insert_line(&NewReservationLine {
            reservation_id: reservation.id,
            product_id,
            quantity: 1,
            unit_price_snapshot: Money::from_cents(1000),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(store.delete_product(product_id).await.unwrap_err().is_conflict());

        assert!(store.delete_reservation(reservation.id).await.unwrap());
        assert_eq!(store.line_count().await, 0);
        assert!(store.delete_product(product_id).await.unwrap());
    }

    #[tokio::test]
    async fn listing_filters_by_owner_newest_first() {
        let store = InMemoryStore::new();
        for user in [1, 2, 1] {
            let mut tx = store.begin().await.unwrap();
            tx.insert_reservation(UserId::new(user), ReservationStatus::EnAttente)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        let all = store.list_reservations(None).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|r| r.reservation.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(all.iter().all(|r| r.items.is_empty()));

        let own = store.list_reservations(Some(UserId::new(1))).await.unwrap();
        assert_eq!(own.len(), 2);
    }
}
