use async_trait::async_trait;
use common::{AuditEntryId, ProductId, ReservationId, ReservationStatus, UserId};
use futures_util::future::BoxFuture;

use crate::{
    AuditEntry, NewAuditEntry, NewProduct, NewReservationLine, Product, ProductChanges,
    Reservation, ReservationLine, ReservationWithItems, Result, StoreError,
};

/// Core trait for store implementations.
///
/// Every method is a single atomic statement. Multi-step writes go through
/// [`Store::begin`] or, preferably, [`with_transaction`].
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction.
    ///
    /// Dropping the returned handle without calling
    /// [`Transaction::commit`] rolls the transaction back.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Lists every product, newest first.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Retrieves a product by ID.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Inserts a product and returns the stored row.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product>;

    /// Applies a partial update. Returns None if the product doesn't exist.
    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>>;

    /// Deletes a product. Returns false if it didn't exist.
    ///
    /// Fails with `Conflict` while line items still reference the product.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Retrieves a reservation header by ID.
    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    /// Sets the status and handler of a reservation in one statement.
    ///
    /// Returns None if the reservation doesn't exist.
    async fn update_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
        handled_by: UserId,
    ) -> Result<Option<Reservation>>;

    /// Deletes a reservation and its line items. Returns false if it didn't exist.
    async fn delete_reservation(&self, id: ReservationId) -> Result<bool>;

    /// Lists reservations with their line items, newest first.
    ///
    /// With `owner` set only that user's reservations are returned.
    async fn list_reservations(&self, owner: Option<UserId>) -> Result<Vec<ReservationWithItems>>;

    /// Appends an audit entry outside of any transaction.
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntryId>;

    /// Lists the most recent audit entries, newest first.
    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>>;

    /// Retrieves an audit entry by ID.
    async fn get_audit(&self, id: AuditEntryId) -> Result<Option<AuditEntry>>;
}

/// An open unit of work against the store.
///
/// Nothing written through a transaction is visible to other readers until
/// [`Transaction::commit`] succeeds.
#[async_trait]
pub trait Transaction: Send {
    /// Inserts a reservation header owned by `user_id`.
    async fn insert_reservation(
        &mut self,
        user_id: UserId,
        status: ReservationStatus,
    ) -> Result<Reservation>;

    /// Reads a product and locks its row until the transaction ends.
    async fn find_product_for_update(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Inserts a line item.
    async fn insert_line(&mut self, line: &NewReservationLine) -> Result<ReservationLine>;

    /// Subtracts `quantity` from a product's stock.
    ///
    /// Fails with `Conflict` if the stock would go negative.
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: i64) -> Result<()>;

    /// Appends an audit entry.
    ///
    /// A failed append leaves the transaction usable.
    async fn append_audit(&mut self, entry: &NewAuditEntry) -> Result<AuditEntryId>;

    /// Commits every write made through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write made through this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Runs `work` inside a transaction.
///
/// Commits when `work` returns `Ok` and rolls back when it returns `Err`.
/// If the returned future is dropped midway, the transaction handle is
/// dropped with it and rolls back as well.
pub async fn with_transaction<S, T, E, F>(store: &S, work: F) -> std::result::Result<T, E>
where
    S: Store + ?Sized,
    T: Send,
    E: From<StoreError> + Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, std::result::Result<T, E>>
        + Send,
{
    let mut tx = store.begin().await?;
    let outcome = work(&mut *tx).await;

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Checks if a reservation exists.
    async fn reservation_exists(&self, id: ReservationId) -> Result<bool> {
        Ok(self.get_reservation(id).await?.is_some())
    }

    /// Returns the current stock of a product, if it exists.
    async fn stock_of(&self, id: ProductId) -> Result<Option<i64>> {
        Ok(self.get_product(id).await?.map(|p| p.stock_quantity))
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
