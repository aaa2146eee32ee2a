use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    AuditEntryId, CategoryId, Money, ProductId, ReservationId, ReservationItemId,
    ReservationStatus, UserId,
};
use sqlx::{PgExecutor, PgPool, Postgres, Row, postgres::PgRow};

use crate::{
    AuditEntry, NewAuditEntry, NewProduct, NewReservationLine, Product, ProductChanges,
    ProductPricing, Reservation, ReservationItemView, ReservationLine, ReservationWithItems,
    Result, StoreError,
    store::{Store, Transaction},
};

/// Product columns with the decimal price columns converted to cents.
const PRODUCT_COLUMNS: &str = "id, name, description, \
     ROUND(price * 100)::BIGINT AS price_cents, \
     ROUND(unit_price * 100)::BIGINT AS unit_price_as_cents, \
     unit_price_cents, stock_quantity, category_id, created_at";

const RESERVATION_COLUMNS: &str = "id, user_id, status, handled_by, created_at";

const AUDIT_COLUMNS: &str =
    "id, actor_user_id, action, entity_type, entity_id, meta, details, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        pricing: ProductPricing {
            price: row
                .try_get::<Option<i64>, _>("price_cents")?
                .map(Money::from_cents),
            unit_price: row
                .try_get::<Option<i64>, _>("unit_price_as_cents")?
                .map(Money::from_cents),
            unit_price_cents: row.try_get("unit_price_cents")?,
        },
        stock_quantity: row.try_get("stock_quantity")?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_reservation(row: PgRow) -> Result<Reservation> {
    let status: String = row.try_get("status")?;
    Ok(Reservation {
        id: ReservationId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        status: status
            .parse()
            .map_err(|e: common::UnknownStatus| StoreError::InvalidData(e.to_string()))?,
        handled_by: row
            .try_get::<Option<i64>, _>("handled_by")?
            .map(UserId::new),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_audit(row: PgRow) -> Result<AuditEntry> {
    Ok(AuditEntry {
        id: AuditEntryId::new(row.try_get("id")?),
        actor_user_id: UserId::new(row.try_get("actor_user_id")?),
        action: row.try_get("action")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        meta: row.try_get("meta")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_audit_row<'e, E>(executor: E, entry: &NewAuditEntry) -> Result<AuditEntryId>
where
    E: PgExecutor<'e>,
{
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO audit_logs (actor_user_id, action, entity_type, entity_id, meta, details)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING id
        "#,
    )
    .bind(entry.actor_user_id.as_i64())
    .bind(&entry.action)
    .bind(&entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.details)
    .fetch_one(executor)
    .await?;

    Ok(AuditEntryId::new(id))
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_product).transpose()
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (name, description, price, stock_quantity, category_id)
            VALUES ($1, $2, $3::NUMERIC / 100, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.map(|p| p.cents()))
            .bind(product.stock_quantity.unwrap_or(0))
            .bind(product.category_id.map(|c| c.as_i64()))
            .fetch_one(&self.pool)
            .await?;
        row_to_product(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>> {
        let sql = format!(
            r#"
            UPDATE products
            SET
                name = COALESCE($1, name),
                description = COALESCE($2, description),
                price = COALESCE($3::NUMERIC / 100, price),
                stock_quantity = COALESCE($4, stock_quantity),
                category_id = COALESCE($5, category_id)
            WHERE id = $6
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.price.map(|p| p.cents()))
            .bind(changes.stock_quantity)
            .bind(changes.category_id.map(|c| c.as_i64()))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_product).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_reservation).transpose()
    }

    async fn update_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
        handled_by: UserId,
    ) -> Result<Option<Reservation>> {
        let sql = format!(
            r#"
            UPDATE reservations
            SET status = $1, handled_by = $2
            WHERE id = $3
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(handled_by.as_i64())
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_reservation).transpose()
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reservations(&self, owner: Option<UserId>) -> Result<Vec<ReservationWithItems>> {
        let sql = format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE $1::BIGINT IS NULL OR user_id = $1
            ORDER BY id DESC
            "#
        );
        let reservations = sqlx::query(&sql)
            .bind(owner.map(|o| o.as_i64()))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_reservation)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = reservations.iter().map(|r| r.id.as_i64()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT ri.reservation_id, ri.product_id, p.name, ri.quantity,
                   ROUND(ri.unit_price_snapshot * 100)::BIGINT AS unit_price_snapshot_cents
            FROM reservation_items ri
            JOIN products p ON p.id = ri.product_id
            WHERE ri.reservation_id = ANY($1)
            ORDER BY ri.id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<ReservationId, Vec<ReservationItemView>> = HashMap::new();
        for row in item_rows {
            let reservation_id = ReservationId::new(row.try_get("reservation_id")?);
            items
                .entry(reservation_id)
                .or_default()
                .push(ReservationItemView {
                    product_id: ProductId::new(row.try_get("product_id")?),
                    name: row.try_get("name")?,
                    quantity: row.try_get("quantity")?,
                    unit_price_snapshot: Money::from_cents(
                        row.try_get("unit_price_snapshot_cents")?,
                    ),
                });
        }

        Ok(reservations
            .into_iter()
            .map(|reservation| ReservationWithItems {
                items: items.remove(&reservation.id).unwrap_or_default(),
                reservation,
            })
            .collect())
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntryId> {
        insert_audit_row(&self.pool, entry).await
    }

    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let sql = format!("SELECT {AUDIT_COLUMNS} FROM audit_logs ORDER BY id DESC LIMIT $1");
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_audit).collect()
    }

    async fn get_audit(&self, id: AuditEntryId) -> Result<Option<AuditEntry>> {
        let sql = format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_audit).transpose()
    }
}

/// A transaction on a pooled PostgreSQL connection.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn insert_reservation(
        &mut self,
        user_id: UserId,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        let sql = format!(
            "INSERT INTO reservations (user_id, status) VALUES ($1, $2) \
             RETURNING {RESERVATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .bind(status.as_str())
            .fetch_one(&mut *self.tx)
            .await?;
        row_to_reservation(row)
    }

    async fn find_product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(row_to_product).transpose()
    }

    async fn insert_line(&mut self, line: &NewReservationLine) -> Result<ReservationLine> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reservation_items (reservation_id, product_id, quantity, unit_price_snapshot)
            VALUES ($1, $2, $3, $4::NUMERIC / 100)
            RETURNING id
            "#,
        )
        .bind(line.reservation_id.as_i64())
        .bind(line.product_id.as_i64())
        .bind(line.quantity)
        .bind(line.unit_price_snapshot.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(ReservationLine {
            id: ReservationItemId::new(id),
            reservation_id: line.reservation_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price_snapshot: line.unit_price_snapshot,
        })
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: i64) -> Result<()> {
        let result =
            sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $1 WHERE id = $2")
                .bind(quantity)
                .bind(product_id.as_i64())
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidData(format!(
                "product {product_id} disappeared while locked"
            )));
        }
        Ok(())
    }

    async fn append_audit(&mut self, entry: &NewAuditEntry) -> Result<AuditEntryId> {
        // A failed statement aborts the whole PostgreSQL transaction, so the
        // insert runs under a savepoint that is rolled back on failure.
        sqlx::query("SAVEPOINT audit_entry")
            .execute(&mut *self.tx)
            .await?;

        match insert_audit_row(&mut *self.tx, entry).await {
            Ok(id) => {
                sqlx::query("RELEASE SAVEPOINT audit_entry")
                    .execute(&mut *self.tx)
                    .await?;
                Ok(id)
            }
            Err(err) => {
                sqlx::query("ROLLBACK TO SAVEPOINT audit_entry")
                    .execute(&mut *self.tx)
                    .await?;
                Err(err)
            }
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
