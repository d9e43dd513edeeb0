//! # Inventory Repository
//!
//! Aggregate stock counters, one row per (product, store).
//!
//! ## Write Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  insert_if_absent      lazy creation; never overwrites a row        │
//! │  upsert                explicit set of both counters                │
//! │  update_available_qty  plain write of a value read earlier          │
//! │  compare_and_set_…     write only if available_qty is unchanged     │
//! │                                                                     │
//! │  Terminal A reads 5 ─┐                                              │
//! │  Terminal B reads 5 ─┼─ A: CAS(5 → 3) ✓                             │
//! │                      └─ B: CAS(5 → 4) ✗  re-read 3, CAS(3 → 2) ✓    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockscan_core::InventoryRecord;

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    product_id: String,
    store_id: String,
    available_qty: i64,
    quantity_sold: i64,
    updated_at: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        InventoryRecord {
            product_id: row.product_id,
            store_id: row.store_id,
            available_qty: row.available_qty,
            quantity_sold: row.quantity_sold,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for inventory counters.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets the record for a (product, store) pair.
    pub async fn get(&self, product_id: &str, store_id: &str) -> DbResult<Option<InventoryRecord>> {
        let row: Option<InventoryRow> = sqlx::query_as(
            r#"
            SELECT product_id, store_id, available_qty, quantity_sold, updated_at
            FROM inventory
            WHERE product_id = ?1 AND store_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InventoryRecord::from))
    }

    /// Lists every record of a store.
    pub async fn list_by_store(&self, store_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let rows: Vec<InventoryRow> = sqlx::query_as(
            r#"
            SELECT product_id, store_id, available_qty, quantity_sold, updated_at
            FROM inventory
            WHERE store_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryRecord::from).collect())
    }

    /// Creates the record unless one already exists for the pair.
    ///
    /// ## Returns
    /// `true` if this call created the row.
    pub async fn insert_if_absent(&self, record: &InventoryRecord) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO inventory (product_id, store_id, available_qty, quantity_sold, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (product_id, store_id) DO NOTHING
            "#,
        )
        .bind(&record.product_id)
        .bind(&record.store_id)
        .bind(record.available_qty)
        .bind(record.quantity_sold)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        debug!(
            product_id = %record.product_id,
            store_id = %record.store_id,
            created,
            "Ensured inventory record"
        );
        Ok(created)
    }

    /// Inserts or overwrites the record for the pair.
    pub async fn upsert(
        &self,
        product_id: &str,
        store_id: &str,
        available_qty: i64,
        quantity_sold: i64,
    ) -> DbResult<()> {
        debug!(
            product_id = %product_id,
            available_qty,
            quantity_sold,
            "Upserting inventory record"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, store_id, available_qty, quantity_sold, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (product_id, store_id) DO UPDATE SET
                available_qty = excluded.available_qty,
                quantity_sold = excluded.quantity_sold,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(available_qty)
        .bind(quantity_sold)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrites `available_qty` with a previously computed value.
    ///
    /// ## Errors
    /// [`DbError::NotFound`] when the pair has no record.
    pub async fn update_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        new_qty: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET available_qty = ?3, updated_at = ?4
            WHERE product_id = ?1 AND store_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(new_qty)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", format!("{product_id}@{store_id}")));
        }

        Ok(())
    }

    /// Writes `new_qty` only if `available_qty` still equals `expected`, and
    /// adds `sold_delta` to `quantity_sold` in the same statement.
    ///
    /// ## Returns
    /// `false` when another writer changed the counter first (or the record
    /// does not exist); nothing is written in that case.
    pub async fn compare_and_set_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        expected: i64,
        new_qty: i64,
        sold_delta: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET available_qty = ?4,
                quantity_sold = quantity_sold + ?5,
                updated_at = ?6
            WHERE product_id = ?1 AND store_id = ?2 AND available_qty = ?3
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(expected)
        .bind(new_qty)
        .bind(sold_delta.max(0))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(
            product_id = %product_id,
            expected,
            new_qty,
            applied,
            "Compare-and-set available quantity"
        );
        Ok(applied)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockscan_core::Product;

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&Product::new("p1", "store-1", "Phone X", 100).with_stocked_qty(10))
            .await
            .unwrap();
        (db, product)
    }

    #[tokio::test]
    async fn test_insert_if_absent_never_overwrites() {
        let (db, product) = setup().await;
        let repo = db.inventory();

        let seed = InventoryRecord::seeded_from(&product);
        assert!(repo.insert_if_absent(&seed).await.unwrap());

        repo.update_available_qty("p1", "store-1", 3).await.unwrap();
        assert!(!repo.insert_if_absent(&seed).await.unwrap());

        let record = repo.get("p1", "store-1").await.unwrap().unwrap();
        assert_eq!(record.available_qty, 3);
    }

    #[tokio::test]
    async fn test_upsert_keyed_on_pair() {
        let (db, _) = setup().await;
        let repo = db.inventory();

        repo.upsert("p1", "store-1", 10, 0).await.unwrap();
        repo.upsert("p1", "store-1", 8, 2).await.unwrap();

        let records = repo.list_by_store("store-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].available_qty, 8);
        assert_eq!(records[0].quantity_sold, 2);
    }

    #[tokio::test]
    async fn test_compare_and_set_detects_conflict() {
        let (db, _) = setup().await;
        let repo = db.inventory();
        repo.upsert("p1", "store-1", 5, 0).await.unwrap();

        assert!(repo
            .compare_and_set_available_qty("p1", "store-1", 5, 3, 2)
            .await
            .unwrap());
        assert!(!repo
            .compare_and_set_available_qty("p1", "store-1", 5, 4, 1)
            .await
            .unwrap());

        let record = repo.get("p1", "store-1").await.unwrap().unwrap();
        assert_eq!(record.available_qty, 3);
        assert_eq!(record.quantity_sold, 2);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let (db, _) = setup().await;
        assert!(matches!(
            db.inventory().update_available_qty("p1", "store-9", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_requires_product() {
        let (db, _) = setup().await;
        assert!(matches!(
            db.inventory().upsert("missing", "store-1", 1, 0).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));
    }
}
