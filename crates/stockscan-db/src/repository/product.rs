//! # Product Repository
//!
//! Database operations for serialized products.
//!
//! ## Unit Code Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  find_by_code("imei-0002")                              │
//! │                                                                         │
//! │  1. SQL prefilter (case-insensitive LIKE over the stored string)        │
//! │                                                                         │
//! │     store-1 │ Phone X │ "IMEI-0001,IMEI-0002"  ← candidate              │
//! │     store-1 │ Phone Y │ "IMEI-00021"           ← candidate              │
//! │     store-1 │ Case    │ ""                                              │
//! │                                                                         │
//! │  2. Decode lists, exact element match in Rust                           │
//! │                                                                         │
//! │     Phone X  ✓ (element "IMEI-0002")                                    │
//! │     Phone Y  ✗ (substring only)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockscan_core::codes;
use stockscan_core::Product;

/// Row shape of the `products` table; lists are still delimited strings.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    store_id: String,
    name: String,
    unit_codes: String,
    unit_tags: String,
    price_cents: i64,
    stocked_qty: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let (unit_codes, unit_tags) = codes::decode_units(&row.unit_codes, &row.unit_tags);
        Product {
            id: row.id,
            store_id: row.store_id,
            name: row.name,
            unit_codes,
            unit_tags,
            price_cents: row.price_cents,
            stocked_qty: row.stocked_qty,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT id, store_id, name, unit_codes, unit_tags,
           price_cents, stocked_qty, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists a store's products, sorted by name.
    pub async fn list_by_store(&self, store_id: &str) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE store_id = ?1 ORDER BY name"))
                .bind(store_id)
                .fetch_all(&self.pool)
                .await?;

        debug!(store_id = %store_id, count = rows.len(), "Loaded store catalog");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Finds the store product owning a unit code (case-insensitive,
    /// exact element match).
    pub async fn find_by_code(&self, store_id: &str, code: &str) -> DbResult<Option<Product>> {
        let code = codes::normalize(code);
        if code.is_empty() {
            return Ok(None);
        }

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE store_id = ?1 AND unit_codes LIKE '%' || ?2 || '%'"
        ))
        .bind(store_id)
        .bind(&code)
        .fetch_all(&self.pool)
        .await?;

        let found = rows
            .into_iter()
            .map(Product::from)
            .find(|product| product.owns(&code));

        debug!(store_id = %store_id, code = %code, found = found.is_some(), "Looked up unit code");
        Ok(found)
    }

    /// Inserts a new product. An empty id is replaced with a fresh UUID.
    ///
    /// ## Errors
    /// - [`DbError::InvalidData`] when a code or tag contains the delimiter
    /// - [`DbError::UniqueViolation`] when the id exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        let mut product = product.clone();
        if product.id.is_empty() {
            product.id = generate_product_id();
        }

        let unit_codes = codes::encode_list("unit_codes", &product.unit_codes)?;
        let unit_tags = codes::encode_list("unit_tags", &product.unit_tags)?;

        debug!(
            id = %product.id,
            name = %product.name,
            units = product.unit_codes.len(),
            "Inserting product"
        );

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, name, unit_codes, unit_tags,
                price_cents, stocked_qty, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.name)
        .bind(unit_codes)
        .bind(unit_tags)
        .bind(product.price_cents)
        .bind(product.stocked_qty)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates an existing product.
    ///
    /// ## Errors
    /// [`DbError::NotFound`] when no product has this id.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let unit_codes = codes::encode_list("unit_codes", &product.unit_codes)?;
        let unit_tags = codes::encode_list("unit_tags", &product.unit_tags)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                unit_codes = ?3,
                unit_tags = ?4,
                price_cents = ?5,
                stocked_qty = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(unit_codes)
        .bind(unit_tags)
        .bind(product.price_cents)
        .bind(product.stocked_qty)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product (its inventory records cascade).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts a store's products (for diagnostics).
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = ?1")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn phone(id: &str, name: &str, codes: &[&str]) -> Product {
        Product::new(id, "store-1", name, 49_900).with_units(
            codes.iter().map(|c| c.to_string()).collect(),
            codes.iter().map(|_| "128GB".to_string()).collect(),
        )
    }

    async fn repo() -> ProductRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().products()
    }

    #[tokio::test]
    async fn test_insert_and_read_back_lists() {
        let repo = repo().await;
        repo.insert(&phone("p1", "Phone X", &["IMEI-0001", "IMEI-0002"]))
            .await
            .unwrap();

        let loaded = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(loaded.unit_codes, vec!["IMEI-0001", "IMEI-0002"]);
        assert_eq!(loaded.unit_tags, vec!["128GB", "128GB"]);
    }

    #[tokio::test]
    async fn test_find_by_code_is_exact_and_case_insensitive() {
        let repo = repo().await;
        repo.insert(&phone("p1", "Phone X", &["IMEI-0001", "IMEI-0002"])).await.unwrap();
        repo.insert(&phone("p2", "Phone Y", &["IMEI-00021"])).await.unwrap();

        let found = repo.find_by_code("store-1", "imei-0002").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some("p1".to_string()));

        let found = repo.find_by_code("store-1", "IMEI-00021").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some("p2".to_string()));

        assert!(repo.find_by_code("store-1", "IMEI-000").await.unwrap().is_none());
        assert!(repo.find_by_code("store-2", "IMEI-0001").await.unwrap().is_none());
        assert!(repo.find_by_code("store-1", "  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_refuses_delimiter_in_code() {
        let repo = repo().await;
        let mut bad = phone("p1", "Phone X", &["A1"]);
        bad.unit_codes = vec!["A,1".into()];

        assert!(matches!(repo.insert(&bad).await, Err(DbError::InvalidData(_))));
        assert_eq!(repo.count("store-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_generates_missing_id() {
        let repo = repo().await;
        let saved = repo.insert(&phone("", "Phone Z", &[])).await.unwrap();
        assert!(!saved.id.is_empty());
        assert!(repo.get_by_id(&saved.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = repo().await;
        let mut product = repo.insert(&phone("p1", "Phone X", &["A1"])).await.unwrap();

        product.unit_codes.push("A2".into());
        product.unit_tags.push(String::new());
        repo.update(&product).await.unwrap();

        let loaded = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(loaded.unit_codes, vec!["A1", "A2"]);
        assert_eq!(loaded.unit_tags, vec!["128GB", ""]);

        repo.delete("p1").await.unwrap();
        assert!(matches!(repo.delete("p1").await, Err(DbError::NotFound { .. })));
        assert!(matches!(
            repo.update(&product).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_by_store_sorted_by_name() {
        let repo = repo().await;
        repo.insert(&phone("p2", "Phone Y", &[])).await.unwrap();
        repo.insert(&phone("p1", "Phone X", &[])).await.unwrap();

        let names: Vec<String> = repo
            .list_by_store("store-1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Phone X", "Phone Y"]);
    }
}
