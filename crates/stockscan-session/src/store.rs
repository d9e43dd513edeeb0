//! # Ledger Store
//!
//! The narrow persistence interface the session layer talks to.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerStore                                                            │
//! │                                                                         │
//! │  catalog    find_product_by_code · list_products · get_product ·        │
//! │             save_product                                                │
//! │  ledger     codes_sold_among · insert_committed_lines ·                 │
//! │             get_committed_line · update_committed_line ·                │
//! │             delete_committed_line                                       │
//! │  inventory  get_inventory · insert_inventory_if_absent ·                │
//! │             upsert_inventory_record · update_available_qty ·            │
//! │             compare_and_set_available_qty                               │
//! │                                                                         │
//! │  impls      stockscan_db::Database (SQLite)                             │
//! │             crate::memory::InMemoryStore                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::future::Future;

use stockscan_core::{CommittedLine, InventoryRecord, LineEdit, Product};
use stockscan_db::Database;

use crate::error::SessionResult;

/// Read/write operations on products, committed lines and inventory.
///
/// All lookups are scoped to a store. Code comparisons are case-insensitive.
pub trait LedgerStore: Send + Sync + 'static {
    /// The store product owning `code`, if any.
    fn find_product_by_code(
        &self,
        store_id: &str,
        code: &str,
    ) -> impl Future<Output = SessionResult<Option<Product>>> + Send;

    /// Every product of the store.
    fn list_products(
        &self,
        store_id: &str,
    ) -> impl Future<Output = SessionResult<Vec<Product>>> + Send;

    fn get_product(&self, id: &str) -> impl Future<Output = SessionResult<Option<Product>>> + Send;

    /// Inserts a new product or overwrites an existing one with the same id.
    fn save_product(
        &self,
        product: &Product,
    ) -> impl Future<Output = SessionResult<Product>> + Send;

    /// The subset of `codes` already on a committed sale or debt line of the
    /// store, spelled as given.
    fn codes_sold_among(
        &self,
        store_id: &str,
        codes: &[String],
    ) -> impl Future<Output = SessionResult<HashSet<String>>> + Send;

    /// Inserts a batch of lines; returns their ids in order.
    fn insert_committed_lines(
        &self,
        lines: &[CommittedLine],
    ) -> impl Future<Output = SessionResult<Vec<String>>> + Send;

    fn get_committed_line(
        &self,
        id: &str,
    ) -> impl Future<Output = SessionResult<Option<CommittedLine>>> + Send;

    fn update_committed_line(
        &self,
        id: &str,
        edit: &LineEdit,
    ) -> impl Future<Output = SessionResult<CommittedLine>> + Send;

    fn delete_committed_line(&self, id: &str) -> impl Future<Output = SessionResult<()>> + Send;

    fn get_inventory(
        &self,
        product_id: &str,
        store_id: &str,
    ) -> impl Future<Output = SessionResult<Option<InventoryRecord>>> + Send;

    /// Creates the record unless the pair already has one; true if created.
    fn insert_inventory_if_absent(
        &self,
        record: &InventoryRecord,
    ) -> impl Future<Output = SessionResult<bool>> + Send;

    /// Sets both counters of the pair, creating the record if needed.
    fn upsert_inventory_record(
        &self,
        product_id: &str,
        store_id: &str,
        available_qty: i64,
        quantity_sold: i64,
    ) -> impl Future<Output = SessionResult<()>> + Send;

    /// Plain overwrite of `available_qty`.
    fn update_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        new_qty: i64,
    ) -> impl Future<Output = SessionResult<()>> + Send;

    /// Writes `new_qty` only if `available_qty` still equals `expected`, adding
    /// `max(sold_delta, 0)` to `quantity_sold`. False when the value moved.
    fn compare_and_set_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        expected: i64,
        new_qty: i64,
        sold_delta: i64,
    ) -> impl Future<Output = SessionResult<bool>> + Send;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

impl LedgerStore for Database {
    async fn find_product_by_code(
        &self,
        store_id: &str,
        code: &str,
    ) -> SessionResult<Option<Product>> {
        Ok(self.products().find_by_code(store_id, code).await?)
    }

    async fn list_products(&self, store_id: &str) -> SessionResult<Vec<Product>> {
        Ok(self.products().list_by_store(store_id).await?)
    }

    async fn get_product(&self, id: &str) -> SessionResult<Option<Product>> {
        Ok(self.products().get_by_id(id).await?)
    }

    async fn save_product(&self, product: &Product) -> SessionResult<Product> {
        let products = self.products();
        if !product.id.is_empty() && products.get_by_id(&product.id).await?.is_some() {
            products.update(product).await?;
            return Ok(product.clone());
        }
        Ok(products.insert(product).await?)
    }

    async fn codes_sold_among(
        &self,
        store_id: &str,
        codes: &[String],
    ) -> SessionResult<HashSet<String>> {
        Ok(self.ledger().codes_sold_among(store_id, codes).await?)
    }

    async fn insert_committed_lines(&self, lines: &[CommittedLine]) -> SessionResult<Vec<String>> {
        Ok(self.ledger().insert_lines(lines).await?)
    }

    async fn get_committed_line(&self, id: &str) -> SessionResult<Option<CommittedLine>> {
        Ok(self.ledger().get(id).await?)
    }

    async fn update_committed_line(
        &self,
        id: &str,
        edit: &LineEdit,
    ) -> SessionResult<CommittedLine> {
        Ok(self.ledger().update_line(id, edit).await?)
    }

    async fn delete_committed_line(&self, id: &str) -> SessionResult<()> {
        Ok(self.ledger().delete_line(id).await?)
    }

    async fn get_inventory(
        &self,
        product_id: &str,
        store_id: &str,
    ) -> SessionResult<Option<InventoryRecord>> {
        Ok(self.inventory().get(product_id, store_id).await?)
    }

    async fn insert_inventory_if_absent(&self, record: &InventoryRecord) -> SessionResult<bool> {
        Ok(self.inventory().insert_if_absent(record).await?)
    }

    async fn upsert_inventory_record(
        &self,
        product_id: &str,
        store_id: &str,
        available_qty: i64,
        quantity_sold: i64,
    ) -> SessionResult<()> {
        Ok(self
            .inventory()
            .upsert(product_id, store_id, available_qty, quantity_sold)
            .await?)
    }

    async fn update_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        new_qty: i64,
    ) -> SessionResult<()> {
        Ok(self
            .inventory()
            .update_available_qty(product_id, store_id, new_qty)
            .await?)
    }

    async fn compare_and_set_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        expected: i64,
        new_qty: i64,
        sold_delta: i64,
    ) -> SessionResult<bool> {
        Ok(self
            .inventory()
            .compare_and_set_available_qty(product_id, store_id, expected, new_qty, sold_delta)
            .await?)
    }
}
