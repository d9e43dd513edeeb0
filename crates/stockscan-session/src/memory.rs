//! In-memory [`LedgerStore`] for tests and offline demos.
//!
//! Behaves like the SQLite store: case-insensitive code matching, delimiter
//! checks on write, one inventory record per (product, store). It can also be
//! switched offline or made to lose compare-and-set races, which the SQLite
//! store cannot be asked to do on demand.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use stockscan_core::codes;
use stockscan_core::{CommittedLine, InventoryRecord, LineEdit, Product, SettlementStatus};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::store::LedgerStore;

#[derive(Debug, Default)]
struct MemoryState {
    products: Vec<Product>,
    inventory: HashMap<(String, String), InventoryRecord>,
    lines: Vec<CommittedLine>,
    offline: bool,
    cas_conflicts: u32,
}

impl MemoryState {
    fn check_online(&self) -> SessionResult<()> {
        if self.offline {
            return Err(SessionError::Persistence("store is offline".into()));
        }
        Ok(())
    }
}

/// A store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with products (no inventory records yet).
    pub fn with_products(products: Vec<Product>) -> Self {
        InMemoryStore {
            state: Mutex::new(MemoryState {
                products,
                ..MemoryState::default()
            }),
        }
    }

    /// While offline every operation fails with a persistence error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// The next `count` compare-and-set writes lose their race: another
    /// terminal takes one unit just before each of them.
    pub async fn inject_cas_conflicts(&self, count: u32) {
        self.state.lock().await.cas_conflicts = count;
    }

    /// Snapshot of every committed line.
    pub async fn committed_lines(&self) -> Vec<CommittedLine> {
        self.state.lock().await.lines.clone()
    }
}

impl LedgerStore for InMemoryStore {
    async fn find_product_by_code(
        &self,
        store_id: &str,
        code: &str,
    ) -> SessionResult<Option<Product>> {
        let state = self.state.lock().await;
        state.check_online()?;

        let code = codes::normalize(code);
        if code.is_empty() {
            return Ok(None);
        }
        Ok(state
            .products
            .iter()
            .find(|p| p.store_id == store_id && p.owns(&code))
            .cloned())
    }

    async fn list_products(&self, store_id: &str) -> SessionResult<Vec<Product>> {
        let state = self.state.lock().await;
        state.check_online()?;

        let mut products: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.store_id == store_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn get_product(&self, id: &str) -> SessionResult<Option<Product>> {
        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn save_product(&self, product: &Product) -> SessionResult<Product> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        codes::encode_list("unit_codes", &product.unit_codes)
            .map_err(stockscan_core::CoreError::from)?;
        codes::encode_list("unit_tags", &product.unit_tags)
            .map_err(stockscan_core::CoreError::from)?;

        let mut saved = product.clone();
        if saved.id.is_empty() {
            saved.id = Uuid::new_v4().to_string();
        }
        saved.updated_at = Utc::now();

        match state.products.iter_mut().find(|p| p.id == saved.id) {
            Some(existing) => *existing = saved.clone(),
            None => state.products.push(saved.clone()),
        }
        Ok(saved)
    }

    async fn codes_sold_among(
        &self,
        store_id: &str,
        candidates: &[String],
    ) -> SessionResult<HashSet<String>> {
        let state = self.state.lock().await;
        state.check_online()?;

        let sold: HashSet<String> = state
            .lines
            .iter()
            .filter(|line| line.store_id == store_id)
            .flat_map(|line| line.unit_codes.iter().map(|c| codes::code_key(c)))
            .collect();

        Ok(candidates
            .iter()
            .filter(|c| sold.contains(&codes::code_key(c)))
            .cloned()
            .collect())
    }

    async fn insert_committed_lines(&self, lines: &[CommittedLine]) -> SessionResult<Vec<String>> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        for line in lines {
            codes::encode_list("unit_codes", &line.unit_codes)
                .map_err(stockscan_core::CoreError::from)?;
            codes::encode_list("unit_tags", &line.unit_tags)
                .map_err(stockscan_core::CoreError::from)?;
        }

        state.lines.extend(lines.iter().cloned());
        debug!(count = lines.len(), "Inserted committed lines");
        Ok(lines.iter().map(|l| l.id.clone()).collect())
    }

    async fn get_committed_line(&self, id: &str) -> SessionResult<Option<CommittedLine>> {
        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state.lines.iter().find(|l| l.id == id).cloned())
    }

    async fn update_committed_line(
        &self,
        id: &str,
        edit: &LineEdit,
    ) -> SessionResult<CommittedLine> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        codes::encode_list("unit_codes", &edit.unit_codes)
            .map_err(stockscan_core::CoreError::from)?;
        codes::encode_list("unit_tags", &edit.unit_tags).map_err(stockscan_core::CoreError::from)?;

        let line = state
            .lines
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| SessionError::NotFound {
                entity: "Committed line".into(),
                id: id.to_string(),
            })?;

        line.quantity = edit.quantity;
        line.unit_price_cents = edit.unit_price_cents;
        line.amount_cents = edit.amount_cents();
        line.unit_codes = edit.unit_codes.clone();
        line.unit_tags = edit.unit_tags.clone();
        line.counterparty = edit.counterparty.clone();
        line.payment_method = edit.payment_method;
        line.amount_paid_cents = edit.amount_paid_cents;
        line.settlement = SettlementStatus::from_amounts(edit.amount_paid_cents, line.amount_cents);
        line.updated_at = Utc::now();

        Ok(line.clone())
    }

    async fn delete_committed_line(&self, id: &str) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        let before = state.lines.len();
        state.lines.retain(|l| l.id != id);
        if state.lines.len() == before {
            return Err(SessionError::NotFound {
                entity: "Committed line".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_inventory(
        &self,
        product_id: &str,
        store_id: &str,
    ) -> SessionResult<Option<InventoryRecord>> {
        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state
            .inventory
            .get(&(product_id.to_string(), store_id.to_string()))
            .cloned())
    }

    async fn insert_inventory_if_absent(&self, record: &InventoryRecord) -> SessionResult<bool> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        let key = (record.product_id.clone(), record.store_id.clone());
        if state.inventory.contains_key(&key) {
            return Ok(false);
        }
        state.inventory.insert(key, record.clone());
        Ok(true)
    }

    async fn upsert_inventory_record(
        &self,
        product_id: &str,
        store_id: &str,
        available_qty: i64,
        quantity_sold: i64,
    ) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        state.inventory.insert(
            (product_id.to_string(), store_id.to_string()),
            InventoryRecord {
                product_id: product_id.to_string(),
                store_id: store_id.to_string(),
                available_qty,
                quantity_sold,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn update_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        new_qty: i64,
    ) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        let record = state
            .inventory
            .get_mut(&(product_id.to_string(), store_id.to_string()))
            .ok_or_else(|| SessionError::NotFound {
                entity: "Inventory".into(),
                id: format!("{product_id}@{store_id}"),
            })?;
        record.available_qty = new_qty;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn compare_and_set_available_qty(
        &self,
        product_id: &str,
        store_id: &str,
        expected: i64,
        new_qty: i64,
        sold_delta: i64,
    ) -> SessionResult<bool> {
        let mut state = self.state.lock().await;
        state.check_online()?;

        let interfere = state.cas_conflicts > 0;
        if interfere {
            state.cas_conflicts -= 1;
        }

        let Some(record) = state
            .inventory
            .get_mut(&(product_id.to_string(), store_id.to_string()))
        else {
            return Ok(false);
        };

        if interfere {
            record.available_qty -= 1;
            record.quantity_sold += 1;
        }

        if record.available_qty != expected {
            return Ok(false);
        }

        record.available_qty = new_qty;
        record.quantity_sold += sold_delta.max(0);
        record.updated_at = Utc::now();
        Ok(true)
    }
}
