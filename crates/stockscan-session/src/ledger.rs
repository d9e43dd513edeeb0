//! # Stock Ledger Updater
//!
//! Persists committed lines and moves the aggregate stock counters with them.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(lines)                                                          │
//! │     │                                                                   │
//! │     ├─ 1. codes_sold_among(all codes)  → any hit: CodesAlreadySold      │
//! │     ├─ 2. ensure inventory record per product (lazy, seeded)            │
//! │     ├─ 3. plan_commit                  → shortage: InsufficientStock    │
//! │     │        (nothing written before this point)                        │
//! │     ├─ 4. insert_committed_lines (one batch)                            │
//! │     └─ 5. per product: compare-and-set available_qty                    │
//! │              lost race → re-read, re-apply, up to cas_max_retries       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 5 runs after the lines are stored. A failure there comes back as
//! [`SessionError::StockPending`] carrying the adjustments not yet applied:
//! the transaction is committed and only those go through [`StockLedger::settle`]
//! again. Re-running step 4 would store the lines twice.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use stockscan_core::codes;
use stockscan_core::stock::{self, StockAdjustment};
use stockscan_core::{CommittedLine, InventoryRecord, LineEdit};
use tracing::{error, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::store::LedgerStore;

/// What a successful commit wrote.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub transaction_id: String,
    pub line_ids: Vec<String>,
    /// Counters after the write, one per product.
    pub inventory: Vec<InventoryRecord>,
}

/// Applies commits, edits and deletes to the ledger and the stock counters.
#[derive(Debug)]
pub struct StockLedger<S> {
    store: Arc<S>,
    store_id: String,
    cas_max_retries: u32,
}

impl<S> Clone for StockLedger<S> {
    fn clone(&self) -> Self {
        StockLedger {
            store: Arc::clone(&self.store),
            store_id: self.store_id.clone(),
            cas_max_retries: self.cas_max_retries,
        }
    }
}

impl<S: LedgerStore> StockLedger<S> {
    pub fn new(store: Arc<S>, store_id: impl Into<String>, cas_max_retries: u32) -> Self {
        StockLedger {
            store,
            store_id: store_id.into(),
            cas_max_retries,
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Persists a transaction's lines and decrements stock per product.
    ///
    /// ## Errors
    /// - [`SessionError::CodesAlreadySold`]: a unit was sold by someone else
    /// - [`SessionError::Core`] with `InsufficientStock`: not enough on hand
    /// - [`SessionError::Persistence`]: any store failure before the insert
    /// - [`SessionError::StockPending`]: lines stored, some counters not moved
    ///
    /// The first two leave the store untouched.
    pub async fn commit(&self, lines: &[CommittedLine]) -> SessionResult<CommitReceipt> {
        let transaction_id = lines
            .first()
            .map(|l| l.transaction_id.clone())
            .ok_or(stockscan_core::CoreError::EmptyTransaction)?;

        let all_codes: Vec<String> = lines
            .iter()
            .flat_map(|l| l.unit_codes.iter().cloned())
            .collect();
        self.reject_sold(&all_codes).await?;

        let mut available: HashMap<String, i64> = HashMap::new();
        for (product_id, _, _) in stock::demand_by_product(lines) {
            let record = self.ensure_record(&product_id).await?;
            available.insert(product_id, record.available_qty);
        }

        let plan = stock::plan_commit(lines, &available)?;

        let line_ids = self.store.insert_committed_lines(lines).await?;
        let inventory = self.settle(&transaction_id, &line_ids, &plan).await?;

        info!(
            transaction_id = %transaction_id,
            lines = line_ids.len(),
            products = inventory.len(),
            "Transaction committed"
        );

        Ok(CommitReceipt {
            transaction_id,
            line_ids,
            inventory,
        })
    }

    /// Applies stock adjustments for lines that are already stored.
    ///
    /// Stops at the first failure and returns [`SessionError::StockPending`]
    /// with that adjustment and every one after it.
    pub async fn settle(
        &self,
        transaction_id: &str,
        line_ids: &[String],
        adjustments: &[StockAdjustment],
    ) -> SessionResult<Vec<InventoryRecord>> {
        let mut inventory = Vec::with_capacity(adjustments.len());
        for (index, adjustment) in adjustments.iter().enumerate() {
            match self.apply(adjustment).await {
                Ok(record) => inventory.push(record),
                Err(e) => {
                    error!(
                        transaction_id = %transaction_id,
                        product_id = %adjustment.product_id,
                        error = %e,
                        "Lines stored but stock adjustment failed"
                    );
                    return Err(SessionError::StockPending {
                        transaction_id: transaction_id.to_string(),
                        line_ids: line_ids.to_vec(),
                        pending: adjustments[index..].to_vec(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(inventory)
    }

    /// Edits a committed line and moves stock by the quantity delta only.
    ///
    /// Codes added by the edit are checked against the ledger first.
    pub async fn edit_line(&self, id: &str, edit: &LineEdit) -> SessionResult<CommittedLine> {
        let original = self.load_line(id).await?;

        let added: Vec<String> = edit
            .unit_codes
            .iter()
            .filter(|c| !c.trim().is_empty())
            .filter(|c| !original.unit_codes.iter().any(|o| codes::same_code(o, c)))
            .cloned()
            .collect();
        self.reject_sold(&added).await?;

        let record = self.ensure_record(&original.product_id).await?;
        let adjustment = stock::plan_edit(&original, edit, record.available_qty)?;

        let updated = self.store.update_committed_line(id, edit).await?;
        if !adjustment.is_noop() {
            self.apply(&adjustment).await?;
        }

        info!(
            line_id = %id,
            from = original.quantity,
            to = updated.quantity,
            "Committed line edited"
        );
        Ok(updated)
    }

    /// Deletes a committed line and restores its quantity to stock.
    pub async fn delete_line(&self, id: &str) -> SessionResult<CommittedLine> {
        let original = self.load_line(id).await?;
        let adjustment = stock::plan_delete(&original);

        self.store.delete_committed_line(id).await?;
        self.apply(&adjustment).await?;

        info!(line_id = %id, restored = original.quantity, "Committed line deleted");
        Ok(original)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_line(&self, id: &str) -> SessionResult<CommittedLine> {
        self.store
            .get_committed_line(id)
            .await?
            .ok_or_else(|| SessionError::NotFound {
                entity: "Committed line".into(),
                id: id.to_string(),
            })
    }

    async fn reject_sold(&self, candidates: &[String]) -> SessionResult<()> {
        if candidates.is_empty() {
            return Ok(());
        }

        let sold: HashSet<String> = self
            .store
            .codes_sold_among(&self.store_id, candidates)
            .await?;
        if sold.is_empty() {
            return Ok(());
        }

        let mut codes: Vec<String> = sold.into_iter().collect();
        codes.sort();
        warn!(codes = ?codes, "Commit blocked: units sold meanwhile");
        Err(SessionError::CodesAlreadySold { codes })
    }

    /// Reads the pair's record, creating it from the product's stocked
    /// quantity the first time the pair is seen.
    async fn ensure_record(&self, product_id: &str) -> SessionResult<InventoryRecord> {
        if let Some(record) = self.store.get_inventory(product_id, &self.store_id).await? {
            return Ok(record);
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| SessionError::NotFound {
                entity: "Product".into(),
                id: product_id.to_string(),
            })?;

        let mut seed = InventoryRecord::seeded_from(&product);
        seed.store_id = self.store_id.clone();
        if self.store.insert_inventory_if_absent(&seed).await? {
            info!(
                product_id = %product_id,
                available = seed.available_qty,
                "Inventory record created"
            );
        }

        // Another terminal may have created it first.
        self.store
            .get_inventory(product_id, &self.store_id)
            .await?
            .ok_or_else(|| SessionError::NotFound {
                entity: "Inventory".into(),
                id: format!("{product_id}@{}", self.store_id),
            })
    }

    /// Compare-and-set loop for one adjustment.
    async fn apply(&self, adjustment: &StockAdjustment) -> SessionResult<InventoryRecord> {
        let mut record = self.ensure_record(&adjustment.product_id).await?;
        let attempts = self.cas_max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let next = adjustment.apply_to(&record);
            if next.available_qty < 0 {
                warn!(
                    product_id = %adjustment.product_id,
                    available = next.available_qty,
                    "Stock counter going negative"
                );
            }

            let written = self
                .store
                .compare_and_set_available_qty(
                    &adjustment.product_id,
                    &self.store_id,
                    record.available_qty,
                    next.available_qty,
                    adjustment.sold_delta,
                )
                .await?;
            if written {
                return Ok(next);
            }

            warn!(
                product_id = %adjustment.product_id,
                attempt,
                expected = record.available_qty,
                "Stock changed concurrently; re-reading"
            );
            record = self.ensure_record(&adjustment.product_id).await?;
        }

        Err(SessionError::StockConflict {
            product: adjustment.product_name.clone(),
            attempts,
        })
    }
}
