//! # Sold-Unit Cache
//!
//! Point-in-time snapshot of which codes already sit on the committed ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  refresh([A1, A2, A3])                                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  store.codes_sold_among ──► {A2}                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  sold = {a2}     (A1, A3 forgotten if they were cached as sold)         │
//! │                                                                         │
//! │  store unreachable?  → stale = true, snapshot kept, warning returned    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger is the source of truth. A stale cache never blocks scanning;
//! the commit re-checks sold codes against the store anyway.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use stockscan_core::codes;
use stockscan_core::resolver::SoldCodes;
use tracing::{debug, warn};

use crate::error::SessionResult;
use crate::store::LedgerStore;

/// Sold codes of one store, keyed case-insensitively.
#[derive(Debug, Clone)]
pub struct SoldUnitCache {
    store_id: String,
    sold: HashSet<String>,
    stale: bool,
    refreshed_at: Option<DateTime<Utc>>,
}

impl SoldUnitCache {
    pub fn new(store_id: impl Into<String>) -> Self {
        SoldUnitCache {
            store_id: store_id.into(),
            sold: HashSet::new(),
            stale: false,
            refreshed_at: None,
        }
    }

    /// Re-queries the ledger for `candidates` and updates their entries.
    ///
    /// Returns how many of them are sold. On failure the cache is marked
    /// stale, keeps its previous snapshot and the error is returned for the
    /// caller to surface as a warning.
    pub async fn refresh<S>(&mut self, store: &S, candidates: &[String]) -> SessionResult<usize>
    where
        S: LedgerStore,
    {
        let wanted: Vec<String> = candidates
            .iter()
            .map(|c| codes::normalize(c))
            .filter(|c| !c.is_empty())
            .collect();
        if wanted.is_empty() {
            return Ok(0);
        }

        let found = match store.codes_sold_among(&self.store_id, &wanted).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    store_id = %self.store_id,
                    error = %e,
                    "Sold-unit lookup failed; cache is stale"
                );
                self.stale = true;
                return Err(e);
            }
        };

        let found: HashSet<String> = found.iter().map(|c| codes::code_key(c)).collect();
        for code in &wanted {
            let key = codes::code_key(code);
            if found.contains(&key) {
                self.sold.insert(key);
            } else {
                self.sold.remove(&key);
            }
        }

        self.stale = false;
        self.refreshed_at = Some(Utc::now());
        debug!(queried = wanted.len(), sold = found.len(), "Sold-unit cache refreshed");
        Ok(found.len())
    }

    /// Returns the codes of `codes` that are still sellable.
    ///
    /// `product_id` only scopes the log line; the ledger lookup is store-wide.
    pub async fn check_sold<S>(
        &mut self,
        store: &S,
        codes: &[String],
        product_id: &str,
    ) -> SessionResult<Vec<String>>
    where
        S: LedgerStore,
    {
        self.refresh(store, codes).await?;

        let available: Vec<String> = codes
            .iter()
            .filter(|c| !c.trim().is_empty() && !self.is_sold(c))
            .cloned()
            .collect();

        debug!(
            product_id = %product_id,
            total = codes.len(),
            available = available.len(),
            "Checked sold units"
        );
        Ok(available)
    }

    /// True if the snapshot has `code` as sold.
    pub fn is_sold(&self, code: &str) -> bool {
        self.sold.contains(&codes::code_key(code))
    }

    /// True after a failed refresh, until the next successful one.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn len(&self) -> usize {
        self.sold.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sold.is_empty()
    }

    /// Forgets every entry.
    pub fn clear(&mut self) {
        self.sold.clear();
        self.refreshed_at = None;
    }
}

impl SoldCodes for SoldUnitCache {
    fn is_sold(&self, code: &str) -> bool {
        SoldUnitCache::is_sold(self, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use stockscan_core::draft::DraftTransaction;
    use stockscan_core::{LedgerKind, Product};

    fn product() -> Product {
        Product::new("p1", "s1", "Phone X", 100)
            .with_units(
                vec!["A1".into(), "A2".into(), "A3".into()],
                vec!["".into(), "".into(), "".into()],
            )
            .with_stocked_qty(3)
    }

    async fn store_with_sold(code: &str) -> InMemoryStore {
        let store = InMemoryStore::with_products(vec![product()]);
        let draft = DraftTransaction::new(LedgerKind::Debt)
            .bind_product(0, product().to_ref())
            .unwrap()
            .set_code(0, 0, code)
            .unwrap();
        let lines = draft.to_committed_lines("s1", "tx-1").unwrap();
        store.insert_committed_lines(&lines).await.unwrap();
        store
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_check_sold_returns_available() {
        let store = store_with_sold("A2").await;
        let mut cache = SoldUnitCache::new("s1");

        let available = cache
            .check_sold(&store, &codes(&["A1", "A2", "A3"]), "p1")
            .await
            .unwrap();

        assert_eq!(available, vec!["A1", "A3"]);
        assert!(cache.is_sold("a2"));
        assert!(!cache.is_sold("A1"));
        assert!(cache.refreshed_at().is_some());
    }

    #[tokio::test]
    async fn test_failure_marks_stale_and_keeps_snapshot() {
        let store = store_with_sold("A2").await;
        let mut cache = SoldUnitCache::new("s1");
        cache.refresh(&store, &codes(&["A2"])).await.unwrap();

        store.set_offline(true).await;
        assert!(cache.refresh(&store, &codes(&["A1"])).await.is_err());
        assert!(cache.is_stale());
        assert!(cache.is_sold("A2"));

        store.set_offline(false).await;
        cache.refresh(&store, &codes(&["A1"])).await.unwrap();
        assert!(!cache.is_stale());
    }

    #[tokio::test]
    async fn test_other_store_sales_ignored() {
        let store = store_with_sold("A2").await;
        let mut cache = SoldUnitCache::new("s2");
        assert_eq!(cache.refresh(&store, &codes(&["A2"])).await.unwrap(), 0);
        assert!(cache.is_empty());
    }
}
