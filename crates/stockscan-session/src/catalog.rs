//! Catalog mode: scanning unit codes onto a product being edited.
//!
//! Unlike a sale, an unknown code is not an error here; it becomes a new
//! unit of the product. Store-wide uniqueness is checked on every scan against
//! the catalog snapshot and again on save against a fresh read.

use std::sync::Arc;

use stockscan_core::catalog::CatalogEditor;
use stockscan_core::{codes, InventoryRecord, Product, ScanEvent, ScanRejection};
use tracing::{debug, info};

use crate::cache::SoldUnitCache;
use crate::error::{OperatorNotice, SessionResult};
use crate::store::LedgerStore;

/// Outcome of one catalog scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScan {
    /// Index the code was stored at, or why it was refused.
    pub result: Result<usize, ScanRejection>,
    pub warnings: Vec<OperatorNotice>,
}

/// Edits the unit list of one product.
pub struct CatalogSession<S: LedgerStore> {
    store: Arc<S>,
    store_id: String,
    editor: CatalogEditor,
    store_products: Vec<Product>,
    sold: SoldUnitCache,
}

impl<S: LedgerStore> CatalogSession<S> {
    /// Starts editing `product`. With `reject_sold`, codes already on the
    /// ledger are refused (restocking a returned unit is then impossible).
    pub async fn open(
        store: Arc<S>,
        store_id: &str,
        product: Product,
        reject_sold: bool,
    ) -> SessionResult<Self> {
        let store_products = store.list_products(store_id).await?;
        let editor = CatalogEditor::new(product);
        let editor = if reject_sold { editor.rejecting_sold() } else { editor };

        Ok(CatalogSession {
            store,
            store_id: store_id.to_string(),
            editor,
            store_products,
            sold: SoldUnitCache::new(store_id),
        })
    }

    /// The product as edited so far.
    pub fn product(&self) -> &Product {
        self.editor.product()
    }

    /// Adds a scanned code to the product.
    pub async fn scan(&mut self, event: &ScanEvent) -> CatalogScan {
        let mut warnings = Vec::new();
        let code = codes::normalize(&event.code);
        if !code.is_empty() {
            let candidates = std::slice::from_ref(&code);
            if let Err(e) = self.sold.refresh(self.store.as_ref(), candidates).await {
                warnings.push(OperatorNotice::cache_unavailable(e));
            }
        }

        let result = self.editor.apply_scan(event, &self.store_products, &self.sold);
        match &result {
            Ok(index) => debug!(code = %code, index, "Unit code added to product"),
            Err(rejection) => {
                debug!(code = %code, reason = rejection.code(), "Catalog scan rejected")
            }
        }
        CatalogScan { result, warnings }
    }

    pub fn set_tag(&mut self, index: usize, tag: &str) -> SessionResult<()> {
        Ok(self.editor.set_tag(index, tag)?)
    }

    /// Removes the unit at `index` and returns its code.
    pub fn remove_code(&mut self, index: usize) -> SessionResult<String> {
        Ok(self.editor.remove_code(index)?)
    }

    /// Validates and stores the product, creating its inventory record if
    /// this is the first time the store sees it.
    pub async fn save(self) -> SessionResult<Product> {
        let latest = self.store.list_products(&self.store_id).await?;
        let product = self.editor.finish(&latest)?;

        let saved = self.store.save_product(&product).await?;
        let created = self
            .store
            .insert_inventory_if_absent(&InventoryRecord::seeded_from(&saved))
            .await?;

        info!(
            product_id = %saved.id,
            units = saved.unit_codes.len(),
            inventory_created = created,
            "Product saved"
        );
        Ok(saved)
    }
}

impl<S: LedgerStore> std::fmt::Debug for CatalogSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSession")
            .field("store_id", &self.store_id)
            .field("product", self.editor.product())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::memory::InMemoryStore;
    use stockscan_core::{CoreError, ScanSource, ValidationError};

    fn existing() -> Product {
        Product::new("p-y", "s1", "Phone Y", 2_500)
            .with_units(vec!["B1".into()], vec!["".into()])
            .with_stocked_qty(1)
    }

    fn scan(code: &str) -> ScanEvent {
        ScanEvent::new(code, ScanSource::ExternalScanner)
    }

    #[tokio::test]
    async fn test_scan_new_codes_and_save() {
        let store = Arc::new(InMemoryStore::with_products(vec![existing()]));
        let product = Product::new("p-x", "s1", "Phone X", 1_000).with_stocked_qty(2);
        let mut session = CatalogSession::open(Arc::clone(&store), "s1", product, false)
            .await
            .unwrap();

        assert_eq!(session.scan(&scan("A1")).await.result, Ok(0));
        assert_eq!(session.scan(&scan(" A2 ")).await.result, Ok(1));
        assert!(matches!(
            session.scan(&scan("a1")).await.result,
            Err(ScanRejection::DuplicateInTransaction { .. })
        ));
        assert!(matches!(
            session.scan(&scan("B1")).await.result,
            Err(ScanRejection::OwnedByOtherProduct { .. })
        ));

        session.set_tag(1, "128GB").unwrap();
        let saved = session.save().await.unwrap();
        assert_eq!(saved.unit_codes, vec!["A1", "A2"]);
        assert_eq!(saved.unit_tags, vec!["", "128GB"]);

        let record = store.get_inventory("p-x", "s1").await.unwrap().unwrap();
        assert_eq!(record.available_qty, 2);
        assert!(store.find_product_by_code("s1", "a2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_rechecks_store_uniqueness() {
        let store = Arc::new(InMemoryStore::new());
        let product = Product::new("p-x", "s1", "Phone X", 1_000);
        let mut session = CatalogSession::open(Arc::clone(&store), "s1", product, false)
            .await
            .unwrap();
        session.scan(&scan("B1")).await.result.unwrap();

        // Another terminal claims B1 meanwhile.
        store.save_product(&existing()).await.unwrap();

        let err = session.save().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_remove_code() {
        let store = Arc::new(InMemoryStore::new());
        let product = Product::new("p-x", "s1", "Phone X", 1_000)
            .with_units(vec!["A1".into(), "A2".into()], vec!["".into(), "".into()]);
        let mut session = CatalogSession::open(store, "s1", product, false).await.unwrap();

        assert_eq!(session.remove_code(0).unwrap(), "A1");
        assert_eq!(session.product().unit_codes, vec!["A2"]);
        assert!(session.remove_code(5).is_err());
    }
}
