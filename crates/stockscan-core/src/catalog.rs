//! # Catalog Code Editor
//!
//! Scanning units into a product while it is being edited. Unlike sales, a
//! scanned code here does not have to exist yet: it is appended to the
//! product being edited.
//!
//! ```text
//! scan ──► blank?                        → Empty
//!      ──► already on this product?      → DuplicateInTransaction
//!      ──► owned by another product?     → OwnedByOtherProduct
//!      ──► sold (when checked)?          → AlreadySold
//!      ──► append with empty tag
//! ```

use crate::codes;
use crate::error::{CoreError, CoreResult, ScanRejection, ValidationError};
use crate::resolver::{find_owner, SoldCodes};
use crate::types::{Product, ScanEvent};
use crate::validation;

/// Working copy of a product whose unit list is being edited.
#[derive(Debug, Clone)]
pub struct CatalogEditor {
    product: Product,
    reject_sold: bool,
}

impl CatalogEditor {
    /// Starts editing `product`. Sold codes are accepted by default, since a
    /// returned unit may be restocked.
    pub fn new(mut product: Product) -> Self {
        product.unit_tags.resize(product.unit_codes.len(), String::new());
        CatalogEditor {
            product,
            reject_sold: false,
        }
    }

    /// Refuses codes already on the committed ledger.
    pub fn rejecting_sold(mut self) -> Self {
        self.reject_sold = true;
        self
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Adds a scanned code to the product.
    ///
    /// `store_products` is the rest of the store's catalog; the product being
    /// edited may appear in it and is skipped.
    ///
    /// ## Returns
    /// The index the code was stored at.
    pub fn apply_scan<S>(
        &mut self,
        scan: &ScanEvent,
        store_products: &[Product],
        sold: &S,
    ) -> Result<usize, ScanRejection>
    where
        S: SoldCodes + ?Sized,
    {
        let code = codes::normalize(&scan.code);
        if code.is_empty() {
            return Err(ScanRejection::Empty);
        }

        if self.product.owns(&code) {
            return Err(ScanRejection::DuplicateInTransaction { code });
        }

        let others: Vec<Product> = store_products
            .iter()
            .filter(|p| !self.is_self(p))
            .cloned()
            .collect();
        if let Some((owner, _)) = find_owner(&others, &code) {
            return Err(ScanRejection::OwnedByOtherProduct {
                code,
                owner: owner.name.clone(),
            });
        }

        if self.reject_sold && sold.is_sold(&code) {
            return Err(ScanRejection::AlreadySold { code });
        }

        if validation::validate_unit_code(&code).is_err() {
            return Err(ScanRejection::Malformed { code });
        }

        self.product.unit_codes.push(code);
        self.product.unit_tags.push(String::new());
        Ok(self.product.unit_codes.len() - 1)
    }

    /// Sets the variant tag of the unit at `index`.
    pub fn set_tag(&mut self, index: usize, tag: &str) -> CoreResult<()> {
        self.check_index(index)?;
        validation::validate_unit_tag(tag)?;
        self.product.unit_tags[index] = tag.trim().to_string();
        Ok(())
    }

    /// Removes the unit at `index` and returns its code.
    pub fn remove_code(&mut self, index: usize) -> CoreResult<String> {
        self.check_index(index)?;
        self.product.unit_tags.remove(index);
        Ok(self.product.unit_codes.remove(index))
    }

    /// Validates the edited product and hands it back for saving.
    ///
    /// ## Errors
    /// - any [`ValidationError`] from [`validation::validate_product`]
    /// - [`ValidationError::Duplicate`] when another store product owns one of the codes
    pub fn finish(mut self, store_products: &[Product]) -> CoreResult<Product> {
        validation::validate_product(&self.product)?;

        if let Some((code, _owner)) =
            validation::find_store_conflict(&self.product, store_products)
        {
            return Err(CoreError::Validation(ValidationError::Duplicate {
                field: "unit code".to_string(),
                value: code,
            }));
        }

        self.product.updated_at = chrono::Utc::now();
        Ok(self.product)
    }

    fn is_self(&self, other: &Product) -> bool {
        if self.product.id.is_empty() {
            return false;
        }
        other.id == self.product.id
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.product.unit_codes.len() {
            return Err(CoreError::SlotOutOfRange {
                line: 0,
                slot: index,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NoneSold;
    use crate::types::ScanSource;
    use std::collections::HashSet;

    fn store() -> Vec<Product> {
        vec![
            Product::new("p1", "s1", "Phone X", 1000)
                .with_units(vec!["A1".into()], vec!["".into()]),
            Product::new("p2", "s1", "Phone Y", 1000)
                .with_units(vec!["B1".into()], vec!["".into()]),
        ]
    }

    fn scan(code: &str) -> ScanEvent {
        ScanEvent::new(code, ScanSource::Camera)
    }

    #[test]
    fn test_scan_appends_code_with_empty_tag() {
        let mut editor = CatalogEditor::new(store()[0].clone());
        let index = editor.apply_scan(&scan(" A2 "), &store(), &NoneSold).unwrap();

        assert_eq!(index, 1);
        assert_eq!(editor.product().unit_codes, vec!["A1", "A2"]);
        assert_eq!(editor.product().unit_tags, vec!["", ""]);
    }

    #[test]
    fn test_rejections() {
        let mut editor = CatalogEditor::new(store()[0].clone());

        assert_eq!(
            editor.apply_scan(&scan(""), &store(), &NoneSold),
            Err(ScanRejection::Empty)
        );
        assert_eq!(
            editor.apply_scan(&scan("a1"), &store(), &NoneSold),
            Err(ScanRejection::DuplicateInTransaction { code: "a1".into() })
        );
        assert_eq!(
            editor.apply_scan(&scan("B1"), &store(), &NoneSold),
            Err(ScanRejection::OwnedByOtherProduct {
                code: "B1".into(),
                owner: "Phone Y".into()
            })
        );
        assert_eq!(editor.product().unit_codes.len(), 1);
    }

    #[test]
    fn test_sold_check_is_opt_in() {
        let sold: HashSet<String> = ["C1".to_string()].into();

        let mut lenient = CatalogEditor::new(store()[0].clone());
        assert!(lenient.apply_scan(&scan("C1"), &store(), &sold).is_ok());

        let mut strict = CatalogEditor::new(store()[0].clone()).rejecting_sold();
        assert_eq!(
            strict.apply_scan(&scan("C1"), &store(), &sold),
            Err(ScanRejection::AlreadySold { code: "C1".into() })
        );
    }

    #[test]
    fn test_tag_and_remove() {
        let mut editor = CatalogEditor::new(store()[0].clone());
        editor.apply_scan(&scan("A2"), &store(), &NoneSold).unwrap();
        editor.set_tag(1, "256GB").unwrap();
        assert_eq!(editor.product().unit_tags, vec!["", "256GB"]);

        assert_eq!(editor.remove_code(0).unwrap(), "A1");
        assert_eq!(editor.product().unit_codes, vec!["A2"]);
        assert_eq!(editor.product().unit_tags, vec!["256GB"]);
        assert!(editor.remove_code(4).is_err());
    }

    #[test]
    fn test_finish_checks_store_uniqueness() {
        let mut clashing = store()[0].clone();
        clashing.unit_codes.push("b1".into());
        clashing.unit_tags.push(String::new());

        let editor = CatalogEditor::new(clashing);
        assert!(matches!(
            editor.finish(&store()),
            Err(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        let editor = CatalogEditor::new(store()[0].clone());
        assert!(editor.finish(&store()).is_ok());
    }

    #[test]
    fn test_new_product_without_id() {
        let mut editor = CatalogEditor::new(Product::new("", "s1", "Phone Z", 500));
        assert!(editor.apply_scan(&scan("Z1"), &store(), &NoneSold).is_ok());
        let saved = editor.finish(&store()).unwrap();
        assert_eq!(saved.unit_codes, vec!["Z1"]);
    }
}
