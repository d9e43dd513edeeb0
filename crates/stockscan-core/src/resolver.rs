//! # Code Resolver
//!
//! Decides what a single scan does to the draft transaction.
//!
//! ## Decision Order
//! ```text
//! ScanEvent { code }
//!      │
//!      ├─ 1. trim → blank?                        → Rejected(Empty)
//!      ├─ 2. sold-unit cache says sold?           → Rejected(AlreadySold)
//!      ├─ 3. no product owns the code?            → Rejected(NotFound)
//!      ├─ 4. code already on any draft line?      → Rejected(DuplicateInTransaction)
//!      │
//!      │  product P owns the code
//!      ├─ a. a line already targets P             → AssignToExistingLine
//!      │     (other lines for P are merged in)
//!      ├─ b. the cursor line is empty and unbound → AssignToCurrentLine
//!      └─ c. otherwise                            → CreateNewLine
//! ```
//!
//! The resolver is read-only: it never touches the draft. The returned
//! [`Resolution`] is applied with [`DraftTransaction::apply_resolution`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::codes;
use crate::draft::DraftTransaction;
use crate::error::ScanRejection;
use crate::types::{Product, ProductRef, ScanEvent};

// =============================================================================
// Sold Codes
// =============================================================================

/// Read access to the set of codes already on the committed ledger.
pub trait SoldCodes {
    /// Returns true if the code is known to be sold (case-insensitive).
    fn is_sold(&self, code: &str) -> bool;
}

impl SoldCodes for HashSet<String> {
    fn is_sold(&self, code: &str) -> bool {
        self.contains(code) || self.iter().any(|sold| codes::same_code(sold, code))
    }
}

impl<T: SoldCodes + ?Sized> SoldCodes for &T {
    fn is_sold(&self, code: &str) -> bool {
        (**self).is_sold(code)
    }
}

/// Nothing is sold. Used where no ledger check applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneSold;

impl SoldCodes for NoneSold {
    fn is_sold(&self, _code: &str) -> bool {
        false
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Where an accepted scan goes.
///
/// `code` is the product's own spelling of the unit code and `tag` the
/// variant tag stored next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// Bind the (empty) cursor line to the product and seed it with the code.
    AssignToCurrentLine {
        product: ProductRef,
        code: String,
        tag: String,
    },
    /// Append to the line already targeting the product, after folding the
    /// `merge` lines (same product) into it.
    AssignToExistingLine {
        line: usize,
        merge: Vec<usize>,
        product: ProductRef,
        code: String,
        tag: String,
    },
    /// Start a new line bound to the product.
    CreateNewLine {
        product: ProductRef,
        code: String,
        tag: String,
    },
}

impl Resolution {
    /// The product the code resolved to.
    pub fn product(&self) -> &ProductRef {
        match self {
            Resolution::AssignToCurrentLine { product, .. }
            | Resolution::AssignToExistingLine { product, .. }
            | Resolution::CreateNewLine { product, .. } => product,
        }
    }

    /// The accepted code.
    pub fn code(&self) -> &str {
        match self {
            Resolution::AssignToCurrentLine { code, .. }
            | Resolution::AssignToExistingLine { code, .. }
            | Resolution::CreateNewLine { code, .. } => code,
        }
    }
}

// =============================================================================
// Resolve
// =============================================================================

/// Finds the product owning `code` and the code's position in it.
pub fn find_owner<'a>(catalog: &'a [Product], code: &str) -> Option<(&'a Product, usize)> {
    catalog
        .iter()
        .find_map(|product| product.unit_index(code).map(|index| (product, index)))
}

/// Resolves one scan against the draft, the catalog and the sold set.
///
/// ## Example
/// ```rust
/// use std::collections::HashSet;
/// use stockscan_core::draft::DraftTransaction;
/// use stockscan_core::resolver::{resolve, Resolution};
/// use stockscan_core::{LedgerKind, Product, ScanEvent, ScanRejection, ScanSource};
///
/// let catalog = vec![Product::new("p1", "s1", "Phone X", 100)
///     .with_units(vec!["A1".into()], vec!["".into()])];
/// let draft = DraftTransaction::new(LedgerKind::Sale);
///
/// let sold: HashSet<String> = ["a1".to_string()].into();
/// let scan = ScanEvent::new("A1", ScanSource::Camera);
/// assert_eq!(
///     resolve(&scan, &draft, &catalog, &sold),
///     Err(ScanRejection::AlreadySold { code: "A1".into() })
/// );
/// ```
pub fn resolve<S>(
    scan: &ScanEvent,
    draft: &DraftTransaction,
    catalog: &[Product],
    sold: &S,
) -> Result<Resolution, ScanRejection>
where
    S: SoldCodes + ?Sized,
{
    let code = codes::normalize(&scan.code);
    if code.is_empty() {
        return Err(ScanRejection::Empty);
    }

    if sold.is_sold(&code) {
        return Err(ScanRejection::AlreadySold { code });
    }

    let (owner, index) = find_owner(catalog, &code).ok_or_else(|| ScanRejection::NotFound {
        code: code.clone(),
    })?;

    if draft.find_code(&code).is_some() {
        return Err(ScanRejection::DuplicateInTransaction { code });
    }

    let product = owner.to_ref();
    let code = owner.unit_codes[index].clone();
    let tag = owner.tag_at(index).to_string();

    let targeting = draft.lines_for(&product);
    if let Some((&line, rest)) = targeting.split_first() {
        return Ok(Resolution::AssignToExistingLine {
            line,
            merge: rest.to_vec(),
            product,
            code,
            tag,
        });
    }

    if draft.current_line().is_available() {
        return Ok(Resolution::AssignToCurrentLine { product, code, tag });
    }

    Ok(Resolution::CreateNewLine { product, code, tag })
}

/// Checks a code typed by the operator directly into `(line, slot)`.
///
/// Returns the code as it should be stored. A blank entry clears the slot and
/// is always accepted. The code must belong to the line's product when the
/// line is bound.
pub fn resolve_slot_edit<S>(
    raw: &str,
    line: usize,
    slot: usize,
    draft: &DraftTransaction,
    catalog: &[Product],
    sold: &S,
) -> Result<String, ScanRejection>
where
    S: SoldCodes + ?Sized,
{
    let code = codes::normalize(raw);
    if code.is_empty() {
        return Ok(code);
    }

    if sold.is_sold(&code) {
        return Err(ScanRejection::AlreadySold { code });
    }

    let (owner, index) = find_owner(catalog, &code).ok_or_else(|| ScanRejection::NotFound {
        code: code.clone(),
    })?;

    if let Some(bound) = draft.lines().get(line).and_then(|l| l.product.as_ref()) {
        if !bound.same_product(&owner.to_ref()) {
            return Err(ScanRejection::OwnedByOtherProduct {
                code,
                owner: owner.name.clone(),
            });
        }
    }

    match draft.find_code(&code) {
        Some(found) if found != (line, slot) => Err(ScanRejection::DuplicateInTransaction { code }),
        _ => Ok(owner.unit_codes[index].clone()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
