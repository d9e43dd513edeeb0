//! # Domain Types
//!
//! Core domain types used throughout Stockscan.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ InventoryRecord │   │  CommittedLine  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  product_id  ┐  │   │  id             │       │
//! │  │  name           │   │  store_id    ┘PK│   │  kind           │       │
//! │  │  unit_codes[]   │   │  available_qty  │   │  quantity       │       │
//! │  │  unit_tags[]    │   │  quantity_sold  │   │  unit_codes[]   │       │
//! │  │  price_cents    │   └─────────────────┘   │  settlement     │       │
//! │  │  stocked_qty    │                         └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ScanEvent     │   │   LedgerKind    │   │SettlementStatus │       │
//! │  │  code           │   │  Sale           │   │  Paid           │       │
//! │  │  source         │   │  Debt           │   │  Partial        │       │
//! │  └─────────────────┘   └─────────────────┘   │  Unpaid         │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unit code and tag lists are ordered `Vec<String>`s in memory. They only
//! become delimited strings at the persistence boundary (see [`crate::codes`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::codes;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product whose physical units are individually identified.
///
/// ## Invariants
/// - `unit_codes.len() == unit_tags.len()`
/// - codes are unique case-insensitively within the product
/// - at save time, codes are unique across all of the store's products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4). Empty while a new product is being created.
    pub id: String,

    /// Store this product belongs to.
    pub store_id: String,

    /// Display name. Assumed unique per store.
    pub name: String,

    /// Ordered unit codes (serial/IMEI-like).
    pub unit_codes: Vec<String>,

    /// Size/variant tag per unit code; empty string when untagged.
    pub unit_tags: Vec<String>,

    /// Unit selling price in cents.
    pub price_cents: i64,

    /// Manually-set stocked quantity, used to seed the inventory record.
    pub stocked_qty: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with no unit codes.
    pub fn new(
        id: impl Into<String>,
        store_id: impl Into<String>,
        name: impl Into<String>,
        price_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: id.into(),
            store_id: store_id.into(),
            name: name.into(),
            unit_codes: Vec::new(),
            unit_tags: Vec::new(),
            price_cents,
            stocked_qty: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the unit lists, padding or cutting tags to match the codes.
    pub fn with_units(mut self, codes: Vec<String>, mut tags: Vec<String>) -> Self {
        tags.resize(codes.len(), String::new());
        self.unit_codes = codes;
        self.unit_tags = tags;
        self
    }

    /// Sets the manually-stocked quantity.
    pub fn with_stocked_qty(mut self, qty: i64) -> Self {
        self.stocked_qty = qty;
        self
    }

    /// Returns the position of a code in this product's list (case-insensitive).
    pub fn unit_index(&self, code: &str) -> Option<usize> {
        self.unit_codes.iter().position(|c| codes::same_code(c, code))
    }

    /// Returns true if this product owns the code.
    pub fn owns(&self, code: &str) -> bool {
        self.unit_index(code).is_some()
    }

    /// Returns the tag stored alongside the unit at `index`.
    pub fn tag_at(&self, index: usize) -> &str {
        self.unit_tags.get(index).map(String::as_str).unwrap_or("")
    }

    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the reference a draft line binds to.
    pub fn to_ref(&self) -> ProductRef {
        ProductRef {
            id: self.id.clone(),
            name: self.name.clone(),
            unit_price_cents: self.price_cents,
        }
    }
}

// =============================================================================
// Product Reference
// =============================================================================

/// What a draft line knows about the product it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: String,
    pub name: String,
    /// Catalog price at binding time; the line may override it.
    pub unit_price_cents: i64,
}

impl ProductRef {
    /// Product identity used when deciding whether two lines target the same product.
    ///
    /// Lines bound to a persisted product compare by id. A product without an
    /// id yet (created in the same session) falls back to its name.
    pub fn same_product(&self, other: &ProductRef) -> bool {
        if !self.id.is_empty() && !other.id.is_empty() {
            return self.id == other.id;
        }
        self.name.trim().eq_ignore_ascii_case(other.name.trim())
    }
}

// =============================================================================
// Inventory Record
// =============================================================================

/// Aggregate stock counters for one (product, store) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub product_id: String,
    pub store_id: String,
    /// Units currently available. Intended to stay >= 0.
    pub available_qty: i64,
    /// Units ever sold. Never decreases.
    pub quantity_sold: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// First record for a pair, seeded from the product's stocked quantity.
    pub fn seeded_from(product: &Product) -> Self {
        InventoryRecord {
            product_id: product.id.clone(),
            store_id: product.store_id.clone(),
            available_qty: product.stocked_qty.max(0),
            quantity_sold: 0,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Ledger Kind
// =============================================================================

/// Which screen a transaction belongs to.
///
/// Both kinds take units off the shelf and move stock the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Sale entry.
    #[default]
    Sale,
    /// Unpaid supplies / debt entry.
    Debt,
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKind::Sale => write!(f, "sale"),
            LedgerKind::Debt => write!(f, "debt"),
        }
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// How much of a committed line has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    #[default]
    Paid,
    Partial,
    Unpaid,
}

impl SettlementStatus {
    /// Derives the status from what was paid against what is owed.
    pub fn from_amounts(amount_paid_cents: i64, amount_cents: i64) -> Self {
        if amount_paid_cents >= amount_cents {
            SettlementStatus::Paid
        } else if amount_paid_cents > 0 {
            SettlementStatus::Partial
        } else {
            SettlementStatus::Unpaid
        }
    }
}

/// Payment method recorded on a committed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// Payment/settlement metadata captured for a transaction at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    /// Customer (sale) or supplier/debtor (debt) name.
    pub counterparty: Option<String>,
    pub method: Option<PaymentMethod>,
    /// Total paid for the whole transaction; `None` means paid in full.
    pub amount_paid_cents: Option<i64>,
}

// =============================================================================
// Committed Line
// =============================================================================

/// A persisted sale or debt line.
///
/// ## Lifecycle
/// - created on commit (stock decremented by `quantity`)
/// - mutated in place on edit (stock moved by the quantity delta)
/// - removed on delete (stock restored by `quantity`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommittedLine {
    pub id: String,
    /// Groups the lines committed together.
    pub transaction_id: String,
    pub store_id: String,
    pub kind: LedgerKind,
    pub product_id: String,
    /// Product name at time of commit (frozen).
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`.
    pub amount_cents: i64,
    pub unit_codes: Vec<String>,
    pub unit_tags: Vec<String>,
    pub counterparty: Option<String>,
    pub settlement: SettlementStatus,
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CommittedLine {
    /// Returns the line amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// The editable fields of a committed line.
///
/// Product and kind are fixed once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineEdit {
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_codes: Vec<String>,
    pub unit_tags: Vec<String>,
    pub counterparty: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid_cents: i64,
}

impl LineEdit {
    /// Starts an edit from the line's current values.
    pub fn from_line(line: &CommittedLine) -> Self {
        LineEdit {
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            unit_codes: line.unit_codes.clone(),
            unit_tags: line.unit_tags.clone(),
            counterparty: line.counterparty.clone(),
            payment_method: line.payment_method,
            amount_paid_cents: line.amount_paid_cents,
        }
    }

    /// Replaces the unit codes and resyncs quantity from their count.
    pub fn with_codes(mut self, codes: Vec<String>, mut tags: Vec<String>) -> Self {
        tags.resize(codes.len(), String::new());
        let filled = codes.iter().filter(|c| !c.trim().is_empty()).count() as i64;
        self.quantity = filled.max(1);
        self.unit_codes = codes;
        self.unit_tags = tags;
        self
    }

    /// Sets an explicit quantity.
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Line amount implied by this edit.
    pub fn amount_cents(&self) -> i64 {
        Money::from_cents(self.unit_price_cents)
            .multiply_quantity(self.quantity)
            .cents()
    }
}

// =============================================================================
// Scan Event
// =============================================================================

/// Which input channel produced a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// Camera frame decoder.
    Camera,
    /// Keyboard-wedge hardware scanner (keystroke burst + Enter).
    ExternalScanner,
    /// Operator typed the code and submitted it.
    Manual,
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::Camera => write!(f, "camera"),
            ScanSource::ExternalScanner => write!(f, "external"),
            ScanSource::Manual => write!(f, "manual"),
        }
    }
}

/// One scanned code, channel-independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    /// Raw code as delivered by the channel (not yet trimmed).
    pub code: String,
    pub source: ScanSource,
}

impl ScanEvent {
    pub fn new(code: impl Into<String>, source: ScanSource) -> Self {
        ScanEvent {
            code: code.into(),
            source,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_units_pads_tags() {
        let product = Product::new("p1", "s1", "Phone X", 100)
            .with_units(vec!["A1".into(), "A2".into()], vec!["128GB".into()]);
        assert_eq!(product.unit_tags, vec!["128GB", ""]);
    }

    #[test]
    fn test_unit_lookup_is_case_insensitive() {
        let product = Product::new("p1", "s1", "Phone X", 100)
            .with_units(vec!["imei-a".into(), "IMEI-B".into()], vec!["x".into(), "y".into()]);
        assert_eq!(product.unit_index("IMEI-A"), Some(0));
        assert_eq!(product.tag_at(1), "y");
        assert!(!product.owns("imei-c"));
    }

    #[test]
    fn test_same_product_prefers_id() {
        let a = ProductRef {
            id: "p1".into(),
            name: "Phone".into(),
            unit_price_cents: 1,
        };
        let renamed = ProductRef {
            id: "p1".into(),
            name: "Phone (old name)".into(),
            unit_price_cents: 1,
        };
        let twin_name = ProductRef {
            id: "p2".into(),
            name: "Phone".into(),
            unit_price_cents: 1,
        };
        assert!(a.same_product(&renamed));
        assert!(!a.same_product(&twin_name));

        let unsaved = ProductRef {
            id: String::new(),
            name: "phone".into(),
            unit_price_cents: 1,
        };
        assert!(a.same_product(&unsaved));
    }

    #[test]
    fn test_settlement_from_amounts() {
        assert_eq!(SettlementStatus::from_amounts(100, 100), SettlementStatus::Paid);
        assert_eq!(SettlementStatus::from_amounts(40, 100), SettlementStatus::Partial);
        assert_eq!(SettlementStatus::from_amounts(0, 100), SettlementStatus::Unpaid);
    }

    #[test]
    fn test_line_edit_with_codes_resyncs_quantity() {
        let edit = LineEdit {
            quantity: 7,
            unit_price_cents: 250,
            unit_codes: vec![],
            unit_tags: vec![],
            counterparty: None,
            payment_method: None,
            amount_paid_cents: 0,
        }
        .with_codes(vec!["A1".into(), "A2".into(), "".into()], vec![]);

        assert_eq!(edit.quantity, 2);
        assert_eq!(edit.unit_tags.len(), 3);
        assert_eq!(edit.amount_cents(), 500);
    }

    #[test]
    fn test_inventory_seed_never_negative() {
        let product = Product::new("p1", "s1", "Phone X", 100).with_stocked_qty(-3);
        assert_eq!(InventoryRecord::seeded_from(&product).available_qty, 0);
    }
}
