//! # Stock Adjustment Planning
//!
//! Pure arithmetic behind the Stock Ledger Updater: how much each product's
//! `available_qty` and `quantity_sold` must move for a commit, an edit or a
//! delete. The session layer reads the counters, asks this module for a plan
//! and writes the result.
//!
//! ## Counter Movements
//! ```text
//! ┌───────────────┬──────────────────────────────┬─────────────────────────┐
//! │ Operation     │ available_qty                │ quantity_sold           │
//! ├───────────────┼──────────────────────────────┼─────────────────────────┤
//! │ commit        │ -= Σ line.quantity (per P)   │ += Σ line.quantity      │
//! │ edit (Δ > 0)  │ -= Δ   (re-checked first)    │ += Δ                    │
//! │ edit (Δ < 0)  │ += |Δ|                       │ unchanged               │
//! │ delete        │ += line.quantity             │ unchanged               │
//! └───────────────┴──────────────────────────────┴─────────────────────────┘
//! ```
//!
//! ## Transaction Lifecycle
//! ```text
//! Draft ──commit──► Committed ──edit──► Committed ──delete──► Deleted
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{CommittedLine, InventoryRecord, LineEdit};

// =============================================================================
// Stock Adjustment
// =============================================================================

/// A signed change to one product's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: String,
    pub product_name: String,
    /// Added to `available_qty` (negative for a decrement).
    pub available_delta: i64,
    /// Added to `quantity_sold`; never negative.
    pub sold_delta: i64,
}

impl StockAdjustment {
    /// Returns the record after this adjustment.
    pub fn apply_to(&self, record: &InventoryRecord) -> InventoryRecord {
        InventoryRecord {
            available_qty: record.available_qty + self.available_delta,
            quantity_sold: record.quantity_sold + self.sold_delta,
            updated_at: chrono::Utc::now(),
            ..record.clone()
        }
    }

    /// True when the adjustment moves nothing.
    pub fn is_noop(&self) -> bool {
        self.available_delta == 0 && self.sold_delta == 0
    }
}

/// Total committed quantity per product, in first-appearance order.
pub fn demand_by_product(lines: &[CommittedLine]) -> Vec<(String, String, i64)> {
    let mut order: Vec<(String, String, i64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for line in lines {
        match index.get(line.product_id.as_str()) {
            Some(&at) => order[at].2 += line.quantity,
            None => {
                index.insert(line.product_id.as_str(), order.len());
                order.push((line.product_id.clone(), line.product_name.clone(), line.quantity));
            }
        }
    }
    order
}

/// Plans the decrement for a commit.
///
/// `available` maps product id to its current `available_qty`; a missing
/// product counts as zero available. Every product is checked before any
/// adjustment is returned, so a failure means nothing must be written.
///
/// ## Errors
/// [`CoreError::InsufficientStock`] for the first product whose demand exceeds
/// what is available.
pub fn plan_commit(
    lines: &[CommittedLine],
    available: &HashMap<String, i64>,
) -> CoreResult<Vec<StockAdjustment>> {
    let demand = demand_by_product(lines);

    for (product_id, product_name, requested) in &demand {
        let on_hand = available.get(product_id).copied().unwrap_or(0);
        if on_hand < *requested {
            return Err(CoreError::InsufficientStock {
                product: product_name.clone(),
                available: on_hand,
                requested: *requested,
            });
        }
    }

    Ok(demand
        .into_iter()
        .map(|(product_id, product_name, quantity)| StockAdjustment {
            product_id,
            product_name,
            available_delta: -quantity,
            sold_delta: quantity,
        })
        .collect())
}

/// Plans the delta for editing a committed line.
///
/// Only a growing quantity is checked against `available`.
pub fn plan_edit(
    original: &CommittedLine,
    edit: &LineEdit,
    available: i64,
) -> CoreResult<StockAdjustment> {
    crate::validation::validate_quantity(edit.quantity)?;

    let delta = edit.quantity - original.quantity;
    if delta > 0 && available < delta {
        return Err(CoreError::InsufficientStock {
            product: original.product_name.clone(),
            available,
            requested: delta,
        });
    }

    Ok(StockAdjustment {
        product_id: original.product_id.clone(),
        product_name: original.product_name.clone(),
        available_delta: -delta,
        sold_delta: delta.max(0),
    })
}

/// Plans the restore for deleting a committed line.
pub fn plan_delete(original: &CommittedLine) -> StockAdjustment {
    StockAdjustment {
        product_id: original.product_id.clone(),
        product_name: original.product_name.clone(),
        available_delta: original.quantity,
        sold_delta: 0,
    }
}

// =============================================================================
// Transaction State
// =============================================================================

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Lines may be freely restructured.
    #[default]
    Draft,
    /// Persisted; only bounded edits and deletes are allowed.
    Committed,
    /// Removed from the ledger.
    Deleted,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Draft => write!(f, "draft"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::Deleted => write!(f, "deleted"),
        }
    }
}

impl TransactionState {
    /// Draft → Committed.
    pub fn commit(self) -> CoreResult<Self> {
        match self {
            TransactionState::Draft => Ok(TransactionState::Committed),
            other => Err(other.refuse("commit")),
        }
    }

    /// Committed → Committed.
    pub fn edit(self) -> CoreResult<Self> {
        match self {
            TransactionState::Committed => Ok(TransactionState::Committed),
            other => Err(other.refuse("edit")),
        }
    }

    /// Committed → Deleted.
    pub fn delete(self) -> CoreResult<Self> {
        match self {
            TransactionState::Committed => Ok(TransactionState::Deleted),
            other => Err(other.refuse("delete")),
        }
    }

    /// Errors unless lines may still be restructured.
    pub fn ensure_draft(self, operation: &str) -> CoreResult<()> {
        match self {
            TransactionState::Draft => Ok(()),
            other => Err(other.refuse(operation)),
        }
    }

    fn refuse(self, operation: &str) -> CoreError {
        CoreError::InvalidTransition {
            state: self.to_string(),
            operation: operation.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LedgerKind, SettlementStatus};
    use chrono::Utc;

    fn line(product: &str, quantity: i64) -> CommittedLine {
        CommittedLine {
            id: format!("line-{product}-{quantity}"),
            transaction_id: "tx-1".into(),
            store_id: "s1".into(),
            kind: LedgerKind::Sale,
            product_id: product.into(),
            product_name: format!("Product {product}"),
            quantity,
            unit_price_cents: 100,
            amount_cents: 100 * quantity,
            unit_codes: vec![],
            unit_tags: vec![],
            counterparty: None,
            settlement: SettlementStatus::Paid,
            payment_method: None,
            amount_paid_cents: 100 * quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stock(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(id, qty)| (id.to_string(), *qty)).collect()
    }

    #[test]
    fn test_commit_decrements_per_product() {
        let plan = plan_commit(
            &[line("p1", 2), line("p2", 1)],
            &stock(&[("p1", 5), ("p2", 1), ("p3", 9)]),
        )
        .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].product_id.as_str(), plan[0].available_delta), ("p1", -2));
        assert_eq!((plan[1].product_id.as_str(), plan[1].available_delta), ("p2", -1));
        assert!(plan.iter().all(|adj| adj.product_id != "p3"));
    }

    #[test]
    fn test_commit_aggregates_repeated_product() {
        let plan = plan_commit(&[line("p1", 2), line("p1", 3)], &stock(&[("p1", 5)])).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].available_delta, -5);
        assert_eq!(plan[0].sold_delta, 5);
    }

    #[test]
    fn test_commit_fails_whole_on_any_shortage() {
        let err = plan_commit(
            &[line("p1", 1), line("p2", 3)],
            &stock(&[("p1", 5), ("p2", 2)]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product: "Product p2".into(),
                available: 2,
                requested: 3,
            }
        );
    }

    #[test]
    fn test_missing_record_counts_as_empty() {
        assert!(plan_commit(&[line("p1", 1)], &HashMap::new()).is_err());
    }

    #[test]
    fn test_edit_moves_only_the_delta() {
        let original = line("p1", 2);

        let grow = LineEdit::from_line(&original).with_quantity(5);
        let plan = plan_edit(&original, &grow, 3).unwrap();
        assert_eq!(plan.available_delta, -3);
        assert_eq!(plan.sold_delta, 3);

        let shrink_from = line("p1", 5);
        let shrink = LineEdit::from_line(&shrink_from).with_quantity(2);
        let plan = plan_edit(&shrink_from, &shrink, 0).unwrap();
        assert_eq!(plan.available_delta, 3);
        assert_eq!(plan.sold_delta, 0);
    }

    #[test]
    fn test_edit_rechecks_growth() {
        let original = line("p1", 2);
        let grow = LineEdit::from_line(&original).with_quantity(5);
        assert!(matches!(
            plan_edit(&original, &grow, 2),
            Err(CoreError::InsufficientStock { requested: 3, .. })
        ));
    }

    #[test]
    fn test_delete_restores_quantity() {
        let plan = plan_delete(&line("p1", 4));
        assert_eq!(plan.available_delta, 4);
        assert_eq!(plan.sold_delta, 0);
    }

    #[test]
    fn test_apply_to_record() {
        let record = InventoryRecord {
            product_id: "p1".into(),
            store_id: "s1".into(),
            available_qty: 10,
            quantity_sold: 1,
            updated_at: Utc::now(),
        };
        let next = plan_delete(&line("p1", 4)).apply_to(&record);
        assert_eq!(next.available_qty, 14);
        assert_eq!(next.quantity_sold, 1);
    }

    #[test]
    fn test_state_machine() {
        let state = TransactionState::Draft;
        assert!(state.ensure_draft("add a line").is_ok());

        let state = state.commit().unwrap();
        assert!(state.ensure_draft("add a line").is_err());
        assert_eq!(state.edit().unwrap(), TransactionState::Committed);

        let state = state.delete().unwrap();
        assert_eq!(state, TransactionState::Deleted);
        assert_eq!(
            state.edit().unwrap_err(),
            CoreError::InvalidTransition {
                state: "deleted".into(),
                operation: "edit".into(),
            }
        );
        assert!(TransactionState::Committed.commit().is_err());
    }
}
