//! # Quantity Synchronizer
//!
//! Keeps a line's quantity equal to its number of assigned codes until the
//! operator takes over.
//!
//! ```text
//!                 quantity_manually_set = false
//!   codes ["A1","A2",""] ───────── sync ─────────► quantity = 2
//!   codes [""]           ───────── sync ─────────► quantity = 1   (floor)
//!
//!   set_manual_quantity(5) ──► quantity = 5, manually set
//!   scans / removals        ──► quantity stays 5
//!   clear_override          ──► back to code count
//! ```

use crate::draft::DraftLine;
use crate::error::{CoreError, CoreResult};
use crate::MAX_LINE_QUANTITY;

/// Quantity implied by the codes: the non-empty count, floored at 1.
pub fn derived_quantity(line: &DraftLine) -> i64 {
    (line.filled_count() as i64).max(1)
}

/// Recomputes the quantity unless the operator has overridden it.
pub fn sync(mut line: DraftLine) -> DraftLine {
    if !line.quantity_manually_set {
        line.quantity = derived_quantity(&line);
    }
    line
}

/// The operator typed a quantity; scans stop recomputing it.
pub fn set_manual_quantity(mut line: DraftLine, quantity: i64) -> CoreResult<DraftLine> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_LINE_QUANTITY,
        });
    }
    crate::validation::validate_quantity(quantity)?;

    line.quantity = quantity;
    line.quantity_manually_set = true;
    Ok(line)
}

/// Drops the manual override and resyncs from the codes.
pub fn clear_override(mut line: DraftLine) -> DraftLine {
    line.quantity_manually_set = false;
    sync(line)
}
