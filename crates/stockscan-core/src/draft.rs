//! # Line Assignment Engine
//!
//! The draft transaction: an ordered list of lines being filled by scans,
//! plus a cursor marking the line an unbound scan writes into.
//!
//! ## Transition Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   DraftTransaction ──(operation)──► Result<DraftTransaction, CoreError>  │
//! │                                                                         │
//! │   Every operation consumes the draft and returns the next one. A       │
//! │   failed operation returns the error and the caller keeps its clone    │
//! │   of the previous state; nothing is mutated in place behind its back.  │
//! │                                                                         │
//! │   Operations:                                                           │
//! │   • add_line / remove_line                                              │
//! │   • add_code_slot / remove_code_slot                                    │
//! │   • apply_resolution   (a) existing line (b) cursor line (c) new line   │
//! │   • set_code / set_tag (operator typing into a slot)                    │
//! │   • bind_product / set_unit_price / update_line                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trailing Slot
//! Every line keeps an empty code slot at the end, so there is always a place
//! for the next scan: `["A1", "A2", ""]`.
//!
//! The engine never talks to storage and never recomputes quantities; callers
//! run [`crate::quantity::sync`] after a structural change.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::codes;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::resolver::Resolution;
use crate::types::{CommittedLine, LedgerKind, ProductRef, Settlement, SettlementStatus};
use crate::validation;

// =============================================================================
// Draft Line
// =============================================================================

/// One line of a draft transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    /// Bound product; `None` until the first scan (or explicit pick) binds it.
    pub product: Option<ProductRef>,

    /// Units on this line.
    pub quantity: i64,

    /// Unit price in cents; taken from the product at binding time.
    pub unit_price_cents: i64,

    /// Assigned unit codes, always ending with one empty slot.
    codes: Vec<String>,

    /// Variant tag per code slot.
    tags: Vec<String>,

    /// The operator typed the quantity; scans no longer recompute it.
    pub quantity_manually_set: bool,
}

impl Default for DraftLine {
    fn default() -> Self {
        DraftLine::empty()
    }
}

impl DraftLine {
    /// An unbound line with a single empty slot.
    pub fn empty() -> Self {
        DraftLine {
            product: None,
            quantity: 1,
            unit_price_cents: 0,
            codes: vec![String::new()],
            tags: vec![String::new()],
            quantity_manually_set: false,
        }
    }

    /// A line bound to `product`, seeded with one code.
    pub fn bound(product: ProductRef, code: String, tag: String) -> Self {
        let mut line = DraftLine::empty();
        line.bind(product);
        line.place_code(code, tag);
        line
    }

    /// Code slots, including the trailing empty one.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Tag slots, parallel to [`DraftLine::codes`].
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Non-empty codes in slot order.
    pub fn filled_codes(&self) -> impl Iterator<Item = &str> {
        self.codes
            .iter()
            .map(String::as_str)
            .filter(|code| !code.trim().is_empty())
    }

    /// Number of non-empty code slots.
    pub fn filled_count(&self) -> usize {
        self.filled_codes().count()
    }

    /// True when the line has neither a product nor any code.
    ///
    /// Only such a line can take an [`Resolution::AssignToCurrentLine`].
    pub fn is_available(&self) -> bool {
        self.product.is_none() && self.filled_count() == 0
    }

    /// Returns the slot holding `code`, compared case-insensitively.
    pub fn slot_of(&self, code: &str) -> Option<usize> {
        self.codes
            .iter()
            .position(|c| !c.trim().is_empty() && codes::same_code(c, code))
    }

    /// `quantity × unit price`.
    pub fn amount(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    fn bind(&mut self, product: ProductRef) {
        self.unit_price_cents = product.unit_price_cents;
        self.product = Some(product);
    }

    /// Writes `code` into the first empty slot, then restores the trailing slot.
    fn place_code(&mut self, code: String, tag: String) {
        match self.codes.iter().position(|c| c.trim().is_empty()) {
            Some(slot) => {
                self.codes[slot] = code;
                self.tags[slot] = tag;
            }
            None => {
                self.codes.push(code);
                self.tags.push(tag);
            }
        }
        self.ensure_trailing_slot();
    }

    fn ensure_trailing_slot(&mut self) {
        self.tags.resize(self.codes.len(), String::new());
        let needs_slot = self
            .codes
            .last()
            .map_or(true, |last| !last.trim().is_empty());
        if needs_slot {
            self.codes.push(String::new());
            self.tags.push(String::new());
        }
    }

    /// Moves every filled slot of `other` into this line, skipping codes it
    /// already holds.
    fn absorb(&mut self, other: DraftLine) {
        if other.quantity_manually_set {
            let own = if self.quantity_manually_set {
                self.quantity
            } else {
                self.filled_count() as i64
            };
            self.quantity = own + other.quantity;
            self.quantity_manually_set = true;
        }

        for (code, tag) in other.codes.into_iter().zip(other.tags) {
            if code.trim().is_empty() || self.slot_of(&code).is_some() {
                continue;
            }
            self.place_code(code, tag);
        }
    }

    fn check_slot(&self, line: usize, slot: usize) -> CoreResult<()> {
        if slot >= self.codes.len() {
            return Err(CoreError::SlotOutOfRange { line, slot });
        }
        Ok(())
    }
}

// =============================================================================
// Draft Transaction
// =============================================================================

/// A sale or debt being assembled from scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftTransaction {
    kind: LedgerKind,
    lines: Vec<DraftLine>,
    cursor: usize,
    settlement: Settlement,
}

impl DraftTransaction {
    /// A draft with one empty line and the cursor on it.
    pub fn new(kind: LedgerKind) -> Self {
        DraftTransaction {
            kind,
            lines: vec![DraftLine::empty()],
            cursor: 0,
            settlement: Settlement::default(),
        }
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    /// Index of the line unbound scans are written into.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    /// The line under the cursor.
    pub fn current_line(&self) -> &DraftLine {
        // The list is never empty and the cursor is kept in range.
        &self.lines[self.cursor.min(self.lines.len() - 1)]
    }

    /// Every assigned code in the transaction, line by line.
    pub fn codes(&self) -> Vec<&str> {
        self.lines.iter().flat_map(DraftLine::filled_codes).collect()
    }

    /// Finds the (line, slot) holding `code`, case-insensitively.
    pub fn find_code(&self, code: &str) -> Option<(usize, usize)> {
        self.lines
            .iter()
            .enumerate()
            .find_map(|(index, line)| line.slot_of(code).map(|slot| (index, slot)))
    }

    /// Indexes of lines bound to the same product as `product`, in order.
    pub fn lines_for(&self, product: &ProductRef) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| {
                line.product
                    .as_ref()
                    .is_some_and(|bound| bound.same_product(product))
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Sum of line amounts.
    pub fn total(&self) -> Money {
        self.lines.iter().map(DraftLine::amount).sum()
    }

    // -------------------------------------------------------------------------
    // Line structure
    // -------------------------------------------------------------------------

    /// Appends an empty line and moves the cursor onto it.
    pub fn add_line(mut self) -> Self {
        self.lines.push(DraftLine::empty());
        self.cursor = self.lines.len() - 1;
        self
    }

    /// Removes a line. The last remaining line is reset to empty instead.
    pub fn remove_line(mut self, index: usize) -> CoreResult<Self> {
        self.check_line(index)?;

        if self.lines.len() == 1 {
            self.lines[0] = DraftLine::empty();
            self.cursor = 0;
            return Ok(self);
        }

        self.lines.remove(index);
        if self.cursor > index || self.cursor >= self.lines.len() {
            self.cursor = self.cursor.saturating_sub(1);
        }
        Ok(self)
    }

    /// Moves the cursor to an existing line.
    pub fn focus_line(mut self, index: usize) -> CoreResult<Self> {
        self.check_line(index)?;
        self.cursor = index;
        Ok(self)
    }

    /// Appends one empty code/tag slot to a line.
    pub fn add_code_slot(mut self, line: usize) -> CoreResult<Self> {
        self.check_line(line)?;
        let target = &mut self.lines[line];
        target.codes.push(String::new());
        target.tags.push(String::new());
        Ok(self)
    }

    /// Removes a code slot. A line left without slots gets a single empty one.
    pub fn remove_code_slot(mut self, line: usize, slot: usize) -> CoreResult<Self> {
        self.check_line(line)?;
        let target = &mut self.lines[line];
        target.check_slot(line, slot)?;

        target.codes.remove(slot);
        target.tags.remove(slot);
        target.ensure_trailing_slot();
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Resolver decisions
    // -------------------------------------------------------------------------

    /// Applies a resolver decision.
    ///
    /// ## Cases
    /// - `AssignToCurrentLine`: binds the cursor line and seeds it with the code
    /// - `AssignToExistingLine`: folds the `merge` lines into `line`, then
    ///   appends the code there
    /// - `CreateNewLine`: appends a bound line and moves the cursor onto it
    ///
    /// The affected line always ends with one empty slot.
    pub fn apply_resolution(mut self, resolution: Resolution) -> CoreResult<Self> {
        match resolution {
            Resolution::AssignToCurrentLine { product, code, tag } => {
                let cursor = self.cursor;
                self.check_line(cursor)?;
                let line = &mut self.lines[cursor];
                line.bind(product);
                line.place_code(code, tag);
            }

            Resolution::AssignToExistingLine {
                line,
                merge,
                code,
                tag,
                ..
            } => {
                self.check_line(line)?;
                for &other in &merge {
                    self.check_line(other)?;
                }

                let mut target = line;
                let mut absorbed: Vec<usize> = merge.into_iter().filter(|&i| i != line).collect();
                absorbed.sort_unstable();
                absorbed.dedup();

                // Remove from the back so earlier indexes stay valid.
                for &other in absorbed.iter().rev() {
                    let removed = self.lines.remove(other);
                    if other < target {
                        target -= 1;
                    }
                    self.lines[target].absorb(removed);
                }

                self.lines[target].place_code(code, tag);
                self.cursor = target;
            }

            Resolution::CreateNewLine { product, code, tag } => {
                self.lines.push(DraftLine::bound(product, code, tag));
                self.cursor = self.lines.len() - 1;
            }
        }
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Operator edits
    // -------------------------------------------------------------------------

    /// Writes a code typed directly into a slot. An empty string clears it.
    pub fn set_code(mut self, line: usize, slot: usize, code: &str) -> CoreResult<Self> {
        self.check_line(line)?;
        let target = &mut self.lines[line];
        target.check_slot(line, slot)?;

        target.codes[slot] = codes::normalize(code);
        target.ensure_trailing_slot();
        Ok(self)
    }

    /// Edits the variant tag of a slot.
    pub fn set_tag(mut self, line: usize, slot: usize, tag: &str) -> CoreResult<Self> {
        self.check_line(line)?;
        let target = &mut self.lines[line];
        target.check_slot(line, slot)?;

        validation::validate_unit_tag(tag)?;
        target.tags[slot] = tag.trim().to_string();
        Ok(self)
    }

    /// Binds a line to a product picked by the operator (non-serialized stock).
    pub fn bind_product(mut self, line: usize, product: ProductRef) -> CoreResult<Self> {
        self.check_line(line)?;
        self.lines[line].bind(product);
        Ok(self)
    }

    /// Overrides the unit price of a line.
    pub fn set_unit_price(mut self, line: usize, unit_price_cents: i64) -> CoreResult<Self> {
        self.check_line(line)?;
        validation::validate_price_cents(unit_price_cents)?;
        self.lines[line].unit_price_cents = unit_price_cents;
        Ok(self)
    }

    /// Replaces a line with the result of `f` (quantity sync and overrides).
    pub fn update_line<F>(mut self, index: usize, f: F) -> CoreResult<Self>
    where
        F: FnOnce(DraftLine) -> CoreResult<DraftLine>,
    {
        self.check_line(index)?;
        let line = std::mem::take(&mut self.lines[index]);
        self.lines[index] = f(line)?;
        Ok(self)
    }

    /// Applies `f` to every line.
    pub fn map_lines<F>(mut self, f: F) -> Self
    where
        F: Fn(DraftLine) -> DraftLine,
    {
        self.lines = self.lines.into_iter().map(f).collect();
        self
    }

    /// Sets the payment metadata recorded at commit.
    pub fn with_settlement(mut self, settlement: Settlement) -> Self {
        self.settlement = settlement;
        self
    }

    // -------------------------------------------------------------------------
    // Commit
    // -------------------------------------------------------------------------

    /// Builds the ledger lines to persist.
    ///
    /// Unbound lines without codes are skipped. The transaction's
    /// `amount_paid_cents` is spread over lines in order, so a partial
    /// payment settles the first lines first.
    ///
    /// ## Errors
    /// - [`CoreError::UnboundLine`] when a line has codes but no product
    /// - [`CoreError::EmptyTransaction`] when nothing is left to commit
    /// - [`CoreError::Validation`] for an invalid quantity or code
    pub fn to_committed_lines(
        &self,
        store_id: &str,
        transaction_id: &str,
    ) -> CoreResult<Vec<CommittedLine>> {
        let mut bound = Vec::with_capacity(self.lines.len());
        for (index, line) in self.lines.iter().enumerate() {
            match &line.product {
                Some(product) => bound.push((line, product)),
                None if line.filled_count() > 0 => {
                    return Err(CoreError::UnboundLine { index });
                }
                None => {}
            }
        }

        if bound.is_empty() {
            return Err(CoreError::EmptyTransaction);
        }

        let total: i64 = bound.iter().map(|(line, _)| line.amount().cents()).sum();
        let mut unallocated = self
            .settlement
            .amount_paid_cents
            .unwrap_or(total)
            .clamp(0, total.max(0));

        let now = Utc::now();
        let mut committed = Vec::with_capacity(bound.len());

        for (line, product) in bound {
            validation::validate_quantity(line.quantity)?;

            let (unit_codes, unit_tags): (Vec<String>, Vec<String>) = line
                .codes
                .iter()
                .zip(&line.tags)
                .filter(|(code, _)| !code.trim().is_empty())
                .map(|(code, tag)| (code.trim().to_string(), tag.clone()))
                .unzip();
            validation::validate_unit_lists(&unit_codes, &unit_tags)?;

            let amount_cents = line.amount().cents();
            let paid = unallocated.min(amount_cents);
            unallocated -= paid;

            committed.push(CommittedLine {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction_id.to_string(),
                store_id: store_id.to_string(),
                kind: self.kind,
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                amount_cents,
                unit_codes,
                unit_tags,
                counterparty: self.settlement.counterparty.clone(),
                settlement: SettlementStatus::from_amounts(paid, amount_cents),
                payment_method: self.settlement.method,
                amount_paid_cents: paid,
                created_at: now,
                updated_at: now,
            });
        }

        Ok(committed)
    }

    fn check_line(&self, index: usize) -> CoreResult<()> {
        if index >= self.lines.len() {
            return Err(CoreError::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity;

    fn phone_x() -> ProductRef {
        ProductRef {
            id: "p-x".into(),
            name: "Phone X".into(),
            unit_price_cents: 1000,
        }
    }

    fn phone_y() -> ProductRef {
        ProductRef {
            id: "p-y".into(),
            name: "Phone Y".into(),
            unit_price_cents: 2500,
        }
    }

    fn assign_current(product: ProductRef, code: &str) -> Resolution {
        Resolution::AssignToCurrentLine {
            product,
            code: code.into(),
            tag: String::new(),
        }
    }

    fn assign_existing(line: usize, merge: Vec<usize>, code: &str) -> Resolution {
        Resolution::AssignToExistingLine {
            line,
            merge,
            product: phone_x(),
            code: code.into(),
            tag: String::new(),
        }
    }

    #[test]
    fn test_new_draft_has_one_empty_line() {
        let draft = DraftTransaction::new(LedgerKind::Sale);
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.lines()[0].codes(), [""]);
        assert_eq!(draft.lines()[0].quantity, 1);
        assert!(draft.current_line().is_available());
    }

    #[test]
    fn test_assign_to_current_line_keeps_trailing_slot() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap();

        let line = &draft.lines()[0];
        assert_eq!(line.codes(), ["A1", ""]);
        assert_eq!(line.tags().len(), 2);
        assert_eq!(line.unit_price_cents, 1000);
        assert_eq!(line.product.as_ref().map(|p| p.id.as_str()), Some("p-x"));
    }

    #[test]
    fn test_assign_to_existing_line_appends() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap()
            .apply_resolution(assign_existing(0, vec![], "A2"))
            .unwrap();

        assert_eq!(draft.lines()[0].codes(), ["A1", "A2", ""]);
    }

    #[test]
    fn test_create_new_line_leaves_first_untouched() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap();
        let first_before = draft.lines()[0].clone();

        let draft = draft
            .apply_resolution(Resolution::CreateNewLine {
                product: phone_y(),
                code: "B1".into(),
                tag: "128GB".into(),
            })
            .unwrap();

        assert_eq!(draft.lines().len(), 2);
        assert_eq!(draft.lines()[0], first_before);
        assert_eq!(draft.lines()[1].codes(), ["B1", ""]);
        assert_eq!(draft.lines()[1].tags(), ["128GB", ""]);
        assert_eq!(draft.cursor(), 1);
    }

    #[test]
    fn test_merge_collapses_same_product_lines() {
        // Two lines for Phone X built through operator picks.
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap()
            .add_line()
            .bind_product(1, phone_y())
            .unwrap()
            .add_line()
            .bind_product(2, phone_x())
            .unwrap()
            .set_code(2, 0, "A3")
            .unwrap();

        let draft = draft
            .apply_resolution(assign_existing(0, vec![2], "A2"))
            .unwrap();

        assert_eq!(draft.lines().len(), 2);
        assert_eq!(draft.lines()[0].codes(), ["A1", "A3", "A2", ""]);
        assert_eq!(draft.cursor(), 0);
    }

    #[test]
    fn test_merge_into_later_line_shifts_index() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .bind_product(0, phone_x())
            .unwrap()
            .set_code(0, 0, "A1")
            .unwrap()
            .add_line()
            .bind_product(1, phone_x())
            .unwrap()
            .set_code(1, 0, "A2")
            .unwrap();

        let draft = draft
            .apply_resolution(assign_existing(1, vec![0], "A3"))
            .unwrap();

        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.lines()[0].codes(), ["A2", "A1", "A3", ""]);
        assert_eq!(draft.cursor(), 0);
    }

    #[test]
    fn test_remove_last_line_resets_it() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap()
            .remove_line(0)
            .unwrap();

        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.lines()[0], DraftLine::empty());
    }

    #[test]
    fn test_remove_line_keeps_cursor_in_range() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .add_line()
            .add_line();
        assert_eq!(draft.cursor(), 2);

        let draft = draft.remove_line(2).unwrap();
        assert_eq!(draft.cursor(), 1);

        let draft = draft.remove_line(0).unwrap();
        assert_eq!(draft.cursor(), 0);
        assert_eq!(draft.lines().len(), 1);
    }

    #[test]
    fn test_remove_code_slot_round_trip() {
        let before = DraftTransaction::new(LedgerKind::Sale)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap()
            .map_lines(quantity::sync);

        let after = before
            .clone()
            .apply_resolution(assign_existing(0, vec![], "A2"))
            .unwrap()
            .map_lines(quantity::sync);
        assert_eq!(after.lines()[0].quantity, 2);

        let restored = after.remove_code_slot(0, 1).unwrap().map_lines(quantity::sync);
        assert_eq!(restored.lines()[0].codes(), before.lines()[0].codes());
        assert_eq!(restored.lines()[0].quantity, before.lines()[0].quantity);
    }

    #[test]
    fn test_remove_only_slot_resets_to_single_empty() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .remove_code_slot(0, 0)
            .unwrap();
        assert_eq!(draft.lines()[0].codes(), [""]);
    }

    #[test]
    fn test_out_of_range_errors() {
        let draft = DraftTransaction::new(LedgerKind::Sale);
        assert_eq!(
            draft.clone().remove_line(3).unwrap_err(),
            CoreError::LineOutOfRange { index: 3, len: 1 }
        );
        assert_eq!(
            draft.set_code(0, 5, "A1").unwrap_err(),
            CoreError::SlotOutOfRange { line: 0, slot: 5 }
        );
    }

    #[test]
    fn test_set_code_keeps_trailing_slot() {
        let draft = DraftTransaction::new(LedgerKind::Sale)
            .set_code(0, 0, "  A9 ")
            .unwrap();
        assert_eq!(draft.lines()[0].codes(), ["A9", ""]);
        assert_eq!(draft.find_code("a9"), Some((0, 0)));
    }

    #[test]
    fn test_set_tag_rejects_delimiter() {
        let draft = DraftTransaction::new(LedgerKind::Sale);
        assert!(matches!(
            draft.set_tag(0, 0, "red,blue"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_committed_lines_strip_trailing_slot() {
        let draft = DraftTransaction::new(LedgerKind::Debt)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap()
            .apply_resolution(assign_existing(0, vec![], "A2"))
            .unwrap()
            .map_lines(quantity::sync);

        let lines = draft.to_committed_lines("store-1", "tx-1").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_codes, vec!["A1", "A2"]);
        assert_eq!(lines[0].unit_tags, vec!["", ""]);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].amount_cents, 2000);
        assert_eq!(lines[0].kind, LedgerKind::Debt);
        assert_eq!(lines[0].settlement, SettlementStatus::Paid);
    }

    #[test]
    fn test_partial_payment_settles_lines_in_order() {
        let draft = DraftTransaction::new(LedgerKind::Debt)
            .apply_resolution(assign_current(phone_x(), "A1"))
            .unwrap()
            .apply_resolution(Resolution::CreateNewLine {
                product: phone_y(),
                code: "B1".into(),
                tag: String::new(),
            })
            .unwrap()
            .map_lines(quantity::sync)
            .with_settlement(Settlement {
                counterparty: Some("Acme Supplies".into()),
                method: None,
                amount_paid_cents: Some(1500),
            });

        let lines = draft.to_committed_lines("store-1", "tx-1").unwrap();
        assert_eq!(lines[0].amount_paid_cents, 1000);
        assert_eq!(lines[0].settlement, SettlementStatus::Paid);
        assert_eq!(lines[1].amount_paid_cents, 500);
        assert_eq!(lines[1].settlement, SettlementStatus::Partial);
        assert_eq!(lines[1].counterparty.as_deref(), Some("Acme Supplies"));
    }

    #[test]
    fn test_commit_rejects_unbound_codes_and_empty_drafts() {
        let empty = DraftTransaction::new(LedgerKind::Sale);
        assert_eq!(
            empty.to_committed_lines("s", "t").unwrap_err(),
            CoreError::EmptyTransaction
        );

        let unbound = DraftTransaction::new(LedgerKind::Sale)
            .set_code(0, 0, "A1")
            .unwrap();
        assert_eq!(
            unbound.to_committed_lines("s", "t").unwrap_err(),
            CoreError::UnboundLine { index: 0 }
        );
    }
}
