//! # Scan Session
//!
//! One operator working one draft transaction: the single consumer of the
//! input queue and the only owner of the draft.
//!
//! ## Scan Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InputEvent::Scan(event)                  (strictly in arrival order)   │
//! │     │                                                                   │
//! │     ├─ closed / not Draft?          → Discarded                         │
//! │     ├─ SoldUnitCache.refresh(code)  → failure: CACHE_UNAVAILABLE warn   │
//! │     ├─ unknown to local catalog?    → find_product_by_code, cache it    │
//! │     ├─ resolver::resolve            → Rejected(reason), draft untouched │
//! │     ├─ draft.apply_resolution                                           │
//! │     └─ draft.map_lines(quantity::sync)                                  │
//! │                                                 → Assigned              │
//! │                                                                         │
//! │  InputEvent::Fault                  → notice + degrade to Manual        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Lifecycle
//! ```text
//!   Draft ──commit──► Committed ──edit──► Committed ──delete (last line)──► Deleted
//!     ▲                                                                       │
//!     └──────────────────────────── new_transaction ──────────────────────────┘
//! ```
//!
//! A commit whose lines were stored but whose stock writes failed still ends
//! in Committed. The unapplied adjustments are kept on the session until
//! [`ScanSession::retry_stock_adjustment`] lands them.

use std::sync::Arc;

use serde::Serialize;
use stockscan_core::draft::DraftTransaction;
use stockscan_core::resolver::{self, Resolution};
use stockscan_core::stock::{StockAdjustment, TransactionState};
use stockscan_core::{
    codes, quantity, CommittedLine, CoreError, InventoryRecord, LedgerKind, LineEdit, Product,
    ProductRef, ScanEvent, ScanRejection, Settlement,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::SoldUnitCache;
use crate::config::ScanConfig;
use crate::error::{OperatorNotice, SessionError, SessionResult};
use crate::input::{
    CameraSource, InputArbiter, InputEvent, InputMode, KeyInput, ScanFeedback, SilentFeedback,
    EVENT_QUEUE_CAPACITY,
};
use crate::ledger::{CommitReceipt, StockLedger};
use crate::store::LedgerStore;

// =============================================================================
// Reports
// =============================================================================

/// What happened to one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The code now sits on `line`.
    Assigned {
        line: usize,
        product: ProductRef,
        code: String,
    },
    /// The scan was refused; the draft is unchanged.
    Rejected { rejection: ScanRejection },
    /// The scan arrived when the draft could not take it.
    Discarded { reason: String },
}

/// Result of processing one scan event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub event: ScanEvent,
    pub outcome: ScanOutcome,
    /// Non-blocking problems met while processing (e.g. stale sold cache).
    pub warnings: Vec<OperatorNotice>,
}

impl ScanReport {
    fn new(event: ScanEvent, outcome: ScanOutcome) -> Self {
        ScanReport {
            event,
            outcome,
            warnings: Vec::new(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Assigned { .. })
    }

    /// The notice to show for a rejection, if any.
    pub fn rejection_notice(&self) -> Option<OperatorNotice> {
        match &self.outcome {
            ScanOutcome::Rejected { rejection } => Some(OperatorNotice::from(rejection)),
            _ => None,
        }
    }
}

/// One item delivered from the input queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Scan(ScanReport),
    /// An input channel failed; input is now manual.
    Fault(OperatorNotice),
}

// =============================================================================
// Scan Session
// =============================================================================

/// A scanning session over one draft transaction.
pub struct ScanSession<S: LedgerStore, P: CameraSource> {
    store: Arc<S>,
    store_id: String,
    kind: LedgerKind,
    draft: DraftTransaction,
    state: TransactionState,
    transaction_id: String,
    committed: Vec<CommittedLine>,
    pending_stock: Vec<StockAdjustment>,
    catalog: Vec<Product>,
    sold: SoldUnitCache,
    ledger: StockLedger<S>,
    arbiter: InputArbiter<P>,
    events: mpsc::Receiver<InputEvent>,
    closed: bool,
}

impl<S: LedgerStore, P: CameraSource> ScanSession<S, P> {
    /// Opens a session for `kind` and loads the store's catalog.
    ///
    /// Input starts idle; call [`switch_input`](Self::switch_input).
    pub async fn open(
        store: Arc<S>,
        config: &ScanConfig,
        kind: LedgerKind,
        cameras: P,
    ) -> SessionResult<Self> {
        config.validate()?;

        let store_id = config.store_id().to_string();
        let catalog = store.list_products(&store_id).await?;
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let feedback: Arc<dyn ScanFeedback> = Arc::new(SilentFeedback);

        info!(store_id = %store_id, kind = %kind, products = catalog.len(), "Scan session opened");

        Ok(ScanSession {
            ledger: StockLedger::new(
                Arc::clone(&store),
                store_id.clone(),
                config.stock.cas_max_retries,
            ),
            sold: SoldUnitCache::new(store_id.clone()),
            arbiter: InputArbiter::new(cameras, config, feedback, tx),
            store,
            store_id,
            kind,
            draft: DraftTransaction::new(kind),
            state: TransactionState::Draft,
            transaction_id: Uuid::new_v4().to_string(),
            committed: Vec::new(),
            pending_stock: Vec::new(),
            catalog,
            events: rx,
            closed: false,
        })
    }

    /// Sets the confirmation tone played on camera decodes.
    pub fn with_feedback(mut self, feedback: Arc<dyn ScanFeedback>) -> Self {
        self.arbiter.set_feedback(feedback);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn draft(&self) -> &DraftTransaction {
        &self.draft
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Lines written by the last commit, as currently stored.
    pub fn committed_lines(&self) -> &[CommittedLine] {
        &self.committed
    }

    /// Stock adjustments of the committed transaction not yet written.
    pub fn pending_stock(&self) -> &[StockAdjustment] {
        &self.pending_stock
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    pub fn sold_cache(&self) -> &SoldUnitCache {
        &self.sold
    }

    pub fn input_mode(&self) -> Option<InputMode> {
        self.arbiter.mode()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Makes `mode` the only live input channel.
    pub async fn switch_input(&mut self, mode: InputMode) -> SessionResult<()> {
        self.ensure_open()?;
        self.arbiter.switch_to(mode).await;
        Ok(())
    }

    /// Forwards a key from the window's keyboard handler (external scanner mode).
    pub fn key(&mut self, key: KeyInput) -> SessionResult<bool> {
        self.ensure_open()?;
        self.arbiter.key(key)
    }

    /// Queues a code typed into the manual entry field.
    pub fn submit_manual(&mut self, text: &str) -> SessionResult<bool> {
        self.ensure_open()?;
        self.arbiter.submit_manual(text)
    }

    /// Waits for the next queued input and processes it.
    ///
    /// Returns `None` once the session is closed.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if self.closed {
            return None;
        }
        let event = self.events.recv().await?;
        Some(self.handle_input(event).await)
    }

    /// Processes everything already queued, in arrival order.
    pub async fn process_pending(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while !self.closed {
            match self.events.try_recv() {
                Ok(event) => updates.push(self.handle_input(event).await),
                Err(_) => break,
            }
        }
        updates
    }

    async fn handle_input(&mut self, event: InputEvent) -> SessionUpdate {
        match event {
            InputEvent::Scan(scan) => SessionUpdate::Scan(self.process_scan(scan).await),
            InputEvent::Fault { mode, error } => {
                warn!(
                    mode = %mode,
                    error = %error,
                    "Input channel failed; switching to manual entry"
                );
                if !self.closed {
                    self.arbiter.degrade_to_manual().await;
                }
                SessionUpdate::Fault(OperatorNotice::from(&error))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Scan Processing
    // -------------------------------------------------------------------------

    /// Resolves one scan against the draft.
    ///
    /// Validation failures come back as [`ScanOutcome::Rejected`] and leave
    /// the draft unchanged. Store failures never block the scan; they become
    /// warnings on the report.
    pub async fn process_scan(&mut self, event: ScanEvent) -> ScanReport {
        if self.closed {
            return ScanReport::new(event, ScanOutcome::Discarded {
                reason: SessionError::SessionClosed.to_string(),
            });
        }
        if let Err(e) = self.state.ensure_draft("scan") {
            return ScanReport::new(event, ScanOutcome::Discarded { reason: e.to_string() });
        }

        let code = codes::normalize(&event.code);
        let mut warnings = Vec::new();

        if !code.is_empty() {
            let candidates = std::slice::from_ref(&code);
            if let Err(e) = self.sold.refresh(self.store.as_ref(), candidates).await {
                warnings.push(OperatorNotice::cache_unavailable(e));
            }
            if let Err(e) = self.ensure_in_catalog(&code).await {
                warnings.push(OperatorNotice::from(&e));
            }
        }

        let outcome = match resolver::resolve(&event, &self.draft, &self.catalog, &self.sold) {
            Ok(resolution) => self.assign(resolution),
            Err(rejection) => {
                debug!(code = %code, reason = rejection.code(), "Scan rejected");
                ScanOutcome::Rejected { rejection }
            }
        };

        ScanReport {
            event,
            outcome,
            warnings,
        }
    }

    fn assign(&mut self, resolution: Resolution) -> ScanOutcome {
        let product = resolution.product().clone();
        let code = resolution.code().to_string();

        match self.draft.clone().apply_resolution(resolution) {
            Ok(next) => {
                self.draft = next.map_lines(quantity::sync);
                let line = self.draft.cursor();
                debug!(code = %code, product = %product.name, line, "Scan assigned");
                ScanOutcome::Assigned { line, product, code }
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Resolution could not be applied");
                ScanOutcome::Discarded { reason: e.to_string() }
            }
        }
    }

    /// Pulls the owner of `code` from the store when the local catalog lacks it.
    async fn ensure_in_catalog(&mut self, code: &str) -> SessionResult<()> {
        if resolver::find_owner(&self.catalog, code).is_some() {
            return Ok(());
        }

        if let Some(product) = self.store.find_product_by_code(&self.store_id, code).await? {
            debug!(code = %code, product = %product.name, "Product loaded for unknown code");
            match self.catalog.iter_mut().find(|p| p.id == product.id) {
                Some(existing) => *existing = product,
                None => self.catalog.push(product),
            }
        }
        Ok(())
    }

    /// Reloads the store's products.
    pub async fn reload_catalog(&mut self) -> SessionResult<usize> {
        self.catalog = self.store.list_products(&self.store_id).await?;
        Ok(self.catalog.len())
    }

    // -------------------------------------------------------------------------
    // Operator Edits (Draft only)
    // -------------------------------------------------------------------------

    pub fn add_line(&mut self) -> SessionResult<()> {
        self.edit_draft("add line", |draft| Ok(draft.add_line()))
    }

    pub fn remove_line(&mut self, index: usize) -> SessionResult<()> {
        self.edit_draft("remove line", |draft| draft.remove_line(index))
    }

    pub fn focus_line(&mut self, index: usize) -> SessionResult<()> {
        self.edit_draft("focus line", |draft| draft.focus_line(index))
    }

    pub fn add_code_slot(&mut self, line: usize) -> SessionResult<()> {
        self.edit_draft("add code slot", |draft| draft.add_code_slot(line))
    }

    pub fn remove_code_slot(&mut self, line: usize, slot: usize) -> SessionResult<()> {
        self.edit_draft("remove code slot", |draft| draft.remove_code_slot(line, slot))
    }

    pub fn set_tag(&mut self, line: usize, slot: usize, tag: &str) -> SessionResult<()> {
        self.edit_draft("set tag", |draft| draft.set_tag(line, slot, tag))
    }

    pub fn set_unit_price(&mut self, line: usize, unit_price_cents: i64) -> SessionResult<()> {
        self.edit_draft("set price", |draft| draft.set_unit_price(line, unit_price_cents))
    }

    /// The operator typed a quantity; code changes stop recomputing it.
    pub fn set_quantity(&mut self, line: usize, quantity: i64) -> SessionResult<()> {
        self.edit_draft("set quantity", |draft| {
            draft.update_line(line, |l| quantity::set_manual_quantity(l, quantity))
        })
    }

    /// Hands the quantity back to the code count.
    pub fn clear_quantity_override(&mut self, line: usize) -> SessionResult<()> {
        self.edit_draft("clear quantity override", |draft| {
            draft.update_line(line, |l| Ok(quantity::clear_override(l)))
        })
    }

    /// Binds a line to a catalog product without scanning (non-serialized stock).
    pub fn bind_product(&mut self, line: usize, product_id: &str) -> SessionResult<()> {
        let product = self
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .map(Product::to_ref)
            .ok_or_else(|| SessionError::NotFound {
                entity: "Product".into(),
                id: product_id.to_string(),
            })?;
        self.edit_draft("bind product", |draft| draft.bind_product(line, product))
    }

    pub fn set_settlement(&mut self, settlement: Settlement) -> SessionResult<()> {
        self.edit_draft("set settlement", |draft| Ok(draft.with_settlement(settlement)))
    }

    /// Writes a code typed straight into a slot.
    ///
    /// The code goes through the same sold/duplicate/ownership checks as a
    /// scan. An unbound line is bound to the code's product.
    pub async fn set_code(
        &mut self,
        line: usize,
        slot: usize,
        raw: &str,
    ) -> SessionResult<Vec<OperatorNotice>> {
        self.ensure_open()?;
        self.state.ensure_draft("set code")?;

        let mut warnings = Vec::new();
        let code = codes::normalize(raw);
        if !code.is_empty() {
            let candidates = std::slice::from_ref(&code);
            if let Err(e) = self.sold.refresh(self.store.as_ref(), candidates).await {
                warnings.push(OperatorNotice::cache_unavailable(e));
            }
            if let Err(e) = self.ensure_in_catalog(&code).await {
                warnings.push(OperatorNotice::from(&e));
            }
        }

        let code =
            resolver::resolve_slot_edit(raw, line, slot, &self.draft, &self.catalog, &self.sold)?;

        let owner = match resolver::find_owner(&self.catalog, &code) {
            Some((product, _)) if !code.is_empty() => Some(product.to_ref()),
            _ => None,
        };
        let unbound = self.draft.lines().get(line).is_some_and(|l| l.product.is_none());

        self.edit_draft("set code", |draft| {
            let draft = match owner {
                Some(product) if unbound => draft.bind_product(line, product)?,
                _ => draft,
            };
            draft.set_code(line, slot, &code)
        })?;
        Ok(warnings)
    }

    fn edit_draft<F>(&mut self, operation: &str, f: F) -> SessionResult<()>
    where
        F: FnOnce(DraftTransaction) -> Result<DraftTransaction, CoreError>,
    {
        self.ensure_open()?;
        self.state.ensure_draft(operation)?;

        let next = f(self.draft.clone())?;
        self.draft = next.map_lines(quantity::sync);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Commit / Edit / Delete
    // -------------------------------------------------------------------------

    /// Persists the draft and takes its units off stock.
    ///
    /// On failure the draft stays editable, except for
    /// [`SessionError::StockPending`]: the lines are stored, the session moves
    /// to Committed and the remaining adjustments wait for
    /// [`retry_stock_adjustment`](Self::retry_stock_adjustment).
    pub async fn commit(&mut self) -> SessionResult<CommitReceipt> {
        self.ensure_open()?;
        let next = self.state.commit()?;

        let lines = self.draft.to_committed_lines(&self.store_id, &self.transaction_id)?;
        let receipt = match self.ledger.commit(&lines).await {
            Ok(receipt) => receipt,
            Err(err) => {
                if let SessionError::StockPending { pending, .. } = &err {
                    warn!(
                        transaction_id = %self.transaction_id,
                        products = pending.len(),
                        "Transaction stored with stock adjustments pending"
                    );
                    self.pending_stock = pending.clone();
                    self.record_commit(lines, next).await;
                }
                return Err(err);
            }
        };

        self.record_commit(lines, next).await;
        Ok(receipt)
    }

    async fn record_commit(&mut self, lines: Vec<CommittedLine>, next: TransactionState) {
        let sold: Vec<String> = lines.iter().flat_map(|l| l.unit_codes.iter().cloned()).collect();
        if let Err(e) = self.sold.refresh(self.store.as_ref(), &sold).await {
            debug!(error = %e, "Sold cache not refreshed after commit");
        }

        self.committed = lines;
        self.state = next;
    }

    /// Writes the stock adjustments a partially failed commit left behind.
    ///
    /// Returns the counters it moved; empty when nothing was pending.
    pub async fn retry_stock_adjustment(&mut self) -> SessionResult<Vec<InventoryRecord>> {
        self.ensure_open()?;
        if self.pending_stock.is_empty() {
            return Ok(Vec::new());
        }

        let line_ids: Vec<String> = self.committed.iter().map(|l| l.id.clone()).collect();
        match self
            .ledger
            .settle(&self.transaction_id, &line_ids, &self.pending_stock)
            .await
        {
            Ok(inventory) => {
                info!(transaction_id = %self.transaction_id, "Pending stock adjustments applied");
                self.pending_stock.clear();
                Ok(inventory)
            }
            Err(err) => {
                if let SessionError::StockPending { pending, .. } = &err {
                    self.pending_stock = pending.clone();
                }
                Err(err)
            }
        }
    }

    fn pending_stock_error(&self, reason: &str) -> SessionError {
        SessionError::StockPending {
            transaction_id: self.transaction_id.clone(),
            line_ids: self.committed.iter().map(|l| l.id.clone()).collect(),
            pending: self.pending_stock.clone(),
            reason: reason.to_string(),
        }
    }

    /// Edits one line of the committed transaction.
    pub async fn edit_committed_line(
        &mut self,
        line_id: &str,
        edit: &LineEdit,
    ) -> SessionResult<CommittedLine> {
        self.ensure_open()?;
        let next = self.state.edit()?;
        let index = self.committed_index(line_id)?;
        self.retry_stock_adjustment().await?;

        let updated = self.ledger.edit_line(line_id, edit).await?;
        self.committed[index] = updated.clone();
        self.state = next;
        Ok(updated)
    }

    /// Deletes one line of the committed transaction and restores its stock.
    ///
    /// Deleting the last remaining line moves the transaction to Deleted.
    pub async fn delete_committed_line(&mut self, line_id: &str) -> SessionResult<CommittedLine> {
        self.ensure_open()?;
        let after_delete = self.state.delete()?;
        let index = self.committed_index(line_id)?;
        self.retry_stock_adjustment().await?;

        let removed = self.ledger.delete_line(line_id).await?;
        self.committed.remove(index);
        if self.committed.is_empty() {
            self.state = after_delete;
        }
        Ok(removed)
    }

    /// Deletes every line of the committed transaction.
    pub async fn delete_transaction(&mut self) -> SessionResult<()> {
        let ids: Vec<String> = self.committed.iter().map(|l| l.id.clone()).collect();
        if ids.is_empty() {
            self.state = self.state.delete()?;
            return Ok(());
        }
        for id in ids {
            self.delete_committed_line(&id).await?;
        }
        Ok(())
    }

    fn committed_index(&self, line_id: &str) -> SessionResult<usize> {
        self.committed
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| SessionError::NotFound {
                entity: "Committed line".into(),
                id: line_id.to_string(),
            })
    }

    /// Starts a fresh draft of the same kind.
    ///
    /// Refused while the committed transaction still has stock pending.
    pub fn new_transaction(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.pending_stock.is_empty() {
            return Err(self.pending_stock_error("retry the stock adjustment first"));
        }
        self.draft = DraftTransaction::new(self.kind);
        self.state = TransactionState::Draft;
        self.transaction_id = Uuid::new_v4().to_string();
        self.committed.clear();
        debug!(transaction_id = %self.transaction_id, "New draft started");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Releases the input channels. Anything still queued is dropped.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.arbiter.teardown().await;
        self.events.close();
        self.closed = true;
        info!(store_id = %self.store_id, "Scan session closed");
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }
}

impl<S: LedgerStore, P: CameraSource> std::fmt::Debug for ScanSession<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("store_id", &self.store_id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("transaction_id", &self.transaction_id)
            .field("lines", &self.draft.lines().len())
            .field("pending_stock", &self.pending_stock.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NoCamera;
    use crate::memory::InMemoryStore;
    use stockscan_core::{ScanSource, SettlementStatus};

    fn phone_x() -> Product {
        Product::new("p-x", "s1", "Phone X", 1_000)
            .with_units(
                vec!["A1".into(), "A2".into(), "A3".into()],
                vec!["".into(), "".into(), "".into()],
            )
            .with_stocked_qty(3)
    }

    fn phone_y() -> Product {
        Product::new("p-y", "s1", "Phone Y", 2_500)
            .with_units(vec!["B1".into()], vec!["".into()])
            .with_stocked_qty(1)
    }

    async fn open(store: Arc<InMemoryStore>) -> ScanSession<InMemoryStore, fn() -> NoCamera> {
        let config = ScanConfig::for_store("s1");
        let cameras: fn() -> NoCamera = || NoCamera;
        let mut session = ScanSession::open(store, &config, LedgerKind::Sale, cameras)
            .await
            .unwrap();
        session.switch_input(InputMode::Manual).await.unwrap();
        session
    }

    fn manual(code: &str) -> ScanEvent {
        ScanEvent::new(code, ScanSource::Manual)
    }

    #[tokio::test]
    async fn test_manual_queue_processed_in_order() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x(), phone_y()]));
        let mut session = open(store).await;

        for code in ["A1", "A2", "B1", "A1"] {
            session.submit_manual(code).unwrap();
        }
        let updates = session.process_pending().await;
        assert_eq!(updates.len(), 4);

        let outcomes: Vec<&ScanOutcome> = updates
            .iter()
            .map(|u| match u {
                SessionUpdate::Scan(report) => &report.outcome,
                SessionUpdate::Fault(n) => panic!("unexpected fault {n:?}"),
            })
            .collect();
        assert!(matches!(outcomes[0], ScanOutcome::Assigned { line: 0, .. }));
        assert!(matches!(outcomes[1], ScanOutcome::Assigned { line: 0, .. }));
        assert!(matches!(outcomes[2], ScanOutcome::Assigned { line: 1, .. }));
        assert!(matches!(
            outcomes[3],
            ScanOutcome::Rejected {
                rejection: ScanRejection::DuplicateInTransaction { .. }
            }
        ));

        let lines = session.draft().lines();
        assert_eq!(lines[0].codes(), ["A1", "A2", ""]);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[1].codes(), ["B1", ""]);
    }

    #[tokio::test]
    async fn test_sold_code_rejected_without_mutation() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x()]));
        let mut session = open(Arc::clone(&store)).await;
        session.process_scan(manual("A1")).await;
        session.commit().await.unwrap();

        let mut second = open(store).await;
        let before = second.draft().clone();
        let report = second.process_scan(manual("a1")).await;

        assert_eq!(
            report.rejection_notice().map(|n| n.code),
            Some("ALREADY_SOLD".to_string())
        );
        assert_eq!(second.draft(), &before);
    }

    #[tokio::test]
    async fn test_stale_cache_warns_but_assigns() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x()]));
        let mut session = open(Arc::clone(&store)).await;

        store.set_offline(true).await;
        let report = session.process_scan(manual("A1")).await;

        assert!(report.is_assigned());
        assert_eq!(report.warnings[0].code, "CACHE_UNAVAILABLE");
        assert!(session.sold_cache().is_stale());
    }

    #[tokio::test]
    async fn test_product_added_after_open_is_found() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = open(Arc::clone(&store)).await;
        assert!(session.catalog().is_empty());

        store.save_product(&phone_y()).await.unwrap();
        let report = session.process_scan(manual("B1")).await;

        assert!(report.is_assigned());
        assert_eq!(session.catalog().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_quantity_survives_scans() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x()]));
        let mut session = open(store).await;

        session.process_scan(manual("A1")).await;
        session.set_quantity(0, 5).unwrap();
        session.process_scan(manual("A2")).await;
        assert_eq!(session.draft().lines()[0].quantity, 5);

        session.clear_quantity_override(0).unwrap();
        assert_eq!(session.draft().lines()[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_set_code_binds_and_checks() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x(), phone_y()]));
        let mut session = open(store).await;

        session.set_code(0, 0, "A2").await.unwrap();
        let line = &session.draft().lines()[0];
        assert_eq!(line.product.as_ref().map(|p| p.id.as_str()), Some("p-x"));
        assert_eq!(line.codes(), ["A2", ""]);

        let err = session.set_code(0, 1, "B1").await.unwrap_err();
        assert_eq!(err.code(), "OWNED_BY_OTHER_PRODUCT");
    }

    #[tokio::test]
    async fn test_commit_locks_draft_and_allows_edits() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x()]));
        let mut session = open(Arc::clone(&store)).await;

        session.process_scan(manual("A1")).await;
        session.process_scan(manual("A2")).await;
        session
            .set_settlement(Settlement {
                counterparty: Some("Walk-in".into()),
                method: None,
                amount_paid_cents: Some(500),
            })
            .unwrap();
        let receipt = session.commit().await.unwrap();

        assert_eq!(session.state(), TransactionState::Committed);
        assert_eq!(receipt.inventory[0].available_qty, 1);
        assert_eq!(session.committed_lines()[0].settlement, SettlementStatus::Partial);
        assert!(session.add_line().is_err());
        assert!(matches!(
            session.process_scan(manual("A3")).await.outcome,
            ScanOutcome::Discarded { .. }
        ));

        let id = receipt.line_ids[0].clone();
        let edit = LineEdit::from_line(&session.committed_lines()[0]).with_quantity(1);
        session.edit_committed_line(&id, &edit).await.unwrap();
        let record = store.get_inventory("p-x", "s1").await.unwrap().unwrap();
        assert_eq!(record.available_qty, 2);

        session.delete_committed_line(&id).await.unwrap();
        assert_eq!(session.state(), TransactionState::Deleted);
        let record = store.get_inventory("p-x", "s1").await.unwrap().unwrap();
        assert_eq!(record.available_qty, 3);

        session.new_transaction().unwrap();
        assert_eq!(session.state(), TransactionState::Draft);
    }

    #[tokio::test]
    async fn test_failed_stock_write_still_commits_once() {
        let cable = Product::new("p-c", "s1", "Cable", 300).with_stocked_qty(10);
        let store = Arc::new(InMemoryStore::with_products(vec![cable]));
        let mut session = open(Arc::clone(&store)).await;

        session.bind_product(0, "p-c").unwrap();
        store.inject_cas_conflicts(4).await;

        let err = session.commit().await.unwrap_err();
        assert_eq!(err.code(), "STOCK_PENDING");
        assert_eq!(session.state(), TransactionState::Committed);
        assert_eq!(session.committed_lines().len(), 1);
        assert_eq!(session.pending_stock().len(), 1);
        assert_eq!(store.committed_lines().await.len(), 1);

        // The same draft cannot be stored a second time.
        assert!(matches!(session.commit().await, Err(SessionError::Core(_))));
        assert!(session.new_transaction().is_err());
        assert_eq!(store.committed_lines().await.len(), 1);

        let inventory = session.retry_stock_adjustment().await.unwrap();
        assert_eq!(inventory[0].available_qty, 5);
        assert!(session.pending_stock().is_empty());
        assert!(session.retry_stock_adjustment().await.unwrap().is_empty());

        session.new_transaction().unwrap();
        assert_eq!(store.committed_lines().await.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_stock_settled_before_delete() {
        let cable = Product::new("p-c", "s1", "Cable", 300).with_stocked_qty(10);
        let store = Arc::new(InMemoryStore::with_products(vec![cable]));
        let mut session = open(Arc::clone(&store)).await;

        session.bind_product(0, "p-c").unwrap();
        store.inject_cas_conflicts(4).await;
        session.commit().await.unwrap_err();

        let id = session.committed_lines()[0].id.clone();
        session.delete_committed_line(&id).await.unwrap();

        // Ten on hand, four taken elsewhere; this sale took one and gave it back.
        let record = store.get_inventory("p-c", "s1").await.unwrap().unwrap();
        assert_eq!(record.available_qty, 6);
        assert!(session.pending_stock().is_empty());
        assert_eq!(session.state(), TransactionState::Deleted);
    }

    #[tokio::test]
    async fn test_camera_fault_degrades_to_manual() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x()]));
        let mut session = open(store).await;

        session.switch_input(InputMode::Camera).await.unwrap();
        match session.next_update().await {
            Some(SessionUpdate::Fault(notice)) => assert_eq!(notice.code, "CAMERA_NOT_FOUND"),
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(session.input_mode(), Some(InputMode::Manual));
        assert!(session.submit_manual("A1").unwrap());
    }

    #[tokio::test]
    async fn test_closed_session_discards() {
        let store = Arc::new(InMemoryStore::with_products(vec![phone_x()]));
        let mut session = open(store).await;

        session.close().await;
        assert!(session.is_closed());
        assert_eq!(session.input_mode(), None);
        assert!(matches!(session.submit_manual("A1"), Err(SessionError::SessionClosed)));
        assert!(matches!(
            session.process_scan(manual("A1")).await.outcome,
            ScanOutcome::Discarded { .. }
        ));
        assert!(session.next_update().await.is_none());
    }
}
