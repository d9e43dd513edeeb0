//! End-to-end: manual scans into a draft, commit, edit and delete, checked
//! against the stock counters of both store implementations.

use std::sync::Arc;

use stockscan_core::stock::TransactionState;
use stockscan_core::{CoreError, LedgerKind, LineEdit, Product, ScanRejection};
use stockscan_db::{Database, DbConfig};
use stockscan_session::input::{InputMode, NoCamera};
use stockscan_session::{
    InMemoryStore, LedgerStore, ScanConfig, ScanOutcome, ScanSession, SessionError, SessionUpdate,
};

const STORE: &str = "store-1";

type Session<S> = ScanSession<S, fn() -> NoCamera>;

fn no_camera() -> NoCamera {
    NoCamera
}

fn catalog() -> Vec<Product> {
    vec![
        Product::new("p-x", STORE, "Phone X", 50_000)
            .with_units(vec!["A1".into(), "A2".into()], vec!["64GB".into(), "128GB".into()])
            .with_stocked_qty(5),
        Product::new("p-y", STORE, "Phone Y", 30_000)
            .with_units(vec!["B1".into()], vec!["".into()])
            .with_stocked_qty(2),
        Product::new("p-z", STORE, "Phone Z", 10_000)
            .with_units(vec!["C1".into()], vec!["".into()])
            .with_stocked_qty(4),
    ]
}

async fn seed<S: LedgerStore>(store: &S) {
    for product in catalog() {
        store.save_product(&product).await.unwrap();
    }
}

async fn open<S: LedgerStore>(store: Arc<S>) -> Session<S> {
    let config = ScanConfig::for_store(STORE);
    let cameras: fn() -> NoCamera = no_camera;
    let mut session = ScanSession::open(store, &config, LedgerKind::Sale, cameras)
        .await
        .unwrap();
    session.switch_input(InputMode::Manual).await.unwrap();
    session
}

async fn scan<S: LedgerStore>(session: &mut Session<S>, code: &str) -> ScanOutcome {
    assert!(session.submit_manual(code).unwrap());
    let mut updates = session.process_pending().await;
    assert_eq!(updates.len(), 1);
    match updates.remove(0) {
        SessionUpdate::Scan(report) => report.outcome,
        SessionUpdate::Fault(notice) => panic!("unexpected fault: {notice:?}"),
    }
}

async fn available<S: LedgerStore>(store: &S, product_id: &str) -> Option<i64> {
    store
        .get_inventory(product_id, STORE)
        .await
        .unwrap()
        .map(|r| r.available_qty)
}

async fn scan_commit_edit_delete<S: LedgerStore>(store: Arc<S>) {
    seed(store.as_ref()).await;
    let mut session = open(Arc::clone(&store)).await;

    // Scan A1: one line, quantity 1.
    assert!(matches!(scan(&mut session, "A1").await, ScanOutcome::Assigned { line: 0, .. }));
    assert_eq!(session.draft().lines()[0].codes(), ["A1", ""]);
    assert_eq!(session.draft().lines()[0].quantity, 1);

    // Scan A2: same product, same line.
    assert!(matches!(scan(&mut session, "a2").await, ScanOutcome::Assigned { line: 0, .. }));
    assert_eq!(session.draft().lines()[0].codes(), ["A1", "A2", ""]);
    assert_eq!(session.draft().lines()[0].tags(), ["64GB", "128GB", ""]);
    assert_eq!(session.draft().lines()[0].quantity, 2);

    // Scan B1: a second line, the first untouched.
    let first = session.draft().lines()[0].clone();
    assert!(matches!(scan(&mut session, "B1").await, ScanOutcome::Assigned { line: 1, .. }));
    assert_eq!(session.draft().lines().len(), 2);
    assert_eq!(session.draft().lines()[0], first);

    // Same code twice is refused.
    assert!(matches!(
        scan(&mut session, "A1").await,
        ScanOutcome::Rejected {
            rejection: ScanRejection::DuplicateInTransaction { .. }
        }
    ));

    // Unknown code is refused.
    assert!(matches!(
        scan(&mut session, "Z9").await,
        ScanOutcome::Rejected {
            rejection: ScanRejection::NotFound { .. }
        }
    ));

    // Remove A2 and scan it again: the line round-trips.
    session.remove_code_slot(0, 1).unwrap();
    assert_eq!(session.draft().lines()[0].codes(), ["A1", ""]);
    assert_eq!(session.draft().lines()[0].quantity, 1);
    scan(&mut session, "A2").await;
    assert_eq!(session.draft().lines()[0], first);

    // Commit: X -2, Y -1, Z untouched.
    let receipt = session.commit().await.unwrap();
    assert_eq!(receipt.line_ids.len(), 2);
    assert_eq!(session.state(), TransactionState::Committed);
    assert_eq!(available(store.as_ref(), "p-x").await, Some(3));
    assert_eq!(available(store.as_ref(), "p-y").await, Some(1));
    assert_eq!(available(store.as_ref(), "p-z").await, None);

    // Edit X 2 -> 5 takes 3 more, 5 -> 2 gives 3 back.
    let x_line = session
        .committed_lines()
        .iter()
        .find(|l| l.product_id == "p-x")
        .cloned()
        .unwrap();
    let edit = LineEdit::from_line(&x_line).with_quantity(5);
    session.edit_committed_line(&x_line.id, &edit).await.unwrap();
    assert_eq!(available(store.as_ref(), "p-x").await, Some(0));

    let edit = LineEdit::from_line(&x_line).with_quantity(2);
    session.edit_committed_line(&x_line.id, &edit).await.unwrap();
    assert_eq!(available(store.as_ref(), "p-x").await, Some(3));

    // Growing past what is on hand fails and changes nothing.
    let edit = LineEdit::from_line(&x_line).with_quantity(9);
    let err = session.edit_committed_line(&x_line.id, &edit).await.unwrap_err();
    assert!(matches!(err, SessionError::Core(CoreError::InsufficientStock { .. })));
    assert_eq!(available(store.as_ref(), "p-x").await, Some(3));

    // Delete Y restores its unit.
    let y_line = session
        .committed_lines()
        .iter()
        .find(|l| l.product_id == "p-y")
        .cloned()
        .unwrap();
    session.delete_committed_line(&y_line.id).await.unwrap();
    assert_eq!(available(store.as_ref(), "p-y").await, Some(2));
    assert_eq!(session.state(), TransactionState::Committed);

    // A committed code can no longer be sold, even from another session.
    session.new_transaction().unwrap();
    assert!(matches!(
        scan(&mut session, "A1").await,
        ScanOutcome::Rejected {
            rejection: ScanRejection::AlreadySold { .. }
        }
    ));

    let mut other = open(Arc::clone(&store)).await;
    assert!(matches!(
        scan(&mut other, "a2").await,
        ScanOutcome::Rejected {
            rejection: ScanRejection::AlreadySold { .. }
        }
    ));
    // B1 came back with the deleted line.
    assert!(matches!(scan(&mut other, "B1").await, ScanOutcome::Assigned { .. }));

    session.close().await;
    other.close().await;
}

async fn shortage_writes_nothing<S: LedgerStore>(store: Arc<S>) {
    seed(store.as_ref()).await;
    let mut session = open(Arc::clone(&store)).await;

    scan(&mut session, "C1").await;
    session.set_quantity(0, 7).unwrap();

    let err = session.commit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Core(CoreError::InsufficientStock { available: 4, requested: 7, .. })
    ));
    assert_eq!(session.state(), TransactionState::Draft);
    assert_eq!(available(store.as_ref(), "p-z").await, Some(4));
    assert!(store
        .codes_sold_among(STORE, &["C1".to_string()])
        .await
        .unwrap()
        .is_empty());

    // The draft is still editable and commits once the quantity fits.
    session.clear_quantity_override(0).unwrap();
    session.commit().await.unwrap();
    assert_eq!(available(store.as_ref(), "p-z").await, Some(3));
}

#[tokio::test]
async fn test_in_memory_scan_to_stock() {
    scan_commit_edit_delete(Arc::new(InMemoryStore::new())).await;
}

#[tokio::test]
async fn test_in_memory_shortage() {
    shortage_writes_nothing(Arc::new(InMemoryStore::new())).await;
}

#[tokio::test]
async fn test_sqlite_scan_to_stock() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    scan_commit_edit_delete(Arc::new(db)).await;
}

#[tokio::test]
async fn test_sqlite_shortage() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    shortage_writes_nothing(Arc::new(db)).await;
}
