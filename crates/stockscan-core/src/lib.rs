//! # stockscan-core: Pure Scan Reconciliation Logic
//!
//! This crate is the **heart** of Stockscan. It decides what happens to a
//! scanned unit code and how stock counters must move, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockscan Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          stockscan-session (tokio runtime layer)                │   │
//! │  │   camera / keyboard burst / manual ──► ScanEvent queue          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ one event at a time                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockscan-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │   │
//! │  │   │ resolver │─►│  draft   │─►│ quantity │  │    stock     │   │   │
//! │  │   │ decide   │  │ lines +  │  │ sync     │  │ plan commit/ │   │   │
//! │  │   │ where    │  │ slots    │  │          │  │ edit/delete  │   │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockscan-db (SQLite via sqlx)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, InventoryRecord, CommittedLine, ScanEvent)
//! - [`codes`] - Unit code normalization and the comma-delimited storage codec
//! - [`money`] - Integer-cents money type
//! - [`error`] - Domain error types and scan rejections
//! - [`validation`] - Field and product validation
//! - [`keystroke`] - Keystroke-burst buffer for external hardware scanners
//! - [`retry`] - Bounded retry state for scanner initialization
//! - [`resolver`] - Code Resolver (scan → disposition)
//! - [`draft`] - Line Assignment Engine (draft transaction transitions)
//! - [`quantity`] - Quantity Synchronizer
//! - [`stock`] - Stock adjustment planning and transaction lifecycle
//! - [`catalog`] - Product catalog code editing
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashSet;
//! use stockscan_core::draft::DraftTransaction;
//! use stockscan_core::resolver::resolve;
//! use stockscan_core::types::{LedgerKind, Product, ScanEvent, ScanSource};
//!
//! let phone = Product::new("p-1", "store-1", "Phone X", 49_900)
//!     .with_units(vec!["A1".into(), "A2".into()], vec![String::new(), String::new()]);
//! let catalog = vec![phone];
//! let sold: HashSet<String> = HashSet::new();
//!
//! let draft = DraftTransaction::new(LedgerKind::Sale);
//! let scan = ScanEvent::new("a1", ScanSource::Manual);
//!
//! let decision = resolve(&scan, &draft, &catalog, &sold).unwrap();
//! let draft = draft.apply_resolution(decision).unwrap();
//!
//! assert_eq!(draft.lines()[0].codes(), ["A1", ""]);
//! assert_eq!(draft.lines()[0].quantity, 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod codes;
pub mod draft;
pub mod error;
pub mod keystroke;
pub mod money;
pub mod quantity;
pub mod resolver;
pub mod retry;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ScanRejection, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Delimiter used when unit code and tag lists are stored as one string.
///
/// The delimiter is never escaped, so codes and tags must not contain it.
pub const LIST_DELIMITER: char = ',';

/// Largest gap between two keystrokes that still counts as a scanner burst.
///
/// ## Business Reason
/// Hardware scanners type a whole code in a few milliseconds. Anything slower
/// is a person typing and must not be mistaken for a scan.
pub const MAX_KEY_GAP_MS: u64 = 50;

/// Attempt ceiling for camera/scanner initialization before the failure is fatal.
pub const MAX_SCANNER_INIT_ATTEMPTS: u32 = 5;

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering when the quantity is typed by hand.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum length of a single unit code.
pub const MAX_CODE_LEN: usize = 64;
