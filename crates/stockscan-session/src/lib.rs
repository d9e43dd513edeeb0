//! # stockscan-session: Scan Session Runtime
//!
//! The async layer that turns hardware input into draft lines and committed
//! lines into stock movements.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────┐  ┌────────────────┐  ┌────────────┐                       │
//! │  │  Camera  │  │ Keyboard wedge │  │   Manual   │   one live at a time  │
//! │  └────┬─────┘  └───────┬────────┘  └─────┬──────┘                       │
//! │       └────────────────┼─────────────────┘                              │
//! │                        ▼                                                │
//! │              mpsc<InputEvent>  (arrival order)                          │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │ ScanSession                                                      │   │
//! │  │   SoldUnitCache ─► resolver ─► draft ─► quantity::sync           │   │
//! │  │   commit / edit / delete ─► StockLedger                          │   │
//! │  └───────────────────────────────┬──────────────────────────────────┘   │
//! │                                  ▼                                      │
//! │                    LedgerStore (SQLite or in-memory)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Scan configuration (defaults < TOML < environment)
//! - [`error`] - Session errors and operator notices
//! - [`store`] - The persistence collaborator trait
//! - [`memory`] - In-memory store
//! - [`cache`] - Sold-Unit Cache
//! - [`ledger`] - Stock Ledger Updater
//! - [`input`] - Input arbitration (camera, keyboard wedge, manual)
//! - [`session`] - The scan session orchestrator
//! - [`catalog`] - Catalog mode (editing a product's unit codes)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stockscan_core::LedgerKind;
//! use stockscan_session::input::{InputMode, NoCamera};
//! use stockscan_session::{ScanConfig, ScanSession};
//! use stockscan_db::Database;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::load_or_default(None);
//! let db = Database::new(config.db_config()).await?;
//!
//! let store = Arc::new(db);
//! let mut session = ScanSession::open(store, &config, LedgerKind::Sale, || NoCamera).await?;
//! session.switch_input(InputMode::Manual).await?;
//! session.submit_manual("356938035643809")?;
//! for update in session.process_pending().await {
//!     println!("{update:?}");
//! }
//! session.commit().await?;
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod input;
pub mod ledger;
pub mod memory;
pub mod session;
pub mod store;

pub use cache::SoldUnitCache;
pub use catalog::{CatalogScan, CatalogSession};
pub use config::ScanConfig;
pub use error::{OperatorNotice, SessionError, SessionResult};
pub use ledger::{CommitReceipt, StockLedger};
pub use memory::InMemoryStore;
pub use session::{ScanOutcome, ScanReport, ScanSession, SessionUpdate};
pub use store::LedgerStore;
