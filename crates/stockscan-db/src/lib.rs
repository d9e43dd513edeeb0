//! # stockscan-db: Database Layer for Stockscan
//!
//! SQLite persistence for products, inventory counters and the committed
//! sale/debt ledger, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockscan Data Flow                              │
//! │                                                                         │
//! │  ScanSession (stockscan-session)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockscan-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │    Repositories    │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ ProductRepository  │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepository│  │ 001_init   │  │   │
//! │  │   │               │    │ LedgerRepository   │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (stockscan.db)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, inventory and ledger repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockscan_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/stockscan.db")).await?;
//!
//! let owner = db.products().find_by_code("store-1", "356938035643809").await?;
//! let sold = db.ledger().codes_sold_among("store-1", &codes).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::inventory::InventoryRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
