//! # Repository Module
//!
//! Database repository implementations for Stockscan.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Session layer (LedgerStore for Database)                               │
//! │       │                                                                 │
//! │       │  db.ledger().codes_sold_among("store-1", &codes)                │
//! │       ▼                                                                 │
//! │  ProductRepository     list_by_store / find_by_code / insert / update   │
//! │  InventoryRepository   get / insert_if_absent / upsert / CAS            │
//! │  LedgerRepository      insert_lines / update_line / delete_line /       │
//! │                        codes_sold_among                                 │
//! │       │                                                                 │
//! │       │  encode_list / decode_units at this boundary only               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod inventory;
pub mod ledger;
pub mod product;
