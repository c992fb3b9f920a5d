//! # Repository Module
//!
//! Database repository implementations for the ledger store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.transactions().checkout(&actor.id, &lines)                 │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                 │
//! │  ├── validates input (stockroom-core::validation)                      │
//! │  ├── opens one sqlx transaction for multi-statement writes             │
//! │  └── maps sqlx errors into DbError                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - Item catalog CRUD and search
//! - [`batch::BatchRepository`] - Restocks and the batch ledger
//! - [`transaction::TransactionRepository`] - Atomic checkout and history
//! - [`report::ReportRepository`] - Revenue, shelf age, low stock
//! - [`user::UserRepository`] - Users, capabilities, root admin

use uuid::Uuid;

pub mod batch;
pub mod item;
pub mod report;
pub mod transaction;
pub mod user;

/// Generates a new surrogate key (UUID v4).
pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims an optional free-text field; blank becomes `None`.
pub(crate) fn normalize_optional(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
