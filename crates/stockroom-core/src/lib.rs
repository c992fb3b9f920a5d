//! # stockroom-core: Pure Inventory Logic for Stockroom
//!
//! This crate holds the domain types and rules of the inventory ledger as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Presentation (desktop / web, not in workspace)       │   │
//! │  │    Catalog UI ──► Restock UI ──► Checkout UI ──► Reports UI     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ direct async calls                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   actor   │  │ validation│  │   │
//! │  │   │   Item    │  │   Money   │  │   Actor   │  │   rules   │  │   │
//! │  │   │   Batch   │  │  parsing  │  │Capability │  │   dates   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockroom-db (Ledger Store)                    │   │
//! │  │        SQLite queries, migrations, checkout transactions        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, StockBatch, Transaction, User, reports)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`actor`] - Verified actor and capability checks
//! - [`error`] - Validation and scan error types
//! - [`validation`] - Input validation and date parsing
//! - [`scan`] - Ordered barcode decoder chain
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::money::Money;
//! use stockroom_core::types::{checkout_total, CheckoutLine};
//!
//! let lines = vec![
//!     CheckoutLine::new("apple", 2, Money::from_cents(150)),
//!     CheckoutLine::new("pear", 3, Money::from_cents(99)),
//! ];
//!
//! assert_eq!(checkout_total(&lines).unwrap().cents(), 597);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actor;
pub mod error;
pub mod money;
pub mod scan;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use actor::{Actor, Capability};
pub use error::{ScanError, ValidationError};
pub use money::Money;
pub use scan::{CodeDecoder, DecoderChain};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default number of transactions shown by "recent transactions" views.
pub const DEFAULT_RECENT_LIMIT: i64 = 50;

/// Default threshold below which an item counts as low on stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Largest quantity a single checkout line or restock may carry.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;

/// Largest on-hand quantity an item may reach.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000_000;

/// Largest unit price or cost, in cents ($1,000,000.00).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;
