//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │   StockBatch    │   │   Transaction   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  item_id (FK)   │   │  id (UUID)      │       │
//! │  │  code (business)│   │  quantity       │   │  user_id        │       │
//! │  │  quantity ★     │   │  in_stock_date  │   │  total_cents    │       │
//! │  │  price / cost   │   │  expiry_date    │   │  lines ─────────┼──┐    │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘  │    │
//! │                                                                    │    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐  │    │
//! │  │      User       │   │ OversellPolicy  │   │ TransactionLine │◄─┘    │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  capabilities   │   │  Clamp (default)│   │  item_name ❄    │       │
//! │  │  is_root_admin  │   │  Reject         │   │  unit_price ❄   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ★ authoritative on-hand count      ❄ frozen at sale time              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quantity vs. Batches
//! `Item::quantity` is the single source of truth for what is on hand.
//! Batches record arrivals only; sales never attribute consumption to a
//! batch and nothing recomputes `quantity` from batch sums.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Item
// =============================================================================

/// An item master record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business key, usually the barcode value.
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    /// Unit selling price in cents.
    pub price_cents: i64,

    /// Unit cost in cents (for revenue reporting).
    pub cost_cents: i64,

    /// Authoritative on-hand count, never negative.
    pub quantity: i64,

    /// When stock last arrived (creation or most recent restock).
    #[ts(as = "String")]
    pub in_stock_date: DateTime<Utc>,

    /// Nearest known expiry across all recorded batches.
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Per-unit margin at the current catalog price.
    #[inline]
    pub fn margin(&self) -> Money {
        self.price() - self.cost()
    }

    #[inline]
    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Whole days the current stock has been on the shelf as of `now`.
    pub fn shelf_age_days(&self, now: DateTime<Utc>) -> i64 {
        shelf_age_days(self.in_stock_date, now)
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewItem {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub price: Money,
    pub cost: Money,
    /// Opening quantity; also becomes the opening batch.
    pub quantity: i64,
}

/// Input for an administrative item edit. Overwrites every mutable field.
///
/// Writing `quantity` here bypasses the batch ledger on purpose: it is a
/// correction, not a stock event.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemUpdate {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub price: Money,
    pub cost: Money,
    pub quantity: i64,
}

// =============================================================================
// Stock Batch
// =============================================================================

/// One recorded arrival of stock for an item. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockBatch {
    pub id: String,
    pub item_id: String,
    /// Quantity received (never decremented by sales).
    pub quantity: i64,
    #[ts(as = "String")]
    pub in_stock_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

// =============================================================================
// Transaction
// =============================================================================

/// A recorded sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Acting user who rang up the sale.
    pub user_id: String,
    /// Σ unit_price × quantity over `lines`.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Line items in submission order.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<TransactionLine>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Total units across all lines.
    pub fn unit_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// A line item within a transaction.
///
/// Uses the snapshot pattern: `item_name` and `unit_price_cents` are copied
/// at sale time so receipts stay stable after the item is renamed, repriced,
/// or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionLine {
    pub id: String,
    pub transaction_id: String,
    /// 0-based position in the submitted checkout.
    pub line_no: i64,
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl TransactionLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// One line of a checkout request: which item, how many, at what price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub item_id: String,
    pub quantity: i64,
    /// Price entered at the register; frozen onto the line item.
    pub unit_price: Money,
}

impl CheckoutLine {
    pub fn new(item_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        CheckoutLine {
            item_id: item_id.into(),
            quantity,
            unit_price,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Σ unit_price × quantity, summed in insertion order.
///
/// Fails with `OutOfRange` instead of overflowing `i64` cents.
pub fn checkout_total(lines: &[CheckoutLine]) -> Result<Money, ValidationError> {
    let overflow = || ValidationError::OutOfRange {
        field: "transaction total".to_string(),
        min: 0,
        max: i64::MAX,
    };

    lines.iter().try_fold(Money::zero(), |total, line| {
        line.unit_price
            .checked_multiply_quantity(line.quantity)
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(overflow)
    })
}

// =============================================================================
// Oversell Policy
// =============================================================================

/// What checkout does when a line asks for more than is on hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OversellPolicy {
    /// Record the sale and floor the on-hand quantity at zero.
    #[default]
    Clamp,
    /// Abort the whole checkout with `InsufficientStock`.
    Reject,
}

impl fmt::Display for OversellPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OversellPolicy::Clamp => write!(f, "clamp"),
            OversellPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for OversellPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(OversellPolicy::Clamp),
            "reject" => Ok(OversellPolicy::Reject),
            other => Err(ValidationError::invalid_format(
                "oversell policy",
                format!("'{}' is not one of: clamp, reject", other),
            )),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A stored user. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub is_root_admin: bool,
    pub can_read: bool,
    pub can_transact: bool,
    pub can_view_revenue: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a (non-root) user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub can_read: bool,
    pub can_transact: bool,
    pub can_view_revenue: bool,
}

// =============================================================================
// Reports
// =============================================================================

/// Revenue aggregate for one sold item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemRevenue {
    pub item_id: String,
    pub item_name: String,
    /// Σ (line price − item cost) × quantity.
    pub revenue_cents: i64,
    pub quantity_sold: i64,
}

impl ItemRevenue {
    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }
}

/// An in-stock item with how long its current stock has sat on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShelfAgeEntry {
    pub item: Item,
    pub shelf_age_days: i64,
}

/// Whole days between `in_stock_date` and `now`, floored, never negative.
pub fn shelf_age_days(in_stock_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - in_stock_date).num_days().max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_item(quantity: i64) -> Item {
        let now = Utc::now();
        Item {
            id: "item-1".to_string(),
            code: "APL-001".to_string(),
            name: "Apple".to_string(),
            description: None,
            price_cents: 150,
            cost_cents: 100,
            quantity,
            in_stock_date: now,
            expiry_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_checkout_total_is_exact() {
        let lines = vec![
            CheckoutLine::new("a", 3, Money::from_cents(10)),
            CheckoutLine::new("b", 1, Money::from_cents(20)),
            CheckoutLine::new("c", 7, Money::from_cents(333)),
        ];
        assert_eq!(checkout_total(&lines).unwrap().cents(), 30 + 20 + 2331);
        assert_eq!(checkout_total(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_checkout_total_overflow_is_an_error() {
        let huge = vec![CheckoutLine::new("a", i64::MAX / 50, Money::from_cents(100))];
        assert!(matches!(
            checkout_total(&huge),
            Err(ValidationError::OutOfRange { .. })
        ));

        let summed = vec![
            CheckoutLine::new("a", 1, Money::from_cents(i64::MAX)),
            CheckoutLine::new("b", 1, Money::from_cents(1)),
        ];
        assert!(checkout_total(&summed).is_err());
    }

    #[test]
    fn test_item_money_accessors() {
        let item = sample_item(5);
        assert_eq!(item.price().cents(), 150);
        assert_eq!(item.margin().cents(), 50);
        assert!(item.is_in_stock());
        assert!(!sample_item(0).is_in_stock());
    }

    #[test]
    fn test_shelf_age_floors_partial_days() {
        let now = Utc::now();
        assert_eq!(shelf_age_days(now - Duration::hours(47), now), 1);
        assert_eq!(shelf_age_days(now - Duration::days(10), now), 10);
        assert_eq!(shelf_age_days(now, now), 0);
        assert_eq!(shelf_age_days(now + Duration::hours(5), now), 0);
    }

    #[test]
    fn test_oversell_policy_parsing() {
        assert_eq!(OversellPolicy::default(), OversellPolicy::Clamp);
        assert_eq!("Reject".parse::<OversellPolicy>().unwrap(), OversellPolicy::Reject);
        assert_eq!(" clamp ".parse::<OversellPolicy>().unwrap(), OversellPolicy::Clamp);
        assert!("block".parse::<OversellPolicy>().is_err());
        assert_eq!(OversellPolicy::Reject.to_string(), "reject");
    }

    #[test]
    fn test_transaction_line_total() {
        let line = TransactionLine {
            id: "l1".to_string(),
            transaction_id: "t1".to_string(),
            line_no: 0,
            item_id: "item-1".to_string(),
            item_name: "Apple".to_string(),
            quantity: 4,
            unit_price_cents: 125,
        };
        assert_eq!(line.line_total().cents(), 500);

        let tx = Transaction {
            id: "t1".to_string(),
            user_id: "u1".to_string(),
            total_cents: 500,
            created_at: Utc::now(),
            lines: vec![line],
        };
        assert_eq!(tx.unit_count(), 4);
        assert_eq!(tx.total().to_string(), "$5.00");
    }
}
