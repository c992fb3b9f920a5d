//! # Report Repository
//!
//! Read-only aggregates over the catalog and the sales history.
//!
//! ## Revenue
//! ```text
//! revenue(item) = Σ over its sold lines of (line unit price − item cost) × qty
//! ```
//! The line price is the one frozen at sale time; the cost is the item's
//! current catalog cost. Lines whose item has been deleted drop out of the
//! inner join.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use stockroom_core::{shelf_age_days, Item, ItemRevenue, ShelfAgeEntry};

use crate::error::DbResult;

/// Repository for read-only reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue and units sold per item, highest revenue first.
    ///
    /// Items never sold are omitted. Ties are ordered by name.
    pub async fn revenue_by_item(&self) -> DbResult<Vec<ItemRevenue>> {
        debug!("Computing revenue by item");

        let rows = sqlx::query_as::<_, ItemRevenue>(
            r#"
            SELECT
                i.id AS item_id,
                i.name AS item_name,
                SUM((ti.unit_price_cents - i.cost_cents) * ti.quantity) AS revenue_cents,
                SUM(ti.quantity) AS quantity_sold
            FROM transaction_items ti
            INNER JOIN items i ON i.id = ti.item_id
            GROUP BY i.id, i.name
            ORDER BY revenue_cents DESC, i.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// In-stock items, longest on the shelf first.
    pub async fn oldest_on_shelf(&self) -> DbResult<Vec<ShelfAgeEntry>> {
        self.oldest_on_shelf_as_of(Utc::now()).await
    }

    /// [`oldest_on_shelf`](Self::oldest_on_shelf) with an explicit clock.
    pub async fn oldest_on_shelf_as_of(&self, now: DateTime<Utc>) -> DbResult<Vec<ShelfAgeEntry>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            FROM items
            WHERE quantity > 0
            ORDER BY in_stock_date ASC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items
            .into_iter()
            .map(|item| ShelfAgeEntry {
                shelf_age_days: shelf_age_days(item.in_stock_date, now),
                item,
            })
            .collect())
    }

    /// Items with fewer than `threshold` units on hand, emptiest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Item>> {
        debug!(threshold, "Listing low stock items");

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            FROM items
            WHERE quantity < ?1
            ORDER BY quantity ASC, name
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
