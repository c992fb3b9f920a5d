//! # Batch Repository
//!
//! Restocks and the append-only batch ledger.
//!
//! ## Restock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  restock(item, +24, expiry 2026-12-01)                                 │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    UPDATE items SET quantity = quantity + 24,   ← relative, no read    │
//! │                     (only while it stays <= MAX_STOCK_LEVEL)           │
//! │                     in_stock_date = now,                               │
//! │                     expiry_date = earlier of (current, 2026-12-01)     │
//! │    INSERT item_stock (24, now, 2026-12-01)                             │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Batches are informational: sales decrement `items.quantity` only and
//! never touch a batch row.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use stockroom_core::validation::validate_quantity;
use stockroom_core::{StockBatch, ValidationError, MAX_STOCK_LEVEL};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

/// Repository for stock batches.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Records an arrival of `quantity` units for an item.
    ///
    /// ## Arguments
    /// * `item_id` - Item receiving stock
    /// * `quantity` - Units received, must be > 0
    /// * `expiry` - Expiry of this batch; lowers the item's nearest expiry
    ///   when earlier
    ///
    /// ## Returns
    /// * `Ok(StockBatch)` - The appended batch
    /// * `Err(DbError::NotFound)` - Unknown item (nothing written)
    /// * `Err(DbError::Validation)` - Quantity out of range, or the restock
    ///   would push the item past `MAX_STOCK_LEVEL`
    pub async fn restock(
        &self,
        item_id: &str,
        quantity: i64,
        expiry: Option<NaiveDate>,
    ) -> DbResult<StockBatch> {
        validate_quantity(quantity)?;

        debug!(item_id = %item_id, quantity, expiry = ?expiry, "Restocking item");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE items SET
                quantity = quantity + ?2,
                in_stock_date = ?3,
                updated_at = ?3,
                expiry_date = CASE
                    WHEN ?4 IS NOT NULL AND (expiry_date IS NULL OR ?4 < expiry_date) THEN ?4
                    ELSE expiry_date
                END
            WHERE id = ?1 AND quantity <= ?5 - ?2
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(now)
        .bind(expiry)
        .bind(MAX_STOCK_LEVEL)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let on_hand = sqlx::query_scalar::<_, i64>("SELECT quantity FROM items WHERE id = ?1")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;

            return Err(match on_hand {
                Some(on_hand) => {
                    debug!(item_id = %item_id, on_hand, quantity, "Restock exceeds stock ceiling");
                    ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: 0,
                        max: MAX_STOCK_LEVEL,
                    }
                    .into()
                }
                None => DbError::not_found("Item", item_id),
            });
        }

        let batch = StockBatch {
            id: generate_id(),
            item_id: item_id.to_string(),
            quantity,
            in_stock_date: now,
            expiry_date: expiry,
        };

        sqlx::query(
            r#"
            INSERT INTO item_stock (id, item_id, quantity, in_stock_date, expiry_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.item_id)
        .bind(batch.quantity)
        .bind(batch.in_stock_date)
        .bind(batch.expiry_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(item_id = %item_id, batch_id = %batch.id, quantity, "Item restocked");
        Ok(batch)
    }

    /// Lists an item's batches, oldest arrival first.
    ///
    /// Unknown items simply have no batches.
    pub async fn list(&self, item_id: &str) -> DbResult<Vec<StockBatch>> {
        let batches = sqlx::query_as::<_, StockBatch>(
            r#"
            SELECT id, item_id, quantity, in_stock_date, expiry_date
            FROM item_stock
            WHERE item_id = ?1
            ORDER BY in_stock_date ASC, rowid ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// The item's authoritative on-hand quantity.
    ///
    /// Reads `items.quantity`; it is never re-aggregated from batches.
    pub async fn current_quantity(&self, item_id: &str) -> DbResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT quantity FROM items WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::test_support::{create_item, memory_db};
    use stockroom_core::validation::parse_expiry_date;

    fn date(s: &str) -> Option<NaiveDate> {
        parse_expiry_date(s).unwrap()
    }

    #[tokio::test]
    async fn test_restock_adds_exactly_n_and_appends_batch() {
        let db = memory_db().await;
        let item = create_item(&db, "Milk", "MILK-1L", 129, 90, 6).await;

        let batch = db
            .batches()
            .restock(&item.id, 24, date("2026-12-01"))
            .await
            .unwrap();

        assert_eq!(batch.quantity, 24);
        assert_eq!(db.batches().current_quantity(&item.id).await.unwrap(), 30);

        let batches = db.batches().list(&item.id).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].quantity, 6);
        assert_eq!(batches[1], batch);

        let reloaded = db.items().get_by_id(&item.id).await.unwrap();
        assert_eq!(reloaded.in_stock_date, batch.in_stock_date);
        assert!(reloaded.in_stock_date >= item.in_stock_date);
    }

    #[tokio::test]
    async fn test_restock_rejects_non_positive_quantity() {
        let db = memory_db().await;
        let item = create_item(&db, "Milk", "MILK-1L", 129, 90, 6).await;

        for qty in [0, -1] {
            let err = db.batches().restock(&item.id, qty, None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        assert_eq!(db.batches().current_quantity(&item.id).await.unwrap(), 6);
        assert_eq!(db.batches().list(&item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restock_stops_at_stock_ceiling() {
        let db = memory_db().await;
        let item = create_item(&db, "Rice", "RICE-5KG", 599, 380, MAX_STOCK_LEVEL - 5).await;

        let err = db
            .batches()
            .restock(&item.id, i64::MAX / 50, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db.batches().restock(&item.id, 10, None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(
            db.batches().current_quantity(&item.id).await.unwrap(),
            MAX_STOCK_LEVEL - 5
        );
        assert_eq!(db.batches().list(&item.id).await.unwrap().len(), 1);

        db.batches().restock(&item.id, 5, None).await.unwrap();
        assert_eq!(
            db.batches().current_quantity(&item.id).await.unwrap(),
            MAX_STOCK_LEVEL
        );
    }

    #[tokio::test]
    async fn test_restock_unknown_item_writes_nothing() {
        let db = memory_db().await;

        let err = db.batches().restock("ghost", 5, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item_stock")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_restock_keeps_nearest_expiry() {
        let db = memory_db().await;
        let item = create_item(&db, "Yogurt", "YOG-1", 89, 40, 0).await;
        let batches = db.batches();

        batches.restock(&item.id, 5, date("2026-12-01")).await.unwrap();
        batches.restock(&item.id, 5, date("2027-03-01")).await.unwrap();
        batches.restock(&item.id, 5, None).await.unwrap();
        assert_eq!(
            db.items().get_by_id(&item.id).await.unwrap().expiry_date,
            date("2026-12-01")
        );

        batches.restock(&item.id, 5, date("2026-11-15")).await.unwrap();
        assert_eq!(
            db.items().get_by_id(&item.id).await.unwrap().expiry_date,
            date("2026-11-15")
        );

        // every batch keeps its own expiry
        let listed = batches.list(&item.id).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert_eq!(listed[2].expiry_date, date("2027-03-01"));
        assert_eq!(listed[3].expiry_date, None);
    }

    #[tokio::test]
    async fn test_current_quantity_unknown_item() {
        let db = memory_db().await;
        let err = db.batches().current_quantity("ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_concurrent_restocks_are_not_lost() {
        let db = memory_db().await;
        let item = create_item(&db, "Bread", "BRD-1", 250, 120, 0).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let id = item.id.clone();
            handles.push(tokio::spawn(async move {
                db.batches().restock(&id, 3, None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(db.batches().current_quantity(&item.id).await.unwrap(), 24);
        assert_eq!(db.batches().list(&item.id).await.unwrap().len(), 9);
    }
}
