//! # Item Repository
//!
//! Database operations for the item catalog.
//!
//! ## Key Operations
//! - Create with an opening batch (one transaction)
//! - Lookup by id or by code (barcode value)
//! - Case-insensitive substring search over name and code
//! - Administrative edits that bypass the batch ledger
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator types: "cola"                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pattern = "%cola%"  (% _ \ in the query are escaped)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  name LIKE pattern OR code LIKE pattern   (ASCII case-insensitive)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COKE-330 | Coca-Cola 330ml   ← MATCH                                  │
//! │  PEPSI-1  | Pepsi Cola 1L     ← MATCH                                  │
//! │  WTR-500  | Water 500ml                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use stockroom_core::validation::{
    contains_pattern, validate_item_code, validate_item_name, validate_amount,
    validate_search_query, validate_stock_level,
};
use stockroom_core::{Item, ItemUpdate, NewItem};

use crate::error::{DbError, DbResult};
use crate::repository::{generate_id, normalize_optional};

/// Repository for item catalog operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Creates an item and its opening stock batch.
    ///
    /// ## What This Does
    /// ```text
    /// BEGIN
    ///   INSERT items       (quantity = opening quantity, in_stock_date = now)
    ///   INSERT item_stock  (same quantity, same date)
    /// COMMIT
    /// ```
    ///
    /// ## Returns
    /// * `Ok(Item)` - The item as stored
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    /// * `Err(DbError::Validation)` - Bad name, code, price, cost or quantity
    pub async fn create(&self, new: &NewItem) -> DbResult<Item> {
        validate_item_name(&new.name)?;
        validate_item_code(&new.code)?;
        validate_amount("price", new.price)?;
        validate_amount("cost", new.cost)?;
        validate_stock_level(new.quantity)?;

        let id = generate_id();
        let code = new.code.trim();
        let now = Utc::now();

        debug!(code = %code, quantity = new.quantity, "Creating item");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(code)
        .bind(new.name.trim())
        .bind(normalize_optional(new.description.as_deref()))
        .bind(new.price.cents())
        .bind(new.cost.cents())
        .bind(new.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(code))?;

        sqlx::query(
            r#"
            INSERT INTO item_stock (id, item_id, quantity, in_stock_date, expiry_date)
            VALUES (?1, ?2, ?3, ?4, NULL)
            "#,
        )
        .bind(generate_id())
        .bind(&id)
        .bind(new.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, code = %code, "Item created");
        self.get_by_id(&id).await
    }

    /// Gets an item by its id.
    ///
    /// ## Returns
    /// * `Ok(Item)` - Item found
    /// * `Err(DbError::NotFound)` - No such item
    pub async fn get_by_id(&self, id: &str) -> DbResult<Item> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Item", id))
    }

    /// Gets an item by its code (exact match, surrounding whitespace ignored).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Item> {
        let code = code.trim();

        sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            FROM items
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Item", code))
    }

    /// Searches items whose name or code contains `query`.
    ///
    /// ## Behavior
    /// - Case-insensitive for ASCII letters
    /// - `%` and `_` in the query match literally
    /// - Empty or whitespace-only query lists every item
    /// - Ordered by name ascending
    ///
    /// ## Example
    /// ```rust,ignore
    /// let colas = repo.search("cola").await?;
    /// let everything = repo.search("").await?;
    /// ```
    pub async fn search(&self, query: &str) -> DbResult<Vec<Item>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, "Searching items");

        if query.is_empty() {
            return self.list().await;
        }

        let pattern = contains_pattern(&query);

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            FROM items
            WHERE name LIKE ?1 ESCAPE '\'
               OR code LIKE ?1 ESCAPE '\'
            ORDER BY name, code
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Search returned items");
        Ok(items)
    }

    /// Lists every item ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, code, name, description,
                price_cents, cost_cents, quantity,
                in_stock_date, expiry_date, created_at, updated_at
            FROM items
            ORDER BY name, code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Overwrites every mutable field of an item.
    ///
    /// The quantity written here is a correction; no batch is recorded.
    ///
    /// ## Returns
    /// * `Ok(Item)` - The updated item
    /// * `Err(DbError::NotFound)` - No such item
    /// * `Err(DbError::UniqueViolation)` - New code belongs to another item
    pub async fn update(&self, id: &str, update: &ItemUpdate) -> DbResult<Item> {
        validate_item_name(&update.name)?;
        validate_item_code(&update.code)?;
        validate_amount("price", update.price)?;
        validate_amount("cost", update.cost)?;
        validate_stock_level(update.quantity)?;

        let code = update.code.trim();

        debug!(id = %id, code = %code, "Updating item");

        let result = sqlx::query(
            r#"
            UPDATE items SET
                code = ?2,
                name = ?3,
                description = ?4,
                price_cents = ?5,
                cost_cents = ?6,
                quantity = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(update.name.trim())
        .bind(normalize_optional(update.description.as_deref()))
        .bind(update.price.cents())
        .bind(update.cost.cents())
        .bind(update.quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        self.get_by_id(id).await
    }

    /// Hard-deletes an item.
    ///
    /// Its batches are removed by `ON DELETE CASCADE`. Transaction lines
    /// that sold it stay untouched and keep their name snapshot.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting item");

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        info!(id = %id, "Item deleted");
        Ok(())
    }

    /// Overwrites the on-hand quantity (stock-take correction).
    pub async fn set_quantity(&self, id: &str, quantity: i64) -> DbResult<()> {
        validate_stock_level(quantity)?;

        debug!(id = %id, quantity, "Setting item quantity");

        let result = sqlx::query("UPDATE items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Counts items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::test_support::{create_item, memory_db, new_item};
    use stockroom_core::Money;

    fn codes(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let db = memory_db().await;
        let mut input = new_item("Apple", "APL-001", 150, 100, 12);
        input.description = Some("  Gala  ".to_string());

        let created = db.items().create(&input).await.unwrap();
        let fetched = db.items().get_by_id(&created.id).await.unwrap();

        assert_eq!(fetched.name, "Apple");
        assert_eq!(fetched.code, "APL-001");
        assert_eq!(fetched.description.as_deref(), Some("Gala"));
        assert_eq!(fetched.price(), Money::from_cents(150));
        assert_eq!(fetched.cost(), Money::from_cents(100));
        assert_eq!(fetched.quantity, 12);
        assert!(fetched.expiry_date.is_none());

        let batches = db.batches().list(&created.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity, 12);
        assert_eq!(batches[0].in_stock_date, fetched.in_stock_date);
    }

    #[tokio::test]
    async fn test_create_zero_quantity_still_records_opening_batch() {
        let db = memory_db().await;
        let item = create_item(&db, "Pear", "PEAR", 99, 50, 0).await;

        assert!(!item.is_in_stock());
        let batches = db.batches().list(&item.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity, 0);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let db = memory_db().await;
        create_item(&db, "Apple", "APL-001", 150, 100, 5).await;

        let err = db
            .items()
            .create(&new_item("Green Apple", "APL-001", 160, 100, 5))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "items.code");
                assert_eq!(value, "APL-001");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
        assert_eq!(db.items().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = memory_db().await;
        let repo = db.items();

        for bad in [
            new_item("", "A1", 100, 50, 1),
            new_item("Apple", "", 100, 50, 1),
            new_item("Apple", "A 1", 100, 50, 1),
            new_item("Apple", "A1", -1, 50, 1),
            new_item("Apple", "A1", 100, -5, 1),
            new_item("Apple", "A1", 100, 50, -1),
        ] {
            let err = repo.create(&bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let db = memory_db().await;
        assert_eq!(
            db.items().get_by_id("nope").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.items().get_by_code("nope").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_get_by_code_ignores_surrounding_whitespace() {
        let db = memory_db().await;
        let item = create_item(&db, "Apple", "APL-001", 150, 100, 5).await;
        let found = db.items().get_by_code(" APL-001\n").await.unwrap();
        assert_eq!(found.id, item.id);
    }

    #[tokio::test]
    async fn test_search() {
        let db = memory_db().await;
        create_item(&db, "Coca-Cola 330ml", "COKE-330", 120, 60, 10).await;
        create_item(&db, "Pepsi Cola 1L", "PEPSI-1", 220, 110, 10).await;
        create_item(&db, "Water 500ml", "WTR-500", 80, 20, 10).await;
        create_item(&db, "50% Off Bin", "BIN_1", 10, 5, 1).await;

        let repo = db.items();

        // empty lists everything, ordered by name
        let all = repo.search("   ").await.unwrap();
        assert_eq!(codes(&all), vec!["BIN_1", "COKE-330", "PEPSI-1", "WTR-500"]);

        // case-insensitive on name
        let colas = repo.search("COLA").await.unwrap();
        assert_eq!(codes(&colas), vec!["COKE-330", "PEPSI-1"]);

        // matches code too
        assert_eq!(codes(&repo.search("wtr").await.unwrap()), vec!["WTR-500"]);

        // wildcards are literal
        assert_eq!(codes(&repo.search("50%").await.unwrap()), vec!["BIN_1"]);
        assert_eq!(codes(&repo.search("N_1").await.unwrap()), vec!["BIN_1"]);
        assert!(repo.search("%").await.unwrap().len() == 1);

        assert!(repo.search("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites_fields_but_not_batches() {
        let db = memory_db().await;
        let item = create_item(&db, "Apple", "APL-001", 150, 100, 5).await;

        let updated = db
            .items()
            .update(
                &item.id,
                &ItemUpdate {
                    name: "Red Apple".to_string(),
                    code: "APL-RED".to_string(),
                    description: Some("crisp".to_string()),
                    price: Money::from_cents(175),
                    cost: Money::from_cents(110),
                    quantity: 40,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Red Apple");
        assert_eq!(updated.code, "APL-RED");
        assert_eq!(updated.price_cents, 175);
        assert_eq!(updated.quantity, 40);
        assert!(updated.updated_at >= item.updated_at);
        assert_eq!(updated.in_stock_date, item.in_stock_date);
        assert_eq!(db.batches().list(&item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let db = memory_db().await;
        let apple = create_item(&db, "Apple", "APL-001", 150, 100, 5).await;
        create_item(&db, "Pear", "PEAR-001", 120, 80, 5).await;

        let change = ItemUpdate {
            name: "Apple".to_string(),
            code: "PEAR-001".to_string(),
            description: None,
            price: Money::from_cents(150),
            cost: Money::from_cents(100),
            quantity: 5,
        };

        let err = db.items().update(&apple.id, &change).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = db.items().update("missing", &change).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_cascades_batches() {
        let db = memory_db().await;
        let item = create_item(&db, "Apple", "APL-001", 150, 100, 5).await;
        db.batches().restock(&item.id, 10, None).await.unwrap();

        db.items().delete(&item.id).await.unwrap();

        assert_eq!(
            db.items().get_by_id(&item.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(db.batches().list(&item.id).await.unwrap().is_empty());
        assert_eq!(
            db.items().delete(&item.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_set_quantity() {
        let db = memory_db().await;
        let item = create_item(&db, "Apple", "APL-001", 150, 100, 5).await;

        db.items().set_quantity(&item.id, 42).await.unwrap();
        assert_eq!(db.items().get_by_id(&item.id).await.unwrap().quantity, 42);

        let err = db.items().set_quantity(&item.id, -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db.items().set_quantity("missing", 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
