//! # Transaction Repository
//!
//! Atomic checkout and the immutable sales history.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Checkout (one sqlx transaction)                   │
//! │                                                                         │
//! │  validate lines ──► total = Σ unit_price × qty (integer cents)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │    INSERT transactions header          ← first statement is a write    │
//! │    for each line, in order:                                            │
//! │      INSERT transaction_items SELECT name FROM items  (snapshot)       │
//! │        └── 0 rows? unknown item → NotFound, rollback                   │
//! │      UPDATE items SET quantity = MAX(0, quantity - n)      (Clamp)     │
//! │                   or quantity - n WHERE quantity >= n       (Reject)   │
//! │        └── 0 rows under Reject → InsufficientStock, rollback           │
//! │  COMMIT                                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reload header + lines                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every decrement is a single relative statement, so concurrent checkouts
//! against the same item never lose an update. Dropping the `sqlx`
//! transaction without commit rolls everything back.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use stockroom_core::validation::{validate_actor_id, validate_amount, validate_quantity};
use stockroom_core::{
    checkout_total, CheckoutLine, OversellPolicy, Transaction, TransactionLine, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

/// Repository for transactions and their line items.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    oversell_policy: OversellPolicy,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository with the given oversell policy.
    pub fn new(pool: SqlitePool, oversell_policy: OversellPolicy) -> Self {
        TransactionRepository {
            pool,
            oversell_policy,
        }
    }

    /// Records a sale and decrements stock, all or nothing.
    ///
    /// ## Arguments
    /// * `actor_id` - Verified id of the user ringing up the sale
    /// * `lines` - Items, quantities and register prices, in order
    ///
    /// ## Returns
    /// * `Ok(Transaction)` - The stored transaction with its lines
    /// * `Err(DbError::Validation)` - Empty sale, empty actor, bad quantity
    ///   or price, or `InsufficientStock` under the reject policy
    /// * `Err(DbError::NotFound)` - A line references an unknown item
    ///
    /// On any error nothing is written.
    pub async fn checkout(&self, actor_id: &str, lines: &[CheckoutLine]) -> DbResult<Transaction> {
        if lines.is_empty() {
            return Err(ValidationError::EmptyTransaction.into());
        }
        validate_actor_id(actor_id)?;
        for line in lines {
            validate_quantity(line.quantity)?;
            validate_amount("unit price", line.unit_price)?;
        }

        let id = generate_id();
        let total = checkout_total(lines)?;
        let now = Utc::now();

        debug!(
            id = %id,
            actor_id = %actor_id,
            lines = lines.len(),
            total = %total,
            policy = %self.oversell_policy,
            "Starting checkout"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, total_cents, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&id)
        .bind(actor_id)
        .bind(total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in lines.iter().enumerate() {
            let inserted = sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, line_no, item_id, item_name, quantity, unit_price_cents
                )
                SELECT ?1, ?2, ?3, id, name, ?4, ?5
                FROM items
                WHERE id = ?6
                "#,
            )
            .bind(generate_id())
            .bind(&id)
            .bind(line_no as i64)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(&line.item_id)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                debug!(item_id = %line.item_id, line_no, "Checkout references unknown item");
                return Err(DbError::not_found("Item", &line.item_id));
            }

            self.decrement(&mut tx, line).await?;
        }

        tx.commit().await?;

        info!(id = %id, actor_id = %actor_id, total = %total, "Checkout committed");
        self.get_by_id(&id).await
    }

    /// Applies one line's stock decrement according to the oversell policy.
    async fn decrement(
        &self,
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        line: &CheckoutLine,
    ) -> DbResult<()> {
        let now = Utc::now();

        match self.oversell_policy {
            OversellPolicy::Clamp => {
                sqlx::query(
                    r#"
                    UPDATE items
                    SET quantity = MAX(0, quantity - ?2), updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(&line.item_id)
                .bind(line.quantity)
                .bind(now)
                .execute(&mut **tx)
                .await?;
            }
            OversellPolicy::Reject => {
                let result = sqlx::query(
                    r#"
                    UPDATE items
                    SET quantity = quantity - ?2, updated_at = ?3
                    WHERE id = ?1 AND quantity >= ?2
                    "#,
                )
                .bind(&line.item_id)
                .bind(line.quantity)
                .bind(now)
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    let available: i64 =
                        sqlx::query_scalar("SELECT quantity FROM items WHERE id = ?1")
                            .bind(&line.item_id)
                            .fetch_one(&mut **tx)
                            .await?;

                    warn!(
                        item_id = %line.item_id,
                        available,
                        requested = line.quantity,
                        "Rejecting oversell"
                    );

                    return Err(ValidationError::InsufficientStock {
                        item_id: line.item_id.clone(),
                        available,
                        requested: line.quantity,
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Gets a transaction with its lines in submission order.
    ///
    /// Line names come from the snapshot taken at sale time, so they are
    /// stable across later renames and deletions.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Transaction> {
        let mut transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, total_cents, created_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Transaction", id))?;

        transaction.lines = sqlx::query_as::<_, TransactionLine>(
            r#"
            SELECT id, transaction_id, line_no, item_id, item_name, quantity, unit_price_cents
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Lists the most recent transactions, newest first, with lines loaded.
    ///
    /// Ties on `created_at` are broken by insertion order (newest first).
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Transaction>> {
        self.load_recent(None, limit).await
    }

    /// Same as [`list_recent`](Self::list_recent), filtered by acting user.
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> DbResult<Vec<Transaction>> {
        self.load_recent(Some(user_id), limit).await
    }

    /// Loads headers and lines inside one read transaction so both queries
    /// see the same snapshot.
    async fn load_recent(&self, user_id: Option<&str>, limit: i64) -> DbResult<Vec<Transaction>> {
        if limit <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "limit".to_string(),
            }
            .into());
        }

        debug!(user_id = ?user_id, limit, "Listing recent transactions");

        let mut tx = self.pool.begin().await?;

        let mut transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, total_cents, created_at
            FROM transactions
            WHERE ?1 IS NULL OR user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let lines = sqlx::query_as::<_, TransactionLine>(
            r#"
            SELECT id, transaction_id, line_no, item_id, item_name, quantity, unit_price_cents
            FROM transaction_items
            WHERE transaction_id IN (
                SELECT id
                FROM transactions
                WHERE ?1 IS NULL OR user_id = ?1
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?2
            )
            ORDER BY transaction_id, line_no
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut by_transaction: HashMap<String, Vec<TransactionLine>> = HashMap::new();
        for line in lines {
            by_transaction
                .entry(line.transaction_id.clone())
                .or_default()
                .push(line);
        }
        for transaction in &mut transactions {
            transaction.lines = by_transaction.remove(&transaction.id).unwrap_or_default();
        }

        Ok(transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
