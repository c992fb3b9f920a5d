//! # User Repository
//!
//! Stored users, their capability flags, and the root admin.
//!
//! Passwords are stored as argon2 PHC strings and never leave this module;
//! the [`User`] type has no hash field. Verifying credentials is the job of
//! whatever authentication layer sits in front of the store.
//!
//! ## Root Admin
//! ```text
//! ensure_root_admin("admin", "admin")
//!      │
//!      ├── a root admin exists? ──► return it (no write)
//!      │
//!      └── none ──► INSERT with is_root_admin = 1 and every capability
//! ```
//! A root admin cannot be deleted.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

use stockroom_core::validation::{validate_password, validate_username};
use stockroom_core::{NewUser, User};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

/// Repository for user records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a regular (non-root) user.
    ///
    /// ## Returns
    /// * `Ok(User)` - The stored user
    /// * `Err(DbError::UniqueViolation)` - Username taken
    /// * `Err(DbError::Validation)` - Bad username or password
    pub async fn create(&self, new: &NewUser) -> DbResult<User> {
        let username = new.username.trim();
        validate_username(username)?;
        validate_password(&new.password)?;

        debug!(username = %username, "Creating user");

        let user = User {
            id: generate_id(),
            username: username.to_string(),
            is_root_admin: false,
            can_read: new.can_read,
            can_transact: new.can_transact,
            can_view_revenue: new.can_view_revenue,
            created_at: Utc::now(),
        };

        self.insert(&user, &new.password).await?;

        info!(id = %user.id, username = %user.username, "User created");
        self.get_by_id(&user.id).await
    }

    async fn insert(&self, user: &User, password: &str) -> DbResult<()> {
        let password_hash = hash_password(password)?;
        insert_user(&self.pool, user, &password_hash).await
    }

    /// Gets a user by ID. NotFound if absent.
    pub async fn get_by_id(&self, id: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_root_admin, can_read, can_transact, can_view_revenue, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Gets a user by username (trimmed). NotFound if absent.
    pub async fn get_by_username(&self, username: &str) -> DbResult<User> {
        let username = username.trim();

        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_root_admin, can_read, can_transact, can_view_revenue, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", username))
    }

    /// Lists all users ordered by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_root_admin, can_read, can_transact, can_view_revenue, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Replaces a user's capability flags.
    ///
    /// Root admins hold every capability regardless of these flags.
    pub async fn update_permissions(
        &self,
        id: &str,
        can_read: bool,
        can_transact: bool,
        can_view_revenue: bool,
    ) -> DbResult<User> {
        debug!(id = %id, can_read, can_transact, can_view_revenue, "Updating permissions");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET can_read = ?2, can_transact = ?3, can_view_revenue = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(can_read)
        .bind(can_transact)
        .bind(can_view_revenue)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id).await
    }

    /// Re-hashes and stores a new password.
    pub async fn update_password(&self, id: &str, new_password: &str) -> DbResult<()> {
        validate_password(new_password)?;

        debug!(id = %id, "Updating password");

        let password_hash = hash_password(new_password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Deletes a user. The root admin is protected.
    ///
    /// Transactions the user rang up stay in the history.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let is_root_admin: bool =
            sqlx::query_scalar("SELECT is_root_admin FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("User", id))?;

        if is_root_admin {
            return Err(DbError::RootAdminProtected);
        }

        sqlx::query("DELETE FROM users WHERE id = ?1 AND is_root_admin = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(id = %id, "User deleted");
        Ok(())
    }

    /// Returns the root admin, creating one with every capability if none
    /// exists. Idempotent.
    pub async fn ensure_root_admin(&self, username: &str, password: &str) -> DbResult<User> {
        let existing = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_root_admin, can_read, can_transact, can_view_revenue, created_at
            FROM users
            WHERE is_root_admin = 1
            ORDER BY created_at, rowid
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(root) = existing {
            debug!(username = %root.username, "Root admin present");
            return Ok(root);
        }

        let username = username.trim();
        validate_username(username)?;
        validate_password(password)?;

        let root = root_admin_user(username);

        self.insert(&root, password).await?;

        info!(id = %root.id, username = %root.username, "Root admin created");
        Ok(root)
    }

    /// Counts users (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Hashes a password into an argon2id PHC string with a random salt.
pub(crate) fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// A fresh root admin record holding every capability.
pub(crate) fn root_admin_user(username: &str) -> User {
    User {
        id: generate_id(),
        username: username.to_string(),
        is_root_admin: true,
        can_read: true,
        can_transact: true,
        can_view_revenue: true,
        created_at: Utc::now(),
    }
}

/// Inserts a user row with an already-hashed password.
///
/// Takes any executor so callers can insert inside their own transaction.
pub(crate) async fn insert_user<'e, E>(
    executor: E,
    user: &User,
    password_hash: &str,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO users (
            id, username, password_hash, is_root_admin,
            can_read, can_transact, can_view_revenue, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(password_hash)
    .bind(user.is_root_admin)
    .bind(user.can_read)
    .bind(user.can_transact)
    .bind(user.can_view_revenue)
    .bind(user.created_at)
    .execute(executor)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(&user.username))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
