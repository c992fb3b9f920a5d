//! # Database Pool Management
//!
//! Connection pool creation and configuration for the SQLite ledger store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Caller startup                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) / StoreConfig::db_config()                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.items() / db.batches() / db.transactions() / db.reports()          │
//! │  db.users()                                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers never block the single writer, and a writer waiting on another
//! writer sleeps up to `busy_timeout` instead of failing immediately.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use stockroom_core::validation::{validate_password, validate_username};
use stockroom_core::{Actor, Capability, DecoderChain, Item, OversellPolicy, User};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::batch::BatchRepository;
use crate::repository::item::ItemRepository;
use crate::repository::report::ReportRepository;
use crate::repository::transaction::TransactionRepository;
use crate::repository::user::{hash_password, insert_user, root_admin_user, UserRepository};

/// Path that selects a private in-memory database.
const IN_MEMORY_PATH: &str = ":memory:";

/// Statements run by [`Database::reset`], children before parents.
const RESET_STATEMENTS: &[&str] = &[
    "DELETE FROM transaction_items",
    "DELETE FROM transactions",
    "DELETE FROM item_stock",
    "DELETE FROM items",
    "DELETE FROM users",
];

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/stockroom.db")
///     .max_connections(5)
///     .oversell_policy(OversellPolicy::Reject);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections
    /// forever (required for in-memory databases, which vanish with their
    /// last connection).
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// How long a writer waits for another writer's lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// What checkout does when a line asks for more than is on hand.
    /// Default: clamp
    pub oversell_policy: OversellPolicy,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            oversell_policy: OversellPolicy::default(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how long a writer waits for another writer's lock.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the checkout oversell policy.
    pub fn oversell_policy(mut self, policy: OversellPolicy) -> Self {
        self.oversell_policy = policy;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            oversell_policy: OversellPolicy::default(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: clones share one pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./stockroom.db")).await?;
///
/// let apple = db.items().get_by_code("APL-001").await?;
/// db.batches().restock(&apple.id, 24, None).await?;
/// let sale = db
///     .transactions()
///     .checkout(&actor.id, &[CheckoutLine::new(&apple.id, 2, apple.price())])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    oversell_policy: OversellPolicy,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (batch cascade on item delete)
    ///    - Busy timeout so concurrent writers queue instead of failing
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// The root admin is not created here; call
    /// [`UserRepository::ensure_root_admin`] during startup.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            oversell_policy = %config.oversell_policy,
            "Initializing database connection"
        );

        // The path is passed through as-is, so `?` and `#` in file names are
        // not parsed as URL syntax.
        let base_options = if config.database_path == Path::new(IN_MEMORY_PATH) {
            SqliteConnectOptions::from_str(IN_MEMORY_PATH)
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(&config.database_path)
        };

        let connect_options = base_options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            oversell_policy: config.oversell_policy,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    ///
    /// Called automatically by `new()` if `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods when available.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The oversell policy handed to every [`TransactionRepository`].
    pub fn oversell_policy(&self) -> OversellPolicy {
        self.oversell_policy
    }

    /// Returns the item catalog repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let items = db.items().search("cola").await?;
    /// ```
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone())
    }

    /// Returns the batch ledger repository.
    pub fn batches(&self) -> BatchRepository {
        BatchRepository::new(self.pool.clone())
    }

    /// Returns the transaction repository, bound to this store's oversell
    /// policy.
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone(), self.oversell_policy)
    }

    /// Returns the reporting repository.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Returns the user directory repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Wipes every ledger table and re-creates the root admin.
    ///
    /// ## Rules
    /// - Only a root admin may reset (`PermissionDenied` otherwise)
    /// - The deletes and the new root admin commit together; any failure
    ///   leaves the old data, users included, intact
    /// - The new root admin gets a fresh id
    pub async fn reset(
        &self,
        actor: &Actor,
        root_username: &str,
        root_password: &str,
    ) -> DbResult<User> {
        actor.require(Capability::Administer)?;
        let root_username = root_username.trim();
        validate_username(root_username)?;
        validate_password(root_password)?;

        let root = root_admin_user(root_username);
        let password_hash = hash_password(root_password)?;

        warn!(actor = %actor.id, "Resetting ledger store");

        let mut tx = self.pool.begin().await?;
        for statement in RESET_STATEMENTS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        insert_user(&mut *tx, &root, &password_hash).await?;
        tx.commit().await?;

        info!(root_admin = %root.username, "Ledger store reset complete");
        Ok(root)
    }

    /// Decodes a label image and looks the code up in the catalog.
    ///
    /// Decoding runs on the calling task; decoders are expected to be quick
    /// for single labels.
    ///
    /// ## Errors
    /// - `DbError::Scan` when no decoder recognized the image
    /// - `DbError::NotFound` when the decoded code is not in the catalog
    pub async fn item_for_image(&self, chain: &DecoderChain, image: &Path) -> DbResult<Item> {
        let code = chain.decode(image)?;
        debug!(image = %image.display(), code = %code, "Decoded scanned label");
        self.items().get_by_code(&code).await
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use stockroom_core::{CheckoutLine, CodeDecoder, Money, NewItem, NewUser, ScanError};

    struct FixedDecoder(&'static str);

    impl CodeDecoder for FixedDecoder {
        fn name(&self) -> &str {
            "fixed"
        }

        fn decode(&self, _image: &Path) -> Result<String, ScanError> {
            Ok(self.0.to_string())
        }
    }

    struct BlindDecoder;

    impl CodeDecoder for BlindDecoder {
        fn name(&self) -> &str {
            "blind"
        }

        fn decode(&self, _image: &Path) -> Result<String, ScanError> {
            Err(ScanError::DecodeFailed {
                decoder: "blind".to_string(),
                reason: "no symbol found".to_string(),
            })
        }
    }

    fn apple() -> NewItem {
        NewItem {
            name: "Apple".to_string(),
            code: "APL-001".to_string(),
            description: None,
            price: Money::from_cents(150),
            cost: Money::from_cents(100),
            quantity: 10,
        }
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = db.migration_status().await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_file_path_with_url_characters() {
        let dir = std::env::temp_dir().join(format!("stockroom-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shop?mode=ro#1.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.items().create(&apple()).await.unwrap();
        db.close().await;

        assert!(path.exists());
        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.items().count().await.unwrap(), 1);
        reopened.close().await;

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .oversell_policy(OversellPolicy::Reject);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.oversell_policy, OversellPolicy::Reject);
        assert!(DbConfig::in_memory().idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_close_fails_later_calls() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_item_for_image() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.items().create(&apple()).await.unwrap();

        let chain = DecoderChain::new()
            .with(BlindDecoder)
            .with(FixedDecoder("APL-001"));
        let found = db.item_for_image(&chain, Path::new("shelf.png")).await.unwrap();
        assert_eq!(found.id, created.id);

        let missing = DecoderChain::new().with(FixedDecoder("NOPE"));
        let err = db
            .item_for_image(&missing, Path::new("shelf.png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let blind = DecoderChain::new().with(BlindDecoder);
        let err = db
            .item_for_image(&blind, Path::new("blurry.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Scan(ScanError::Unrecognized { .. })));
    }

    #[tokio::test]
    async fn test_reset_requires_root_admin() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clerk = db
            .users()
            .create(&NewUser {
                username: "clerk".to_string(),
                password: "secret".to_string(),
                can_read: true,
                can_transact: true,
                can_view_revenue: true,
            })
            .await
            .unwrap();

        let err = db
            .reset(&Actor::from(&clerk), "admin", "admin")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.users().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_wipes_everything_and_recreates_root() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let root = db.users().ensure_root_admin("admin", "admin").await.unwrap();
        let item = db.items().create(&apple()).await.unwrap();
        db.transactions()
            .checkout(&root.id, &[CheckoutLine::new(&item.id, 2, item.price())])
            .await
            .unwrap();

        let new_root = db.reset(&Actor::from(&root), "admin", "admin").await.unwrap();

        assert!(new_root.is_root_admin);
        assert_ne!(new_root.id, root.id);
        assert_eq!(db.items().count().await.unwrap(), 0);
        assert!(db.transactions().list_recent(10).await.unwrap().is_empty());
        assert!(db.batches().list(&item.id).await.unwrap().is_empty());

        let users = db.users().list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "admin");
        assert_eq!(users[0].id, new_root.id);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_old_data() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let root = db.users().ensure_root_admin("admin", "admin").await.unwrap();
        let item = db.items().create(&apple()).await.unwrap();

        // make the root admin insert fail after the deletes have run
        sqlx::query(
            "CREATE TRIGGER users_frozen BEFORE INSERT ON users \
             BEGIN SELECT RAISE(ABORT, 'users are frozen'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db
            .reset(&Actor::from(&root), "owner", "owner")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let users = db.users().list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, root.id);
        assert_eq!(db.items().get_by_id(&item.id).await.unwrap().id, item.id);
        assert_eq!(db.batches().list(&item.id).await.unwrap().len(), 1);

        sqlx::query("DROP TRIGGER users_frozen")
            .execute(db.pool())
            .await
            .unwrap();

        let new_root = db.reset(&Actor::from(&root), "owner", "owner").await.unwrap();
        assert_eq!(new_root.username, "owner");
        assert_eq!(db.users().count().await.unwrap(), 1);
    }
}
