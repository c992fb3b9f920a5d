//! # Store Configuration
//!
//! Settings for opening the ledger store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_DB_PATH=/srv/stockroom.db                                │
//! │     STOCKROOM_OVERSELL=reject                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockroom/stockroom.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockroom.stockroom/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir, clamp policy, admin/admin root                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/stockroom/stockroom.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [ledger]
//! oversell = "clamp"        # clamp | reject
//! recent_limit = 50
//! low_stock_threshold = 10
//!
//! [root_admin]
//! username = "admin"
//! password = "admin"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use stockroom_core::validation::{validate_password, validate_username};
use stockroom_core::{OversellPolicy, DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_RECENT_LIMIT};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

const DB_FILE_NAME: &str = "stockroom.db";
const CONFIG_FILE_NAME: &str = "stockroom.toml";

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Falls back to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for another writer (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// `[ledger]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default)]
    pub oversell: OversellPolicy,

    /// Default page size for recent-transaction views.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,

    /// Items below this quantity count as low on stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_recent_limit() -> i64 {
    DEFAULT_RECENT_LIMIT
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            oversell: OversellPolicy::default(),
            recent_limit: default_recent_limit(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

/// `[root_admin]` section: credentials used when no root admin exists yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootAdminSettings {
    #[serde(default = "default_root_username")]
    pub username: String,

    #[serde(default = "default_root_password")]
    pub password: String,
}

fn default_root_username() -> String {
    "admin".to_string()
}

fn default_root_password() -> String {
    "admin".to_string()
}

impl Default for RootAdminSettings {
    fn default() -> Self {
        RootAdminSettings {
            username: default_root_username(),
            password: default_root_password(),
        }
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub root_admin: RootAdminSettings,
}

impl StoreConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stockroom.toml`), if it exists
    /// 3. `STOCKROOM_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> DbResult<Self> {
        info!(?path, "Loading store config from file");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| DbError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text; missing keys take their defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::InvalidConfig(e.to_string()))
    }

    /// Applies `STOCKROOM_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric or policy values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("STOCKROOM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("STOCKROOM_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid STOCKROOM_MAX_CONNECTIONS"),
            }
        }

        if let Some(policy) = lookup("STOCKROOM_OVERSELL") {
            match policy.parse::<OversellPolicy>() {
                Ok(p) => {
                    debug!(policy = %p, "Overriding oversell policy from environment");
                    self.ledger.oversell = p;
                }
                Err(e) => warn!(error = %e, "Ignoring invalid STOCKROOM_OVERSELL"),
            }
        }

        if let Some(user) = lookup("STOCKROOM_ROOT_USER") {
            self.root_admin.username = user;
        }

        if let Some(password) = lookup("STOCKROOM_ROOT_PASSWORD") {
            self.root_admin.password = password;
        }

        if let Some(limit) = lookup("STOCKROOM_RECENT_LIMIT") {
            match limit.parse::<i64>() {
                Ok(n) => self.ledger.recent_limit = n,
                Err(_) => warn!(value = %limit, "Ignoring invalid STOCKROOM_RECENT_LIMIT"),
            }
        }

        if let Some(threshold) = lookup("STOCKROOM_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(n) => self.ledger.low_stock_threshold = n,
                Err(_) => {
                    warn!(value = %threshold, "Ignoring invalid STOCKROOM_LOW_STOCK_THRESHOLD")
                }
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.ledger.recent_limit <= 0 {
            return Err(DbError::InvalidConfig(
                "ledger.recent_limit must be greater than 0".into(),
            ));
        }

        if self.ledger.low_stock_threshold < 0 {
            return Err(DbError::InvalidConfig(
                "ledger.low_stock_threshold must not be negative".into(),
            ));
        }

        validate_username(&self.root_admin.username)
            .and_then(|_| validate_password(&self.root_admin.password))
            .map_err(|e| DbError::InvalidConfig(format!("root_admin: {}", e)))?;

        Ok(())
    }

    /// The database file to open: configured path or the platform default.
    pub fn database_path(&self) -> DbResult<PathBuf> {
        self.database
            .path
            .clone()
            .or_else(Self::default_database_path)
            .ok_or_else(|| DbError::InvalidConfig("no database path available".into()))
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .oversell_policy(self.ledger.oversell))
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "stockroom", "stockroom")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn default_database_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
    }
}
