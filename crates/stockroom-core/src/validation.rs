//! # Validation Module
//!
//! Input validation utilities for Stockroom.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                 │
//! │  └── Immediate feedback (empty fields, number parsing)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by every repository method)              │
//! │  ├── Names, codes, usernames                                           │
//! │  ├── Quantities and money signs                                        │
//! │  └── Expiry date parsing                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (items.code, users.username)                               │
//! │  └── CHECK (quantity >= 0)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_STOCK_LEVEL};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_CODE_LEN: usize = 128;
pub const MAX_QUERY_LEN: usize = 100;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 4;

/// Date format accepted for expiry input.
pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item name: required, at most 200 characters.
///
/// ```rust
/// use stockroom_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Apple").is_ok());
/// assert!(validate_item_name("  ").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an item code (barcode value).
///
/// ## Rules
/// - Must not be empty
/// - At most 128 characters
/// - No whitespace or control characters (scanners emit one token)
///
/// ```rust
/// use stockroom_core::validation::validate_item_code;
///
/// assert!(validate_item_code("4006381333931").is_ok());
/// assert!(validate_item_code("APL/001#A").is_ok());
/// assert!(validate_item_code("has space").is_err());
/// ```
pub fn validate_item_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if code.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::invalid_format(
            "code",
            "must not contain whitespace",
        ));
    }

    Ok(())
}

/// Validates a search query and returns it trimmed. Empty is allowed and
/// means "everything".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates a username: 3 to 64 characters, no whitespace.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let len = username.chars().count();

    if username.trim().is_empty() {
        return Err(ValidationError::required("username"));
    }
    if len < MIN_USERNAME_LEN {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: MIN_USERNAME_LEN,
        });
    }
    if len > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: MAX_USERNAME_LEN,
        });
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format(
            "username",
            "must not contain whitespace",
        ));
    }

    Ok(())
}

/// Validates a password: required, at least 4 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(())
}

/// The acting user id must be present before a sale is recorded.
pub fn validate_actor_id(actor_id: &str) -> ValidationResult<()> {
    if actor_id.trim().is_empty() {
        return Err(ValidationError::required("actor id"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity that must be strictly positive and at most
/// `MAX_ITEM_QUANTITY` (sales, restocks).
///
/// ```rust
/// use stockroom_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-1).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an on-hand stock level (opening quantity, corrections).
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_STOCK_LEVEL {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        });
    }

    Ok(())
}

/// Validates a price or cost.
///
/// ## Rules
/// - Must be non-negative (>= 0); free items are allowed
/// - Must not exceed `MAX_AMOUNT_CENTS`
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Dates
// =============================================================================

/// Parses an expiry date typed as `YYYY-MM-DD`.
///
/// Blank input means "no expiry" and returns `Ok(None)`.
///
/// ```rust
/// use stockroom_core::validation::parse_expiry_date;
///
/// assert!(parse_expiry_date("2026-12-31").unwrap().is_some());
/// assert!(parse_expiry_date("").unwrap().is_none());
/// assert!(parse_expiry_date("31/12/2026").is_err());
/// ```
pub fn parse_expiry_date(input: &str) -> ValidationResult<Option<NaiveDate>> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(input, EXPIRY_DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::invalid_format("expiry date", "expected YYYY-MM-DD"))
}

// =============================================================================
// Query Helpers
// =============================================================================

/// Builds a `LIKE` pattern that matches `needle` anywhere, with `%`, `_`
/// and `\` in the needle matched literally. Use with `ESCAPE '\'`.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Unit Tests
// =============================================================================
