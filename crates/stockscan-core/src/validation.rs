//! # Validation Module
//!
//! Input validation for unit codes, products and committed quantities.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Code Resolver (per scan)                                     │
//! │  ├── Empty / AlreadySold / NotFound / Duplicate                        │
//! │  └── Recovered locally, one scan at a time                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (per save / commit)                              │
//! │  ├── Code format, delimiter, length                                    │
//! │  ├── Parallel list lengths, in-product uniqueness                      │
//! │  └── Quantity and price ranges                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── (product_id, store_id) primary key on inventory                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::codes;
use crate::error::ValidationError;
use crate::types::Product;
use crate::{LIST_DELIMITER, MAX_CODE_LEN, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Code Validators
// =============================================================================

/// Validates a single unit code.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_CODE_LEN`] characters
/// - Must not contain the list delimiter
///
/// ## Example
/// ```rust
/// use stockscan_core::validation::validate_unit_code;
///
/// assert!(validate_unit_code("356938035643809").is_ok());
/// assert!(validate_unit_code("  ").is_err());
/// assert!(validate_unit_code("A1,A2").is_err());
/// ```
pub fn validate_unit_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "unit code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "unit code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if code.contains(LIST_DELIMITER) {
        return Err(ValidationError::ContainsDelimiter {
            field: "unit code".to_string(),
            value: code.to_string(),
            delimiter: LIST_DELIMITER,
        });
    }

    Ok(())
}

/// Validates a variant tag. Empty tags are allowed.
pub fn validate_unit_tag(tag: &str) -> ValidationResult<()> {
    if tag.contains(LIST_DELIMITER) {
        return Err(ValidationError::ContainsDelimiter {
            field: "unit tag".to_string(),
            value: tag.to_string(),
            delimiter: LIST_DELIMITER,
        });
    }
    Ok(())
}

/// Validates a product's parallel code/tag lists.
///
/// ## Rules
/// - `codes.len() == tags.len()`
/// - every code passes [`validate_unit_code`], every tag [`validate_unit_tag`]
/// - no code appears twice, compared case-insensitively
pub fn validate_unit_lists(codes: &[String], tags: &[String]) -> ValidationResult<()> {
    if codes.len() != tags.len() {
        return Err(ValidationError::LengthMismatch {
            field: "unit tags".to_string(),
            expected: codes.len(),
            actual: tags.len(),
        });
    }

    let mut seen = HashSet::with_capacity(codes.len());
    for code in codes {
        validate_unit_code(code)?;
        if !seen.insert(codes::code_key(code)) {
            return Err(ValidationError::Duplicate {
                field: "unit code".to_string(),
                value: code.trim().to_string(),
            });
        }
    }

    tags.iter().try_for_each(|tag| validate_unit_tag(tag))
}

/// Validates a product before it is saved.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;

    if product.stocked_qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stocked quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    validate_unit_lists(&product.unit_codes, &product.unit_tags)
}

/// Validates that no code of `product` is owned by another product of the store.
///
/// ## Returns
/// The first clashing code and the name of the product that owns it.
pub fn find_store_conflict<'a>(
    product: &Product,
    others: impl IntoIterator<Item = &'a Product>,
) -> Option<(String, String)> {
    let mine: HashSet<String> = product.unit_codes.iter().map(|c| codes::code_key(c)).collect();

    others
        .into_iter()
        .filter(|other| !(other.id == product.id && !product.id.is_empty()))
        .find_map(|other| {
            other
                .unit_codes
                .iter()
                .find(|code| mine.contains(&codes::code_key(code)))
                .map(|code| (code.clone(), other.name.clone()))
        })
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
