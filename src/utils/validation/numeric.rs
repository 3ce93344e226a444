//! Numeric validation utilities
//!
//! Range checks for byte limits and timeouts, plus safe conversion of
//! declared sizes.

use crate::error::{BgEraserError, Result};

/// Validator for numeric configuration values and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Safely convert u64 to usize with bounds checking
    pub fn validate_u64_to_usize(value: u64) -> Result<usize> {
        usize::try_from(value).map_err(|_| {
            BgEraserError::invalid_config(format!(
                "Value {} exceeds usize::MAX on this platform ({})",
                value,
                usize::MAX
            ))
        })
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(BgEraserError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate that a value is positive
    pub fn validate_positive<T>(value: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy + Default,
    {
        if value <= T::default() {
            return Err(BgEraserError::invalid_config(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Add two byte counts, failing on overflow
    pub fn safe_add_u64(a: u64, b: u64) -> Result<u64> {
        a.checked_add(b)
            .ok_or_else(|| BgEraserError::unexpected(format!("Addition overflow: {} + {}", a, b)))
    }
}
