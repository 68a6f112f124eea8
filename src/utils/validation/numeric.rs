//! Numeric validation utilities
//!
//! Range checks for user-facing parameters (padding scales, balances,
//! overlay alpha, kernel sizes) so that bad values are rejected before any
//! mask is touched.

use crate::error::{MaskEditError, Result};

/// Validator for numeric parameters
pub struct NumericValidator;

impl NumericValidator {
    /// Validate a fraction in `[0.0, 1.0]`
    pub fn validate_fraction(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() {
            return Err(MaskEditError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if !(0.0..=1.0).contains(&value) {
            return Err(MaskEditError::config_value_error(name, value, "0.0-1.0"));
        }

        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        // NaN fails both comparisons, so check containment positively
        if !(value >= min && value <= max) {
            return Err(MaskEditError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate a morphology kernel size: odd and at least 1
    pub fn validate_kernel_size(value: usize, name: &str) -> Result<usize> {
        if value == 0 || value % 2 == 0 {
            return Err(MaskEditError::invalid_config(format!(
                "{} must be an odd positive size, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Clamp a value to a range
    pub fn clamp_to_range<T>(value: T, min: T, max: T) -> T
    where
        T: PartialOrd + Copy,
    {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }
}
