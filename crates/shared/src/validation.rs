//! Common validation utilities.

use validator::ValidationError;

/// Returns true when the value is absent or contains only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Validates that a string carries at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a monetary amount is finite and strictly positive.
pub fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount_range");
        err.message = Some("Amount must be a positive number".into());
        Err(err)
    }
}

/// Parses an amount supplied as text ("199.50", " 42 ").
///
/// Returns `None` for anything that is not a finite, strictly positive number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let amount = raw.trim().parse::<f64>().ok()?;
    validate_amount(amount).ok().map(|_| amount)
}

/// Trims an optional input, mapping absent values to an empty string.
pub fn trimmed_or_empty(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
