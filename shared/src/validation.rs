//! Validation rules for inventory inputs

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a quantity that must move at least one unit
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a quantity that may be zero (thresholds, reorder settings)
pub fn validate_non_negative(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Validate a signed stock adjustment
pub fn validate_adjustment(delta: i32) -> Result<(), &'static str> {
    if delta == 0 {
        return Err("Adjustment cannot be zero");
    }
    if delta == i32::MIN {
        return Err("Adjustment is out of range");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate warehouse/supplier code format (2-20 uppercase alphanumeric, '-' or '_')
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Code must be at least 2 characters");
    }
    if code.len() > 20 {
        return Err("Code must be at most 20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("Code must be uppercase alphanumeric, '-' or '_'");
    }
    Ok(())
}

/// Validate ISO 4217 style currency code (three uppercase letters)
pub fn validate_currency_code(code: &str) -> Result<(), &'static str> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err("Currency code must be three uppercase letters")
    }
}
