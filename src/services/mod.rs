// Core back-office logic
pub mod credit_ledger;
pub mod replenishment;

// Catalog
pub mod categories;
pub mod packages;
pub mod products;
pub mod suppliers;

// Customers and money
pub mod customers;
pub mod expenses;

// Purchasing and reporting
pub mod analytics;
pub mod purchase_orders;

use rust_decimal::Decimal;
use validator::ValidationError;

/// `validator` hook for money fields that may be zero.
pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

/// `validator` hook for amounts that must be strictly positive.
pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("must_be_positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_validators() {
        assert!(validate_non_negative(&dec!(0)).is_ok());
        assert!(validate_non_negative(&dec!(-0.01)).is_err());
        assert!(validate_positive(&dec!(0.01)).is_ok());
        assert!(validate_positive(&dec!(0)).is_err());
    }
}
