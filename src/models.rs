pub mod auth;
pub mod company;
pub mod consignment;
pub mod customer;
pub mod dashboard;
pub mod manifest;
pub mod user;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Digits with an optional leading `+`, 7 to 15 digits long.
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let ok = (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message("Phone number must contain 7 to 15 digits.".into()))
    }
}

pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative")
            .with_message("Value must not be negative.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_rules() {
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("9876543").is_ok());
        assert!(validate_phone("98765").is_err());
        assert!(validate_phone("98765-43210").is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(validate_non_negative(&Decimal::new(-1, 2)).is_err());
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&Decimal::new(12050, 2)).is_ok());
    }
}
