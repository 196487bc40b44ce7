use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, RideError};

static VEHICLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{1,2}[A-Z]{0,3}\d{4}$").expect("vehicle number pattern"));

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone pattern"));

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern"));

/// Registration plates are compared without spaces or dashes, upper-cased.
pub fn normalize_vehicle_number(raw: &str) -> Result<String> {
    let normalized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase();
    if VEHICLE_NUMBER.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(RideError::InvalidRequest(format!("invalid vehicle number '{}'", raw)))
    }
}

pub fn validate_phone(phone: &str) -> Result<()> {
    if PHONE.is_match(phone) {
        Ok(())
    } else {
        Err(RideError::InvalidRequest(format!("invalid phone number '{}'", phone)))
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(RideError::InvalidRequest(format!("invalid email '{}'", email)))
    }
}

pub fn is_valid_currency(code: &str) -> bool {
    CURRENCY.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_number_normalized() {
        assert_eq!(normalize_vehicle_number("ka 05 ab 1234").unwrap(), "KA05AB1234");
        assert_eq!(normalize_vehicle_number("KA-05-AB-1234").unwrap(), "KA05AB1234");
        assert!(normalize_vehicle_number("12345").is_err());
    }

    #[test]
    fn test_contact_details() {
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("call me").is_err());
        assert!(validate_email("john@example.com").is_ok());
        assert!(validate_email("john@").is_err());
    }

    #[test]
    fn test_currency_codes() {
        assert!(is_valid_currency("INR"));
        assert!(!is_valid_currency("inr"));
        assert!(!is_valid_currency("RUPEE"));
    }
}
