//! Email address validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ValidationError;

/// Maximum recipients accepted in one send.
pub const MAX_RECIPIENTS: usize = 50;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
});

/// Whether `address` looks like a deliverable email address.
pub fn is_valid_email(address: &str) -> bool {
    let address = address.trim();
    address.len() <= 254 && EMAIL.is_match(address)
}

/// Split addresses into valid and invalid, preserving order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCheck {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub all_valid: bool,
}

/// Classify every address (trimmed, blanks dropped).
pub fn check_addresses(addresses: &[String]) -> AddressCheck {
    let (valid, invalid): (Vec<String>, Vec<String>) = addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .partition(|a| is_valid_email(a));
    let all_valid = invalid.is_empty() && !valid.is_empty();
    AddressCheck {
        valid,
        invalid,
        all_valid,
    }
}

/// Validate a recipient list for sending.
///
/// Returns the trimmed recipients, or an error naming every invalid entry.
pub fn validate_recipients(recipients: &[String]) -> Result<Vec<String>, ValidationError> {
    let check = check_addresses(recipients);

    if !check.invalid.is_empty() {
        return Err(ValidationError::InvalidRecipients(check.invalid));
    }
    if check.valid.is_empty() {
        return Err(ValidationError::NoRecipients);
    }
    if check.valid.len() > MAX_RECIPIENTS {
        return Err(ValidationError::TooManyRecipients {
            count: check.valid.len(),
            max: MAX_RECIPIENTS,
        });
    }

    Ok(check.valid)
}
