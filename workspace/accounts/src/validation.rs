use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AccountError, Result};

/// E.164: a `+`, a non-zero country code digit, at most 15 digits overall.
static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").expect("valid E.164 pattern"));

/// Order in which field errors are reported when several fields are invalid.
const FIELD_ORDER: [&str; 5] = ["username", "email", "phone_number", "first_name", "last_name"];

/// Already normalized field values of an account about to be created.
#[derive(Debug, Validate)]
pub struct AccountFields {
    #[validate(length(max = 256, message = "must be at most 256 characters"))]
    pub username: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    pub email: String,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
    #[validate(length(max = 256, message = "must be at most 256 characters"))]
    pub first_name: String,
    #[validate(length(max = 256, message = "must be at most 256 characters"))]
    pub last_name: String,
}

impl AccountFields {
    /// Runs all field validators, reporting the first failing field.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(first_invalid_field)
    }
}

fn first_invalid_field(errors: ValidationErrors) -> AccountError {
    let field_errors = errors.field_errors();
    for field in FIELD_ORDER {
        if let Some(error) = field_errors.get(field).and_then(|errs| errs.first()) {
            let reason = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            return AccountError::InvalidField { field, reason };
        }
    }
    AccountError::InvalidField {
        field: "account",
        reason: errors.to_string(),
    }
}

pub fn validate_phone_number(value: &str) -> std::result::Result<(), ValidationError> {
    if E164.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_number")
            .with_message("must be in E.164 format, e.g. +15551234567".into()))
    }
}

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Drops the separators people commonly type into phone numbers.
pub fn normalize_phone_number(phone_number: &str) -> String {
    phone_number
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')'))
        .collect()
}

/// True when a required text field should count as absent.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> AccountFields {
        AccountFields {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            phone_number: "+15551234567".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn test_valid_fields() {
        assert!(fields().check().is_ok());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  ALICE@X.com "), "alice@x.com");
    }

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("+1 (555) 123-4567"), "+15551234567");
        assert_eq!(normalize_phone_number("+44.20.7946.0958"), "+442079460958");
    }

    #[test]
    fn test_phone_number_format() {
        assert!(validate_phone_number("+15551234567").is_ok());
        assert!(validate_phone_number("5551234567").is_err());
        assert!(validate_phone_number("+05551234567").is_err());
        assert!(validate_phone_number("+1555").is_err());
        assert!(validate_phone_number("+1555123456789012").is_err());
        assert!(validate_phone_number("+1555abc4567").is_err());
    }

    #[test]
    fn test_invalid_email_is_reported() {
        let invalid = AccountFields {
            email: "not-an-email".to_string(),
            ..fields()
        };
        match invalid.check() {
            Err(AccountError::InvalidField { field, .. }) => assert_eq!(field, "email"),
            other => panic!("expected invalid email, got {:?}", other),
        }
    }

    #[test]
    fn test_length_limits() {
        let long_email = format!("{}@x.com", "a".repeat(95));
        let invalid = AccountFields {
            email: long_email,
            ..fields()
        };
        assert!(matches!(
            invalid.check(),
            Err(AccountError::InvalidField { field: "email", .. })
        ));

        let invalid = AccountFields {
            username: "u".repeat(257),
            ..fields()
        };
        assert!(matches!(
            invalid.check(),
            Err(AccountError::InvalidField { field: "username", .. })
        ));

        let ok = AccountFields {
            first_name: "f".repeat(256),
            ..fields()
        };
        assert!(ok.check().is_ok());
    }

    #[test]
    fn test_first_invalid_field_follows_field_order() {
        let invalid = AccountFields {
            username: "u".repeat(300),
            phone_number: "nope".to_string(),
            ..fields()
        };
        match invalid.check() {
            Err(AccountError::InvalidField { field, reason }) => {
                assert_eq!(field, "username");
                assert_eq!(reason, "must be at most 256 characters");
            }
            other => panic!("expected invalid username, got {:?}", other),
        }
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(!is_blank("a"));
    }
}
