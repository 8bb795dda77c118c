//! Form validation.
//!
//! Each rule is a plain function returning `Result<(), String>`; form types
//! run their rules per field and collect failures into [`ValidationErrors`].

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DocumentId;

/// Minimum password length accepted by the login form.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A single failed field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name.
    pub field: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One or more failed field rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", format_field_errors(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Record the outcome of a rule for `field`.
    pub fn check(&mut self, field: &'static str, outcome: Result<(), String>) {
        if let Err(message) = outcome {
            self.0.push(FieldError { field, message });
        }
    }

    /// Failed rules in the order they were checked.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Messages for one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok` when no rule failed.
    ///
    /// # Errors
    ///
    /// Returns `self` if at least one rule failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Value must contain non-whitespace characters.
///
/// # Errors
///
/// Returns a message if the value is blank.
pub fn required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("is required".to_string())
    } else {
        Ok(())
    }
}

/// Value must be at least `min` characters.
///
/// # Errors
///
/// Returns a message if the value is shorter than `min`.
pub fn min_length(value: &str, min: usize) -> Result<(), String> {
    if value.chars().count() < min {
        Err(format!("must be at least {min} characters"))
    } else {
        Ok(())
    }
}

/// Value must be strictly greater than zero.
///
/// # Errors
///
/// Returns a message if the value is zero or negative.
pub fn positive(value: Decimal) -> Result<(), String> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err("must be greater than 0".to_string())
    }
}

/// Value must be zero or greater.
///
/// # Errors
///
/// Returns a message if the value is negative.
pub fn non_negative(value: i64) -> Result<(), String> {
    if value < 0 {
        Err("cannot be negative".to_string())
    } else {
        Ok(())
    }
}

/// Option must be set.
///
/// # Errors
///
/// Returns a message if the value is `None`.
pub fn present<T>(value: Option<&T>) -> Result<(), String> {
    value.map(|_| ()).ok_or_else(|| "is required".to_string())
}

// =============================================================================
// Forms
// =============================================================================

/// Admin product form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductInput {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub category: Option<DocumentId>,
}

impl ProductInput {
    /// Run every field rule.
    ///
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.check("title", required(&self.title));
        errors.check("price", positive(self.price));
        errors.check("stock", non_negative(self.stock));
        errors.check("category", present(self.category.as_ref()));
        errors.into_result()
    }
}

/// Login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    /// Run every field rule.
    ///
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.check("identifier", required(&self.identifier));
        errors.check(
            "password",
            required(&self.password).and_then(|()| min_length(&self.password, MIN_PASSWORD_LENGTH)),
        );
        errors.into_result()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> ProductInput {
        ProductInput {
            title: "Pineapple Candle".to_string(),
            description: None,
            price: Decimal::new(1500, 2),
            stock: 3,
            category: Some(DocumentId::new("cat-1")),
        }
    }

    #[test]
    fn test_valid_product_input() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn test_price_must_be_positive() {
        let input = ProductInput {
            price: Decimal::ZERO,
            ..valid_input()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(
            errors.for_field("price").collect::<Vec<_>>(),
            vec!["must be greater than 0"]
        );
    }

    #[test]
    fn test_collects_all_failures() {
        let input = ProductInput {
            title: "  ".to_string(),
            description: None,
            price: Decimal::new(-5, 0),
            stock: -1,
            category: None,
        };
        let errors = input.validate().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "price", "stock", "category"]);
        assert_eq!(
            errors.to_string(),
            "title: is required; price: must be greater than 0; stock: cannot be negative; category: is required"
        );
    }

    #[test]
    fn test_credentials_rules() {
        let ok = Credentials {
            identifier: "shopper@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = Credentials {
            password: "abc".to_string(),
            ..ok.clone()
        };
        let errors = short.validate().unwrap_err();
        assert_eq!(
            errors.for_field("password").collect::<Vec<_>>(),
            vec!["must be at least 6 characters"]
        );

        let blank = Credentials {
            identifier: String::new(),
            password: String::new(),
        };
        assert_eq!(blank.validate().unwrap_err().errors().len(), 2);
    }
}
