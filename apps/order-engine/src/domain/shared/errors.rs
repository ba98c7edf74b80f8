//! Domain errors shared by value objects.

use std::fmt;

/// Domain-level errors raised while constructing or validating value objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid value for a field.
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Business rule violation.
    BusinessRuleViolation {
        /// Rule name or code.
        rule: String,
        /// Description of the violation.
        message: String,
    },

    /// Unrecognised enumeration value (exchange code, product, etc.).
    UnknownVariant {
        /// Kind of value being parsed.
        kind: String,
        /// Raw input.
        value: String,
    },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{field}': {message}")
            }
            Self::BusinessRuleViolation { rule, message } => {
                write!(f, "Business rule '{rule}' violated: {message}")
            }
            Self::UnknownVariant { kind, value } => {
                write!(f, "Unknown {kind}: {value}")
            }
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display() {
        let err = DomainError::invalid("quantity", "must be positive");
        let msg = format!("{err}");
        assert!(msg.contains("quantity"));
        assert!(msg.contains("positive"));
    }

    #[test]
    fn business_rule_display() {
        let err = DomainError::BusinessRuleViolation {
            rule: "BO_INTRADAY_ONLY".to_string(),
            message: "bracket orders are intraday".to_string(),
        };
        assert!(err.to_string().contains("BO_INTRADAY_ONLY"));
    }

    #[test]
    fn unknown_variant_display() {
        let err = DomainError::UnknownVariant {
            kind: "exchange".to_string(),
            value: "LSE".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown exchange: LSE");
    }
}
