//! Admission errors.

use serde::Serialize;
use std::fmt;

/// One failed admission rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    /// Rule code (e.g. "STOP_LOSS_WRONG_SIDE").
    pub code: &'static str,
    /// Field the rule looked at.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl RuleViolation {
    /// Create a violation.
    #[must_use]
    pub fn new(code: &'static str, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.field, self.message)
    }
}

/// A create request refused before it reached the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more admission rules failed.
    RulesViolated {
        /// Every failed rule, in table order.
        violations: Vec<RuleViolation>,
    },

    /// The request could not be turned into legs.
    Malformed {
        /// Field.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ValidationError {
    /// Codes of the failed rules.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        match self {
            Self::RulesViolated { violations } => violations.iter().map(|v| v.code).collect(),
            Self::Malformed { .. } => vec!["MALFORMED"],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RulesViolated { violations } => {
                write!(f, "Order group rejected at admission: ")?;
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            Self::Malformed { field, message } => {
                write!(f, "Malformed order group [{field}]: {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
