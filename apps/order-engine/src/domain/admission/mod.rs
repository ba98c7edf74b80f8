//! Admission Bounded Context
//!
//! Field-level checks that gate entry into the coordinator. Every rule is a
//! pure function over the create command; all violations are reported at once.

pub mod errors;
pub mod limits;
pub mod rules;

pub use errors::{RuleViolation, ValidationError};
pub use limits::AdmissionLimits;
pub use rules::AdmissionPolicy;
