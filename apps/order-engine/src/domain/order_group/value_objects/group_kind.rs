//! Kinds of order groups accepted at intake.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// The conditional-order product an [`OrderGroup`](crate::domain::order_group::aggregate::OrderGroup) implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    /// Bracket order: entry plus target and stop-loss exits.
    #[serde(rename = "BO")]
    Bracket,
    /// Cover order: entry plus a compulsory stop-loss.
    #[serde(rename = "CO")]
    Cover,
    /// Two independent legs submitted together.
    #[serde(rename = "SPREAD")]
    Spread,
    /// Good-till-triggered single order.
    #[serde(rename = "GTT")]
    Gtt,
    /// Good-till-triggered one-cancels-other pair.
    #[serde(rename = "GTT_OCO")]
    GttOco,
    /// Large order released in disclosed slices.
    #[serde(rename = "ICEBERG")]
    Iceberg,
}

impl GroupKind {
    /// Returns true for groups built around an Entry leg with dependent exits.
    #[must_use]
    pub const fn has_entry_and_exits(&self) -> bool {
        matches!(self, Self::Bracket | Self::Cover)
    }

    /// Returns true if the group's legs wait on a price trigger before submission.
    #[must_use]
    pub const fn is_trigger_driven(&self) -> bool {
        matches!(self, Self::Gtt | Self::GttOco)
    }

    /// Short code used in logs and on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Bracket => "BO",
            Self::Cover => "CO",
            Self::Spread => "SPREAD",
            Self::Gtt => "GTT",
            Self::GttOco => "GTT_OCO",
            Self::Iceberg => "ICEBERG",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GroupKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "BO" | "BRACKET" => Ok(Self::Bracket),
            "CO" | "COVER" => Ok(Self::Cover),
            "SPREAD" => Ok(Self::Spread),
            "GTT" => Ok(Self::Gtt),
            "GTT_OCO" | "OCO" => Ok(Self::GttOco),
            "ICEBERG" => Ok(Self::Iceberg),
            other => Err(DomainError::UnknownVariant {
                kind: "group kind".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
