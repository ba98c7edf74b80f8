//! Roles a leg can play inside its group.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// Role of a leg within its order group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegRole {
    /// Opening order of a BO/CO, or the single order of a GTT.
    Entry,
    /// Profit-taking exit of a bracket order.
    Target,
    /// Protective exit of a bracket or cover order.
    StopLoss,
    /// Upper leg of a GTT one-cancels-other pair.
    OcoA,
    /// Lower leg of a GTT one-cancels-other pair.
    OcoB,
    /// First leg of a spread.
    Near,
    /// Second leg of a spread.
    Far,
    /// N-th disclosed slice of an iceberg (1-based).
    Slice(u32),
}

impl LegRole {
    /// Returns true for legs that close a position opened by the Entry.
    #[must_use]
    pub const fn is_exit(&self) -> bool {
        matches!(self, Self::Target | Self::StopLoss)
    }

    /// Returns true for legs whose fills count towards the group's quantity.
    ///
    /// Exits close what the Entry opened and the Far leg of a spread mirrors
    /// the Near leg, so neither is counted.
    #[must_use]
    pub const fn is_opening(&self) -> bool {
        matches!(
            self,
            Self::Entry | Self::OcoA | Self::OcoB | Self::Near | Self::Slice(_)
        )
    }

    /// The role that forms a one-cancels-other pair with this one.
    #[must_use]
    pub const fn oco_sibling(&self) -> Option<Self> {
        match self {
            Self::Target => Some(Self::StopLoss),
            Self::StopLoss => Some(Self::Target),
            Self::OcoA => Some(Self::OcoB),
            Self::OcoB => Some(Self::OcoA),
            _ => None,
        }
    }

    /// The paired leg of a spread.
    #[must_use]
    pub const fn spread_sibling(&self) -> Option<Self> {
        match self {
            Self::Near => Some(Self::Far),
            Self::Far => Some(Self::Near),
            _ => None,
        }
    }
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "ENTRY"),
            Self::Target => write!(f, "TARGET"),
            Self::StopLoss => write!(f, "STOP_LOSS"),
            Self::OcoA => write!(f, "OCO_A"),
            Self::OcoB => write!(f, "OCO_B"),
            Self::Near => write!(f, "NEAR"),
            Self::Far => write!(f, "FAR"),
            Self::Slice(n) => write!(f, "SLICE-{n}"),
        }
    }
}

impl FromStr for LegRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        if let Some(n) = normalized.strip_prefix("SLICE_") {
            return n
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::Slice)
                .ok_or_else(|| DomainError::invalid("role", format!("bad slice number: {s}")));
        }
        match normalized.as_str() {
            "ENTRY" => Ok(Self::Entry),
            "TARGET" => Ok(Self::Target),
            "STOP_LOSS" | "STOPLOSS" | "SL" => Ok(Self::StopLoss),
            "OCO_A" => Ok(Self::OcoA),
            "OCO_B" => Ok(Self::OcoB),
            "NEAR" => Ok(Self::Near),
            "FAR" => Ok(Self::Far),
            _ => Err(DomainError::UnknownVariant {
                kind: "leg role".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oco_siblings_are_symmetric() {
        for role in [LegRole::Target, LegRole::StopLoss, LegRole::OcoA, LegRole::OcoB] {
            let sibling = role.oco_sibling().unwrap();
            assert_eq!(sibling.oco_sibling(), Some(role));
        }
        assert_eq!(LegRole::Entry.oco_sibling(), None);
        assert_eq!(LegRole::Slice(2).oco_sibling(), None);
    }

    #[test]
    fn opening_and_exit_roles() {
        assert!(LegRole::Entry.is_opening());
        assert!(LegRole::Slice(4).is_opening());
        assert!(!LegRole::Target.is_opening());
        assert!(LegRole::StopLoss.is_exit());
        assert!(!LegRole::Far.is_opening());
    }

    #[test]
    fn parse_roles() {
        assert_eq!("sl".parse::<LegRole>().unwrap(), LegRole::StopLoss);
        assert_eq!("Stop-Loss".parse::<LegRole>().unwrap(), LegRole::StopLoss);
        assert_eq!("OCO-B".parse::<LegRole>().unwrap(), LegRole::OcoB);
        assert_eq!("Slice-3".parse::<LegRole>().unwrap(), LegRole::Slice(3));
        assert!("slice-0".parse::<LegRole>().is_err());
        assert!("exit".parse::<LegRole>().is_err());
    }

    #[test]
    fn display_slice() {
        assert_eq!(LegRole::Slice(7).to_string(), "SLICE-7");
        assert_eq!(
            LegRole::Slice(7).to_string().parse::<LegRole>().unwrap(),
            LegRole::Slice(7)
        );
    }
}
