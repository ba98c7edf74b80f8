//! Exchange segment codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// Exchange segment an order is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Exchange {
    /// National Stock Exchange, cash segment.
    Nse,
    /// Bombay Stock Exchange, cash segment.
    Bse,
    /// NSE futures and options.
    Nfo,
    /// BSE futures and options.
    Bfo,
    /// Multi Commodity Exchange.
    Mcx,
    /// Currency derivatives.
    Cds,
}

impl Exchange {
    /// Returns true for derivative segments.
    #[must_use]
    pub const fn is_derivative(&self) -> bool {
        matches!(self, Self::Nfo | Self::Bfo | Self::Mcx | Self::Cds)
    }

    /// Exchange code as used on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
            Self::Nfo => "NFO",
            Self::Bfo => "BFO",
            Self::Mcx => "MCX",
            Self::Cds => "CDS",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Exchange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(Self::Nse),
            "BSE" => Ok(Self::Bse),
            "NFO" => Ok(Self::Nfo),
            "BFO" => Ok(Self::Bfo),
            "MCX" => Ok(Self::Mcx),
            "CDS" => Ok(Self::Cds),
            other => Err(DomainError::UnknownVariant {
                kind: "exchange".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("nse".parse::<Exchange>().unwrap(), Exchange::Nse);
        assert_eq!(" MCX ".parse::<Exchange>().unwrap(), Exchange::Mcx);
    }

    #[test]
    fn parse_unknown_fails() {
        assert!("LSE".parse::<Exchange>().is_err());
    }

    #[test]
    fn derivative_segments() {
        assert!(Exchange::Nfo.is_derivative());
        assert!(!Exchange::Nse.is_derivative());
    }

    #[test]
    fn serde_uses_exchange_codes() {
        let json = serde_json::to_string(&Exchange::Nfo).unwrap();
        assert_eq!(json, "\"NFO\"");
    }
}
