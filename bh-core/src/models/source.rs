use std::{fmt::Display, str::FromStr};

use crate::MarketError;

/// The stores a bid can live in.
///
/// The wire names are the historical ones clients already send
/// (`postgres`, `firebase`, `blockchain`); the variant names describe the role
/// of each store.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum BidSource {
    /// The relational store, which is the source of truth
    #[serde(rename = "postgres", alias = "postgresql", alias = "relational")]
    Relational,
    /// The document store replica
    #[serde(rename = "firebase", alias = "document")]
    Document,
    /// The append-only ledger replica
    #[serde(rename = "blockchain", alias = "ledger")]
    Ledger,
}

impl BidSource {
    /// The canonical wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relational => "postgres",
            Self::Document => "firebase",
            Self::Ledger => "blockchain",
        }
    }
}

impl Display for BidSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BidSource {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "relational" => Ok(Self::Relational),
            "firebase" | "document" => Ok(Self::Document),
            "blockchain" | "ledger" => Ok(Self::Ledger),
            _ => Err(MarketError::InvalidSource(s.to_owned())),
        }
    }
}
