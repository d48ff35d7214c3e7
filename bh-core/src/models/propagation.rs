use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AuctionId, BidId, BidSource};

/// Where a bid stands with respect to one replica
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationState {
    /// Not yet written to the replica
    Pending,
    /// Written to the replica
    Done,
    /// Gave up after too many attempts
    Failed,
}

impl PropagationState {
    /// The stored representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl Display for PropagationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropagationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown propagation state {other}")),
        }
    }
}

/// The outbox entry tracking one bid's copy in one replica
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Propagation {
    /// The relational bid
    pub bid_id: BidId,
    /// The replica
    pub target: BidSource,
    /// Progress so far
    pub state: PropagationState,
    /// Failed attempts so far
    pub attempts: u32,
    /// The most recent failure, if any
    pub last_error: Option<String>,
    /// When the entry last changed
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Counts from one pass of the propagation worker
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Entries the worker tried
    pub attempted: usize,
    /// Entries now done
    pub succeeded: usize,
    /// Entries that failed this time
    pub failed: usize,
}

/// Counts from copying an auction's relational bids to the replicas
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// The auction synced
    pub auction_id: AuctionId,
    /// Relational bids considered
    pub postgres_count: usize,
    /// Documents newly written
    pub firebase_inserted: usize,
    /// Ledger entries newly written; absent when the ledger is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_inserted: Option<usize>,
}
