use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Amount, AuctionId, BidId, DeveloperId, WinnerId};

/// The bid chosen to win an auction. Written once, never changed.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    /// The record id
    pub id: WinnerId,
    /// The winning bid
    pub bid_id: BidId,
    /// The auction won
    pub auction_id: AuctionId,
    /// The developer who placed the bid
    pub winner_id: DeveloperId,
    /// The bid amount at the time of selection
    pub bid_amount: Amount,
    /// When the winner was chosen
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for choosing a winner
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWinner {
    /// The bid to promote
    pub bid_id: BidId,
}
