use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Amount, AuctionId, BidId, BidKey, BidSource, DeveloperId, NormalizedBid};

/// A bid as stored in the relational store, which is the source of truth.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// The relational id
    pub id: BidId,
    /// The auction the bid was placed on
    pub auction_id: AuctionId,
    /// The bidder
    pub developer_id: DeveloperId,
    /// The bid amount
    pub amount: Amount,
    /// The idempotency key shared with the replicas
    pub key: BidKey,
    /// When the bid was placed
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the amount last changed
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Bid> for NormalizedBid {
    fn from(bid: Bid) -> Self {
        NormalizedBid::new(
            bid.id.to_string(),
            bid.auction_id,
            bid.developer_id,
            bid.amount,
            bid.created_at,
            BidSource::Relational,
            Some(bid.key),
        )
    }
}

/// The request body for placing a bid
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBid {
    /// The auction to bid on
    pub auction_id: AuctionId,
    /// The bidder
    pub developer_id: DeveloperId,
    /// The bid amount
    pub amount: Amount,
}

/// The request body for changing a bid
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidUpdate {
    /// The new amount
    pub amount: Amount,
}

/// A bid that has been admitted but not yet written.
///
/// Every store receives the same draft, so the key and creation time agree
/// across copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidDraft {
    /// The auction to bid on
    pub auction_id: AuctionId,
    /// The bidder
    pub developer_id: DeveloperId,
    /// The bid amount
    pub amount: Amount,
    /// The idempotency key
    pub key: BidKey,
    /// When the bid was placed
    pub created_at: OffsetDateTime,
}

impl From<&Bid> for BidDraft {
    fn from(bid: &Bid) -> Self {
        Self {
            auction_id: bid.auction_id,
            developer_id: bid.developer_id,
            amount: bid.amount,
            key: bid.key,
            created_at: bid.created_at,
        }
    }
}

/// The result of writing a bid to every store.
///
/// The replica fields are `None` only when that replica is disabled.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualWriteOutcome {
    /// The relational row
    pub postgres: Bid,
    /// The document store copy
    pub firebase: Option<NormalizedBid>,
    /// The ledger copy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain: Option<NormalizedBid>,
}
