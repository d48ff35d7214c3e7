use bh_core::models::{Amount, AuctionId, BidId, BidKey, BidSource, DeveloperId, NormalizedBid};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A bid event as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Position in the log, starting at 1
    pub sequence: u64,
    /// The chain the entry was recorded on
    pub chain_id: u64,
    /// A 32-byte hash identifying the append, hex encoded with a `0x` prefix
    pub tx_hash: String,
    /// The auction the bid was placed on
    pub auction_id: AuctionId,
    /// The bidder
    pub developer_id: DeveloperId,
    /// The amount
    pub amount: Amount,
    /// The idempotency key of the bid
    pub bid_key: BidKey,
    /// The relational id of the bid
    pub bid_id: BidId,
    /// When the block holding the entry was sealed
    #[serde(with = "time::serde::rfc3339")]
    pub block_timestamp: OffsetDateTime,
}

impl From<LedgerEntry> for NormalizedBid {
    fn from(entry: LedgerEntry) -> Self {
        NormalizedBid::new(
            entry.sequence.to_string(),
            entry.auction_id,
            entry.developer_id,
            entry.amount,
            entry.block_timestamp,
            BidSource::Ledger,
            Some(entry.bid_key),
        )
    }
}
