use crate::models::{AuctionId, Bid, DeveloperId, NormalizedBid};

/// An append-only log of placed bids.
///
/// Entries are never updated or removed. Writes are idempotent on the bid's
/// idempotency key: writing the same bid twice returns the original entry.
pub trait BidLedger: super::Repository {
    /// The ledger-native entry
    type Record: Into<NormalizedBid> + Clone + Send + Sync + 'static;

    /// Append a bid.
    ///
    /// # Returns
    ///
    /// - Ok(Ok(entry)) with the new entry
    /// - Ok(Err(entry)) with the entry already recorded under the bid's key
    /// - Err otherwise
    fn create_bid_on_chain(
        &self,
        bid: &Bid,
    ) -> impl Future<Output = Result<Result<Self::Record, Self::Record>, Self::Error>> + Send;

    /// Entries for an auction, in append order
    fn get_bids_by_auction(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>> + Send;

    /// Entries placed by a developer, in append order
    fn get_bids_by_developer(
        &self,
        developer_id: DeveloperId,
    ) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>> + Send;

    /// Every entry, in append order
    fn get_all_bids(&self) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>> + Send;
}
