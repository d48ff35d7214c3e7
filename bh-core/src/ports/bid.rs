use time::OffsetDateTime;

use crate::models::{Amount, AuctionId, Bid, BidDraft, BidId, BidSource, DeveloperId, NormalizedBid};

/// The capabilities every bid store provides.
///
/// Each store keeps bids in its own native shape (`Record`), which converts
/// into the common [`NormalizedBid`] for listings and comparisons.
pub trait BidRepository: super::Repository {
    /// The store-native bid record
    type Record: Into<NormalizedBid> + Clone + Send + Sync + 'static;

    /// Which store this is
    const SOURCE: BidSource;

    /// All bids on an auction, oldest first (ties broken by id)
    fn get_bids_by_auction(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>> + Send;

    /// Write a bid.
    ///
    /// # Returns
    ///
    /// - Ok(Ok(record)) with the new record
    /// - Ok(Err(existing)) with the record that blocked the write: the
    ///   developer's existing bid for the relational store, the record with
    ///   the same idempotency key for replicas
    /// - Err otherwise
    fn create_bid(
        &self,
        bid: &BidDraft,
    ) -> impl Future<Output = Result<Result<Self::Record, Self::Record>, Self::Error>> + Send;

    /// The most recent bid on an auction
    fn get_last_bid(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Option<Self::Record>, Self::Error>> + Send;

    /// Insert every bid not already present, skipping conflicts.
    ///
    /// Returns the number of records actually inserted, so calling this twice
    /// with the same batch reports zero the second time.
    fn sync_bids(&self, bids: &[Bid]) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Every bid in the store
    fn get_all_bids(&self) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>> + Send;
}

/// The extra bid operations only the relational store supports.
pub trait PrimaryBidRepository: BidRepository<Record = Bid> {
    /// Retrieve a bid by id
    fn get_bid(
        &self,
        bid_id: BidId,
    ) -> impl Future<Output = Result<Option<Bid>, Self::Error>> + Send;

    /// Retrieve a developer's bid on an auction
    fn find_bid(
        &self,
        auction_id: AuctionId,
        developer_id: DeveloperId,
    ) -> impl Future<Output = Result<Option<Bid>, Self::Error>> + Send;

    /// Change the amount of a bid, returning `None` if it does not exist
    fn update_bid_amount(
        &self,
        bid_id: BidId,
        amount: Amount,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Option<Bid>, Self::Error>> + Send;

    /// Remove a bid, returning `true` if a row was removed
    fn delete_bid(&self, bid_id: BidId) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}
