use time::OffsetDateTime;

use crate::models::{Bid, BidDraft, BidId, BidSource, Propagation};

/// The outbox that tracks copying relational bids to the replicas.
///
/// A bid and its outbox entries are created in one transaction, so a bid can
/// never exist in the relational store without a record of where it still
/// has to go.
pub trait PropagationRepository: super::Repository {
    /// Create a bid together with a pending outbox entry per target.
    ///
    /// # Returns
    ///
    /// - Ok(Ok(bid)) if created
    /// - Ok(Err(existing)) if the developer already bid on the auction
    /// - Err otherwise
    fn create_bid_with_propagation(
        &self,
        bid: &BidDraft,
        targets: &[BidSource],
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Result<Bid, Bid>, Self::Error>> + Send;

    /// The outbox entries for a bid
    fn get_propagations(
        &self,
        bid_id: BidId,
    ) -> impl Future<Output = Result<Vec<Propagation>, Self::Error>> + Send;

    /// Up to `limit` pending entries, oldest first, with their bids
    fn pending_propagations(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<(Bid, Propagation)>, Self::Error>> + Send;

    /// Record the outcome of a propagation attempt.
    ///
    /// Success marks the entry done. A failure stores the message and counts
    /// the attempt; once `max_attempts` failures accumulate the entry becomes
    /// failed and is no longer returned as pending.
    ///
    /// Returns the updated entry, or `None` if there is no such entry.
    fn record_propagation(
        &self,
        bid_id: BidId,
        target: BidSource,
        outcome: Result<(), String>,
        max_attempts: u32,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Option<Propagation>, Self::Error>> + Send;
}
