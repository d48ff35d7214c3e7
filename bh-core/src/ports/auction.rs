use time::OffsetDateTime;

use crate::models::{Auction, AuctionChanges, AuctionId, AuctionQuery, NewAuction};

/// Repository interface for auctions.
///
/// Auctions are only ever written through this trait; the lifecycle rules
/// live in [`Auction::plan_update`] and the services, so implementations only
/// need to apply already-validated changes.
pub trait AuctionRepository: super::Repository {
    /// Retrieve an auction, returning `None` if it does not exist
    fn get_auction(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Option<Auction>, Self::Error>> + Send;

    /// Create a Pending auction for a project.
    ///
    /// # Returns
    ///
    /// - Ok(Ok(auction)) if created
    /// - Ok(Err(existing_id)) if the project already has an auction
    /// - Err(repository_error) otherwise
    fn create_auction(
        &self,
        auction: &NewAuction,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Result<Auction, AuctionId>, Self::Error>> + Send;

    /// List auctions matching every filter present in `query`, oldest first
    fn query_auctions(
        &self,
        query: &AuctionQuery,
    ) -> impl Future<Output = Result<Vec<Auction>, Self::Error>> + Send;

    /// Apply a validated update.
    ///
    /// The write is conditional on the stored status still being
    /// `changes.expected`, so two racing transitions cannot both succeed.
    ///
    /// # Returns
    ///
    /// - Ok(Some(auction)) with the updated auction
    /// - Ok(None) if the auction is gone or its status moved in the meantime
    /// - Err otherwise
    fn update_auction(
        &self,
        auction_id: AuctionId,
        changes: &AuctionChanges,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Option<Auction>, Self::Error>> + Send;

    /// Delete an auction and its bids, but only if it is Pending or Cancelled.
    ///
    /// Returns `true` if a row was removed.
    fn delete_auction(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Move every Active auction whose deadline is before `as_of` to Completed.
    ///
    /// Returns the ids that changed.
    fn expire_auctions(
        &self,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Vec<AuctionId>, Self::Error>> + Send;
}
