use time::OffsetDateTime;

use crate::models::{AuctionId, Bid, Winner};

/// Repository interface for auction winners
pub trait WinnerRepository: super::Repository {
    /// Record `bid` as the winner of its auction, snapshotting the amount.
    ///
    /// # Returns
    ///
    /// - Ok(Ok(winner)) if recorded
    /// - Ok(Err(existing)) if the auction already has a winner
    /// - Err otherwise
    fn create_winner(
        &self,
        bid: &Bid,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Result<Winner, Winner>, Self::Error>> + Send;

    /// The winner of an auction, if one was chosen
    fn get_winner(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Option<Winner>, Self::Error>> + Send;
}
