use tracing::{Level, event};

use super::auctions::get_auction;
use crate::{
    MarketError,
    models::{AuctionId, AuctionStatus, NewWinner, Winner},
    ports::{Application, PrimaryBidRepository as _, WinnerRepository as _},
};

/// Record a bid as the winner of a completed auction
pub async fn select_winner<A: Application>(
    app: &A,
    auction_id: AuctionId,
    request: &NewWinner,
) -> Result<Winner, MarketError> {
    let auction = get_auction(app, auction_id).await?;
    if auction.status != AuctionStatus::Completed {
        return Err(MarketError::AuctionNotCompleted(auction.status));
    }

    let db = app.primary();
    let bid = db
        .get_bid(request.bid_id)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::BidNotFound(request.bid_id))?;
    if bid.auction_id != auction_id {
        return Err(MarketError::BidAuctionMismatch {
            bid_id: bid.id,
            auction_id,
        });
    }

    match db
        .create_winner(&bid, app.now())
        .await
        .map_err(MarketError::relational)?
    {
        Ok(winner) => {
            event!(
                Level::INFO,
                auction_id = %auction_id,
                bid_id = %bid.id,
                developer_id = %winner.winner_id,
                "winner selected"
            );
            Ok(winner)
        }
        Err(existing) => Err(MarketError::WinnerExists {
            auction_id,
            winner_id: existing.id,
        }),
    }
}

/// The winner of an auction
pub async fn get_winner<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<Winner, MarketError> {
    app.primary()
        .get_winner(auction_id)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::WinnerNotFound(auction_id))
}
