use time::OffsetDateTime;
use tracing::{Level, event};

use crate::{
    MarketError,
    models::{Auction, AuctionId, BidDraft, NewBid},
    ports::{
        Application, AuctionRepository as _, DirectoryRepository as _, PrimaryBidRepository as _,
    },
};

/// Load an auction and check that it accepts bids right now.
///
/// This is re-evaluated on every bid write and never cached, since the
/// auction's status and the clock both move.
pub async fn ensure_live_auction<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<Auction, MarketError> {
    live_auction_at(app, auction_id, app.now()).await
}

pub(super) async fn live_auction_at<A: Application>(
    app: &A,
    auction_id: AuctionId,
    now: OffsetDateTime,
) -> Result<Auction, MarketError> {
    let auction = app
        .primary()
        .get_auction(auction_id)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::AuctionNotFound(auction_id))?;
    auction.check_live(now)?;
    Ok(auction)
}

/// Decide whether a new bid may be placed, producing the draft to write.
///
/// The existing-bid check only short-circuits the common case; the unique
/// constraint in the relational store decides races.
pub async fn admit_bid<A: Application>(app: &A, bid: &NewBid) -> Result<BidDraft, MarketError> {
    let now = app.now();
    let db = app.primary();

    live_auction_at(app, bid.auction_id, now).await?;

    if !db
        .developer_exists(bid.developer_id)
        .await
        .map_err(MarketError::relational)?
    {
        return Err(MarketError::DeveloperNotFound(bid.developer_id));
    }

    if let Some(existing) = db
        .find_bid(bid.auction_id, bid.developer_id)
        .await
        .map_err(MarketError::relational)?
    {
        event!(
            Level::DEBUG,
            auction_id = %bid.auction_id,
            developer_id = %bid.developer_id,
            bid_id = %existing.id,
            "rejecting second bid"
        );
        return Err(MarketError::BidExists {
            auction_id: existing.auction_id,
            developer_id: existing.developer_id,
            bid_id: existing.id,
            amount: existing.amount,
        });
    }

    Ok(BidDraft {
        auction_id: bid.auction_id,
        developer_id: bid.developer_id,
        amount: bid.amount,
        key: app.generate_bid_key(),
        created_at: now,
    })
}
