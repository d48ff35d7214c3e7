use tracing::{Level, event};

use super::admission::{admit_bid, live_auction_at};
use crate::{
    MarketError,
    models::{AuctionId, Bid, BidId, BidUpdate, DeveloperId, NewBid},
    ports::{Application, BidRepository as _, PrimaryBidRepository as _},
};

/// Place a bid in the relational store only
pub async fn create_bid<A: Application>(app: &A, bid: &NewBid) -> Result<Bid, MarketError> {
    let draft = admit_bid(app, bid).await?;

    match app
        .primary()
        .create_bid(&draft)
        .await
        .map_err(MarketError::relational)?
    {
        Ok(created) => {
            event!(
                Level::INFO,
                bid_id = %created.id,
                auction_id = %created.auction_id,
                "bid placed"
            );
            Ok(created)
        }
        Err(existing) => Err(MarketError::BidExists {
            auction_id: existing.auction_id,
            developer_id: existing.developer_id,
            bid_id: existing.id,
            amount: existing.amount,
        }),
    }
}

async fn owned_bid<A: Application>(
    app: &A,
    actor: DeveloperId,
    bid_id: BidId,
) -> Result<Bid, MarketError> {
    let bid = app
        .primary()
        .get_bid(bid_id)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::BidNotFound(bid_id))?;

    if bid.developer_id != actor {
        return Err(MarketError::Permission(format!(
            "bid {bid_id} belongs to another developer"
        )));
    }
    Ok(bid)
}

/// Change the amount of the actor's own bid while its auction is live
pub async fn update_bid<A: Application>(
    app: &A,
    actor: DeveloperId,
    bid_id: BidId,
    update: &BidUpdate,
) -> Result<Bid, MarketError> {
    let bid = owned_bid(app, actor, bid_id).await?;
    let now = app.now();
    live_auction_at(app, bid.auction_id, now).await?;

    app.primary()
        .update_bid_amount(bid_id, update.amount, now)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::BidNotFound(bid_id))
}

/// Withdraw the actor's own bid while its auction is live
pub async fn delete_bid<A: Application>(
    app: &A,
    actor: DeveloperId,
    bid_id: BidId,
) -> Result<Bid, MarketError> {
    let bid = owned_bid(app, actor, bid_id).await?;
    live_auction_at(app, bid.auction_id, app.now()).await?;

    if app
        .primary()
        .delete_bid(bid_id)
        .await
        .map_err(MarketError::relational)?
    {
        event!(Level::INFO, bid_id = %bid_id, auction_id = %bid.auction_id, "bid withdrawn");
        Ok(bid)
    } else {
        Err(MarketError::BidNotFound(bid_id))
    }
}

/// All relational bids on an auction, oldest first
pub async fn bids_for_auction<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<Vec<Bid>, MarketError> {
    app.primary()
        .get_bids_by_auction(auction_id)
        .await
        .map_err(MarketError::relational)
}

/// The most recent relational bid on an auction
pub async fn last_bid<A: Application>(app: &A, auction_id: AuctionId) -> Result<Bid, MarketError> {
    app.primary()
        .get_last_bid(auction_id)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::NoBids(auction_id))
}
