use tracing::{Level, event};

use crate::{
    MarketError,
    models::{Auction, AuctionId, AuctionQuery, AuctionUpdate, NewAuction},
    ports::{Application, AuctionRepository as _, DirectoryRepository as _},
};

/// Create a Pending auction for an existing project
pub async fn create_auction<A: Application>(
    app: &A,
    auction: &NewAuction,
) -> Result<Auction, MarketError> {
    auction.validate()?;
    let db = app.primary();

    if !db
        .project_exists(auction.project_id)
        .await
        .map_err(MarketError::relational)?
    {
        return Err(MarketError::ProjectNotFound(auction.project_id));
    }

    match db
        .create_auction(auction, app.now())
        .await
        .map_err(MarketError::relational)?
    {
        Ok(created) => {
            event!(
                Level::INFO,
                auction_id = %created.id,
                project_id = %created.project_id,
                "auction created"
            );
            Ok(created)
        }
        Err(auction_id) => Err(MarketError::AuctionExists {
            project_id: auction.project_id,
            auction_id,
        }),
    }
}

/// Retrieve an auction
pub async fn get_auction<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<Auction, MarketError> {
    app.primary()
        .get_auction(auction_id)
        .await
        .map_err(MarketError::relational)?
        .ok_or(MarketError::AuctionNotFound(auction_id))
}

/// List auctions matching the filters
pub async fn list_auctions<A: Application>(
    app: &A,
    query: &AuctionQuery,
) -> Result<Vec<Auction>, MarketError> {
    app.primary()
        .query_auctions(query)
        .await
        .map_err(MarketError::relational)
}

/// Change an auction's status and/or deadline.
///
/// The update is validated against the stored auction and written only if
/// the status has not moved since. If it lost a race, the update is validated
/// once more against the fresh row.
pub async fn update_auction<A: Application>(
    app: &A,
    auction_id: AuctionId,
    update: &AuctionUpdate,
) -> Result<Auction, MarketError> {
    let db = app.primary();
    let mut last_seen = None;

    for _ in 0..2 {
        let now = app.now();
        let auction = get_auction(app, auction_id).await?;
        let changes = auction.plan_update(update, now)?;

        if let Some(updated) = db
            .update_auction(auction_id, &changes, now)
            .await
            .map_err(MarketError::relational)?
        {
            event!(
                Level::INFO,
                auction_id = %auction_id,
                from = %changes.expected,
                to = %updated.status,
                "auction updated"
            );
            return Ok(updated);
        }
        last_seen = Some((auction.status, changes.status));
    }

    match last_seen {
        Some((from, to)) => Err(MarketError::InvalidTransition { from, to }),
        None => Err(MarketError::AuctionNotFound(auction_id)),
    }
}

/// Delete a Pending or Cancelled auction together with its bids
pub async fn delete_auction<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<Auction, MarketError> {
    let auction = get_auction(app, auction_id).await?;
    auction.check_deletable()?;

    if app
        .primary()
        .delete_auction(auction_id)
        .await
        .map_err(MarketError::relational)?
    {
        event!(Level::INFO, auction_id = %auction_id, "auction deleted");
        Ok(auction)
    } else {
        // the status moved between the read and the delete
        let current = get_auction(app, auction_id).await?;
        Err(MarketError::DeletionNotAllowed(current.status))
    }
}

/// Complete every Active auction whose deadline has passed
pub async fn expire_auctions<A: Application>(app: &A) -> Result<Vec<AuctionId>, MarketError> {
    let expired = app
        .primary()
        .expire_auctions(app.now())
        .await
        .map_err(MarketError::relational)?;
    if !expired.is_empty() {
        event!(Level::INFO, count = expired.len(), "completed expired auctions");
    }
    Ok(expired)
}
