use tracing::{Instrument as _, Level, event, span};

use crate::{
    MarketError,
    models::{Bid, BidDraft, BidId, BidSource, NormalizedBid, Propagation, PropagationReport},
    ports::{
        Application, BidLedger as _, BidRepository as _, PrimaryBidRepository as _,
        PropagationRepository as _,
    },
};

/// Copy a relational bid to one replica.
///
/// Writing a bid the replica already holds is not an error: the existing copy
/// is returned, so retries are safe.
pub async fn propagate_to<A: Application>(
    app: &A,
    bid: &Bid,
    target: BidSource,
) -> Result<NormalizedBid, MarketError> {
    match target {
        BidSource::Document => {
            let written = app
                .document()
                .create_bid(&BidDraft::from(bid))
                .await
                .map_err(|err| MarketError::backend(BidSource::Document, err))?;
            Ok(written.unwrap_or_else(|existing| existing).into())
        }
        BidSource::Ledger => {
            let ledger = app
                .ledger()
                .ok_or_else(|| MarketError::InvalidSource(BidSource::Ledger.to_string()))?;
            let written = ledger
                .create_bid_on_chain(bid)
                .await
                .map_err(|err| MarketError::backend(BidSource::Ledger, err))?;
            Ok(written.unwrap_or_else(|existing| existing).into())
        }
        BidSource::Relational => Err(MarketError::InvalidSource(target.to_string())),
    }
}

/// Record the outcome of one propagation attempt in the outbox
pub(super) async fn settle<A: Application>(
    app: &A,
    bid: &Bid,
    target: BidSource,
    outcome: &Result<NormalizedBid, MarketError>,
) -> Result<Option<Propagation>, MarketError> {
    let outcome = match outcome {
        Ok(_) => Ok(()),
        Err(err) => {
            event!(
                Level::WARN,
                bid_id = %bid.id,
                target = %target,
                err = err.to_string(),
                "propagation failed"
            );
            Err(err.to_string())
        }
    };
    app.primary()
        .record_propagation(
            bid.id,
            target,
            outcome,
            app.max_propagation_attempts(),
            app.now(),
        )
        .await
        .map_err(MarketError::relational)
}

/// Retry up to `limit` pending outbox entries
pub async fn propagate_pending<A: Application>(
    app: &A,
    limit: usize,
) -> Result<PropagationReport, MarketError> {
    let pending = app
        .primary()
        .pending_propagations(limit)
        .await
        .map_err(MarketError::relational)?;

    let mut report = PropagationReport::default();
    for (bid, entry) in pending {
        let span = span!(Level::DEBUG, "propagate", bid_id = %bid.id, target = %entry.target);
        let outcome = propagate_to(app, &bid, entry.target).instrument(span).await;
        settle(app, &bid, entry.target, &outcome).await?;

        report.attempted += 1;
        if outcome.is_ok() {
            report.succeeded += 1;
        } else {
            report.failed += 1;
        }
    }
    Ok(report)
}

/// The outbox entries for a bid
pub async fn propagation_status<A: Application>(
    app: &A,
    bid_id: BidId,
) -> Result<Vec<Propagation>, MarketError> {
    let db = app.primary();
    if db
        .get_bid(bid_id)
        .await
        .map_err(MarketError::relational)?
        .is_none()
    {
        return Err(MarketError::BidNotFound(bid_id));
    }
    db.get_propagations(bid_id)
        .await
        .map_err(MarketError::relational)
}
