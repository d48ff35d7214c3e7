use futures::future::join_all;
use tracing::{Level, event};

use super::{
    admission::admit_bid,
    auctions::get_auction,
    propagation::{propagate_to, settle},
};
use crate::{
    MarketError,
    models::{
        AuctionId, BidComparison, BidListing, BidSource, DeveloperId, DualWriteOutcome, NewBid,
        NormalizedBid, Page, SourceFailure, StorageSelection, SyncReport,
    },
    ports::{Application, BidLedger, BidRepository, PropagationRepository as _},
};

/// One bid store, picked by [`BidSource`].
///
/// This is the factory the reconciliation operations read through, so each
/// of them handles every store the same way.
pub enum BidBackend<'a, A: Application> {
    /// The relational store
    Relational(&'a A::Primary),
    /// The document store
    Document(&'a A::Document),
    /// The ledger
    Ledger(&'a A::Ledger),
}

impl<'a, A: Application> BidBackend<'a, A> {
    /// Pick the store for `source`; a disabled ledger is an invalid source
    pub fn select(app: &'a A, source: BidSource) -> Result<Self, MarketError> {
        match source {
            BidSource::Relational => Ok(Self::Relational(app.primary())),
            BidSource::Document => Ok(Self::Document(app.document())),
            BidSource::Ledger => app
                .ledger()
                .map(Self::Ledger)
                .ok_or_else(|| MarketError::InvalidSource(source.to_string())),
        }
    }

    /// Which store this is
    pub fn source(&self) -> BidSource {
        match self {
            Self::Relational(_) => BidSource::Relational,
            Self::Document(_) => BidSource::Document,
            Self::Ledger(_) => BidSource::Ledger,
        }
    }

    /// An auction's bids from this store, normalized
    pub async fn bids_for_auction(
        &self,
        auction_id: AuctionId,
    ) -> Result<Vec<NormalizedBid>, MarketError> {
        let source = self.source();
        match self {
            Self::Relational(db) => BidRepository::get_bids_by_auction(*db, auction_id)
                .await
                .map(normalize)
                .map_err(|err| MarketError::backend(source, err)),
            Self::Document(db) => BidRepository::get_bids_by_auction(*db, auction_id)
                .await
                .map(normalize)
                .map_err(|err| MarketError::backend(source, err)),
            Self::Ledger(ledger) => BidLedger::get_bids_by_auction(*ledger, auction_id)
                .await
                .map(normalize)
                .map_err(|err| MarketError::backend(source, err)),
        }
    }

    /// Every bid in this store, normalized
    pub async fn all_bids(&self) -> Result<Vec<NormalizedBid>, MarketError> {
        let source = self.source();
        match self {
            Self::Relational(db) => BidRepository::get_all_bids(*db)
                .await
                .map(normalize)
                .map_err(|err| MarketError::backend(source, err)),
            Self::Document(db) => BidRepository::get_all_bids(*db)
                .await
                .map(normalize)
                .map_err(|err| MarketError::backend(source, err)),
            Self::Ledger(ledger) => BidLedger::get_all_bids(*ledger)
                .await
                .map(normalize)
                .map_err(|err| MarketError::backend(source, err)),
        }
    }
}

fn normalize<R: Into<NormalizedBid>>(records: Vec<R>) -> Vec<NormalizedBid> {
    records.into_iter().map(Into::into).collect()
}

/// An auction's bids as held by one store
pub async fn get_bids_by_source<A: Application>(
    app: &A,
    auction_id: AuctionId,
    source: BidSource,
) -> Result<Vec<NormalizedBid>, MarketError> {
    BidBackend::select(app, source)?
        .bids_for_auction(auction_id)
        .await
}

/// Report how an auction's bids differ between the relational and document stores
pub async fn compare_bid_sources<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<BidComparison, MarketError> {
    let relational = BidBackend::<A>::Relational(app.primary());
    let document = BidBackend::<A>::Document(app.document());
    let (relational, document) = tokio::join!(
        relational.bids_for_auction(auction_id),
        document.bids_for_auction(auction_id),
    );

    let comparison = BidComparison::build(auction_id, relational?, document?);
    if !comparison.is_consistent {
        event!(
            Level::WARN,
            auction_id = %auction_id,
            postgres_only = comparison.summary.postgres_only_count,
            firebase_only = comparison.summary.firebase_only_count,
            mismatched = comparison.summary.mismatched_count,
            "bid stores diverge"
        );
    }
    Ok(comparison)
}

/// Place a bid and copy it to every enabled replica.
///
/// The relational row and one outbox entry per replica are committed
/// together, then each replica is written inline. If any replica fails the
/// call fails with [`MarketError::PropagationPending`]; the outbox keeps the
/// failed copies queued and the worker finishes them later.
pub async fn create_bid_in_both_sources<A: Application>(
    app: &A,
    bid: &NewBid,
) -> Result<DualWriteOutcome, MarketError> {
    let draft = admit_bid(app, bid).await?;

    let mut targets = vec![BidSource::Document];
    if app.ledger().is_some() {
        targets.push(BidSource::Ledger);
    }

    let created = app
        .primary()
        .create_bid_with_propagation(&draft, &targets, draft.created_at)
        .await
        .map_err(MarketError::relational)?
        .map_err(|existing| MarketError::BidExists {
            auction_id: existing.auction_id,
            developer_id: existing.developer_id,
            bid_id: existing.id,
            amount: existing.amount,
        })?;

    let committed = &created;
    let attempts = join_all(targets.iter().map(|&target| async move {
        let outcome = propagate_to(app, committed, target).await;
        (target, outcome)
    }))
    .await;

    let mut outcome = DualWriteOutcome {
        postgres: created.clone(),
        firebase: None,
        blockchain: None,
    };
    let mut failures = Vec::new();
    let mut unrecorded = None;
    for (target, result) in attempts {
        // every target is recorded before an outbox error is returned
        if let Err(err) = settle(app, &created, target, &result).await {
            event!(
                Level::ERROR,
                bid_id = %created.id,
                target = %target,
                err = err.to_string(),
                "could not record propagation"
            );
            unrecorded.get_or_insert(err);
        }
        match (target, result) {
            (BidSource::Document, Ok(copy)) => outcome.firebase = Some(copy),
            (BidSource::Ledger, Ok(copy)) => outcome.blockchain = Some(copy),
            (_, Ok(_)) => {}
            (source, Err(err)) => failures.push(SourceFailure {
                source,
                message: err.to_string(),
            }),
        }
    }

    if let Some(err) = unrecorded {
        return Err(err);
    }
    if failures.is_empty() {
        event!(
            Level::INFO,
            bid_id = %created.id,
            auction_id = %created.auction_id,
            "bid placed in every store"
        );
        Ok(outcome)
    } else {
        Err(MarketError::PropagationPending {
            bid: Box::new(created),
            failures,
        })
    }
}

/// A merged, paginated listing across the selected stores.
///
/// When several stores are read, a failing store is reported in `errors` and
/// the others still list. When a single store is requested, its failure fails
/// the call.
pub async fn list_bids<A: Application>(
    app: &A,
    storage: StorageSelection,
    page: Page,
    auction_id: Option<AuctionId>,
) -> Result<BidListing, MarketError> {
    let backends = storage
        .sources(app.ledger().is_some())
        .into_iter()
        .map(|source| BidBackend::select(app, source))
        .collect::<Result<Vec<_>, _>>()?;

    let reads = join_all(backends.iter().map(|backend| async move {
        let records = match auction_id {
            Some(auction_id) => backend.bids_for_auction(auction_id).await,
            None => backend.all_bids().await,
        };
        (backend.source(), records)
    }))
    .await;

    let mut records = Vec::new();
    let mut sources = Vec::new();
    let mut errors = Vec::new();
    for (source, read) in reads {
        match read {
            Ok(mut partition) => {
                records.append(&mut partition);
                sources.push(source);
            }
            Err(err) if matches!(storage, StorageSelection::Only(_)) => return Err(err),
            Err(err) => {
                event!(
                    Level::WARN,
                    source = %source,
                    err = err.to_string(),
                    "listing without store"
                );
                errors.push(SourceFailure {
                    source,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(BidListing::merge(records, page, sources, errors))
}

/// Copy an auction's relational bids to the replicas that lack them
pub async fn sync_auction<A: Application>(
    app: &A,
    auction_id: AuctionId,
) -> Result<SyncReport, MarketError> {
    get_auction(app, auction_id).await?;

    let bids = BidRepository::get_bids_by_auction(app.primary(), auction_id)
        .await
        .map_err(MarketError::relational)?;

    let firebase_inserted = app
        .document()
        .sync_bids(&bids)
        .await
        .map_err(|err| MarketError::backend(BidSource::Document, err))?;

    let blockchain_inserted = match app.ledger() {
        Some(ledger) => {
            let mut inserted = 0;
            for bid in &bids {
                if ledger
                    .create_bid_on_chain(bid)
                    .await
                    .map_err(|err| MarketError::backend(BidSource::Ledger, err))?
                    .is_ok()
                {
                    inserted += 1;
                }
            }
            Some(inserted)
        }
        None => None,
    };

    event!(
        Level::INFO,
        auction_id = %auction_id,
        postgres = bids.len(),
        firebase_inserted,
        "synced auction"
    );
    Ok(SyncReport {
        auction_id,
        postgres_count: bids.len(),
        firebase_inserted,
        blockchain_inserted,
    })
}

/// Every ledger entry placed by a developer
pub async fn ledger_bids_by_developer<A: Application>(
    app: &A,
    developer_id: DeveloperId,
) -> Result<Vec<NormalizedBid>, MarketError> {
    let ledger = app
        .ledger()
        .ok_or_else(|| MarketError::InvalidSource(BidSource::Ledger.to_string()))?;
    ledger
        .get_bids_by_developer(developer_id)
        .await
        .map(normalize)
        .map_err(|err| MarketError::backend(BidSource::Ledger, err))
}
