//! Bid endpoints, covering both single-store writes and the multi-store
//! reconciliation operations.

use std::sync::Arc;

use aide::axum::{
    ApiRouter,
    routing::{delete, get, post, put},
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::TypedHeader;
use bh_core::{
    MarketError,
    models::{
        AuctionId, Bid, BidComparison, BidId, BidListing, BidSource, BidUpdate, DeveloperId,
        DualWriteOutcome, NewBid, NormalizedBid, Page, Propagation, StorageSelection, SyncReport,
    },
    services,
};
use headers::{Authorization, authorization::Bearer};
use schemars::JsonSchema;
use serde::Deserialize;

use super::{acting_developer, require_developer, require_manager};
use crate::{
    ApiApplication,
    config::AxumConfig,
    error::ApiError,
    extract::{ValidJson, ValidPath, ValidQuery},
};

#[derive(Deserialize, JsonSchema)]
struct AuctionPath {
    /// The auction
    auction_id: AuctionId,
}

#[derive(Deserialize, JsonSchema)]
struct BidPath {
    /// The bid
    bid_id: BidId,
}

#[derive(Deserialize, JsonSchema)]
struct DeveloperPath {
    /// The bidder
    developer_id: DeveloperId,
}

/// Which store to read
#[derive(Deserialize, JsonSchema)]
struct SourceQuery {
    /// `postgres` (or `postgresql`), `firebase` or `blockchain`
    #[serde(default)]
    source: Option<String>,
}

/// Parameters of the merged listing
#[derive(Deserialize, JsonSchema)]
struct ListQuery {
    /// `postgresql`, `firebase`, `blockchain` or `both` (the default)
    #[serde(default)]
    storage: Option<String>,
    /// Page size, default 10
    #[serde(default)]
    limit: Option<usize>,
    /// Records to skip, default 0
    #[serde(default)]
    offset: Option<usize>,
    /// Restrict the listing to one auction
    #[serde(default)]
    auction_id: Option<AuctionId>,
}

/// Creates a router with bid endpoints.
pub fn router<T: ApiApplication>() -> ApiRouter<T> {
    ApiRouter::new()
        .api_route("/create", post(create_bid::<T>))
        .api_route("/auction/{auction_id}", get(bids_for_auction::<T>))
        .api_route("/auction/{auction_id}/last", get(last_bid::<T>))
        .api_route("/update/{bid_id}", put(update_bid::<T>))
        .api_route("/delete/{bid_id}", delete(delete_bid::<T>))
        .api_route("/source/{auction_id}", get(bids_by_source::<T>))
        .api_route("/compare/{auction_id}", get(compare_sources::<T>))
        .api_route("/dual", post(create_dual_bid::<T>))
        .api_route("/dual-list", get(list_bids::<T>))
        .api_route("/sync/{auction_id}", post(sync_auction::<T>))
        .api_route("/propagation/{bid_id}", get(propagation_status::<T>))
        .api_route(
            "/ledger/developer/{developer_id}",
            get(ledger_bids_by_developer::<T>),
        )
}

/// Place a bid in the relational store.
///
/// The auction must be active and inside its bidding window, and the
/// developer may hold only one bid per auction.
///
/// # Authorization
///
/// The token must act for the bidding developer.
///
/// # Returns
///
/// - `201 Created`: The new bid
/// - `400 Bad Request`: Malformed ids or a non-positive amount
/// - `403 Forbidden`: The token acts for someone else
/// - `404 Not Found`: The auction or the developer does not exist
/// - `409 Conflict`: The developer already bid; the body names that bid
/// - `422 Unprocessable Entity`: Bidding is not open
async fn create_bid<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidJson(body): ValidJson<NewBid>,
) -> Result<(StatusCode, Json<Bid>), ApiError> {
    require_developer(&app, &auth, body.developer_id).await?;
    let bid = services::create_bid(&app, &body)
        .await
        .map_err(|err| ApiError::new(err, &config))?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// Every relational bid on an auction, oldest first.
async fn bids_for_auction<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(AuctionPath { auction_id }): ValidPath<AuctionPath>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    services::bids_for_auction(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// The most recent relational bid on an auction.
async fn last_bid<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(AuctionPath { auction_id }): ValidPath<AuctionPath>,
) -> Result<Json<Bid>, ApiError> {
    services::last_bid(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Change the amount of one's own bid while bidding is open.
///
/// # Returns
///
/// - `200 OK`: The updated bid
/// - `403 Forbidden`: The bid belongs to another developer
/// - `404 Not Found`: The bid does not exist
/// - `422 Unprocessable Entity`: Bidding is not open
async fn update_bid<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(BidPath { bid_id }): ValidPath<BidPath>,
    ValidJson(body): ValidJson<BidUpdate>,
) -> Result<Json<Bid>, ApiError> {
    let actor = acting_developer(&app, &auth).await?;
    services::update_bid(&app, actor, bid_id, &body)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Withdraw one's own bid while bidding is open.
async fn delete_bid<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(BidPath { bid_id }): ValidPath<BidPath>,
) -> Result<Json<Bid>, ApiError> {
    let actor = acting_developer(&app, &auth).await?;
    services::delete_bid(&app, actor, bid_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// An auction's bids as one store holds them, normalized.
async fn bids_by_source<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(AuctionPath { auction_id }): ValidPath<AuctionPath>,
    ValidQuery(SourceQuery { source }): ValidQuery<SourceQuery>,
) -> Result<Json<Vec<NormalizedBid>>, ApiError> {
    let fail = |err: MarketError| ApiError::new(err, &config);
    let source = source.as_deref().unwrap_or_default().parse::<BidSource>().map_err(fail)?;
    services::get_bids_by_source(&app, auction_id, source)
        .await
        .map(Json)
        .map_err(fail)
}

/// Compare an auction's bids between the relational and document stores.
///
/// Bids are paired by idempotency key, or by developer and amount for
/// records that predate keys.
async fn compare_sources<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(AuctionPath { auction_id }): ValidPath<AuctionPath>,
) -> Result<Json<BidComparison>, ApiError> {
    services::compare_bid_sources(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Place a bid in every store.
///
/// The relational write is committed first together with an outbox entry per
/// replica. If a replica cannot be written the request fails with
/// `propagation_pending`; the bid stays queued and is retried in the
/// background.
///
/// # Authorization
///
/// The token must act for the bidding developer.
///
/// # Returns
///
/// - `201 Created`: The relational bid and its replica copies
/// - `409 Conflict`: The developer already bid
/// - `500 Internal Server Error`: A replica failed; see `details`
async fn create_dual_bid<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidJson(body): ValidJson<NewBid>,
) -> Result<(StatusCode, Json<DualWriteOutcome>), ApiError> {
    require_developer(&app, &auth, body.developer_id).await?;
    let outcome = services::create_bid_in_both_sources(&app, &body)
        .await
        .map_err(|err| ApiError::new(err, &config))?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// A paginated listing merged across stores, newest first.
///
/// When several stores are read, one that fails is listed under `errors` and
/// the rest are still returned.
async fn list_bids<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<BidListing>, ApiError> {
    let fail = |err: MarketError| ApiError::new(err, &config);
    let storage = query
        .storage
        .as_deref()
        .unwrap_or_default()
        .parse::<StorageSelection>()
        .map_err(fail)?;
    let defaults = Page::default();
    let page = Page {
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(defaults.offset),
    }
    .clamp(config.page_limit);

    services::list_bids(&app, storage, page, query.auction_id)
        .await
        .map(Json)
        .map_err(fail)
}

/// Copy an auction's relational bids to the replicas that lack them.
///
/// # Authorization
///
/// Requires a company or admin token.
async fn sync_auction<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(AuctionPath { auction_id }): ValidPath<AuctionPath>,
) -> Result<Json<SyncReport>, ApiError> {
    require_manager(&app, &auth).await?;
    services::sync_auction(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// The replication state of a bid, one record per replica.
async fn propagation_status<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(BidPath { bid_id }): ValidPath<BidPath>,
) -> Result<Json<Vec<Propagation>>, ApiError> {
    services::propagation_status(&app, bid_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Every ledger entry placed by a developer.
async fn ledger_bids_by_developer<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(DeveloperPath { developer_id }): ValidPath<DeveloperPath>,
) -> Result<Json<Vec<NormalizedBid>>, ApiError> {
    services::ledger_bids_by_developer(&app, developer_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}
