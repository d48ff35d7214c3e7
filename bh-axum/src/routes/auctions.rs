//! Auction endpoints: creation, lifecycle, deletion and winners.

use std::sync::Arc;

use aide::axum::{
    ApiRouter,
    routing::{get, post},
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::TypedHeader;
use bh_core::{
    models::{Auction, AuctionId, AuctionQuery, AuctionUpdate, NewAuction, NewWinner, Winner},
    services,
};
use headers::{Authorization, authorization::Bearer};
use schemars::JsonSchema;
use serde::Deserialize;

use super::require_manager;
use crate::{
    ApiApplication,
    config::AxumConfig,
    error::ApiError,
    extract::{ValidJson, ValidPath, ValidQuery},
};

/// Path parameter for auction-specific endpoints.
#[derive(Deserialize, JsonSchema)]
struct Id {
    /// The auction
    auction_id: AuctionId,
}

/// Creates a router with auction endpoints.
pub fn router<T: ApiApplication>() -> ApiRouter<T> {
    ApiRouter::new()
        .api_route("/", get(list_auctions::<T>))
        .api_route("/create", post(create_auction::<T>))
        .api_route(
            "/{auction_id}",
            get(get_auction::<T>)
                .put(update_auction::<T>)
                .delete(delete_auction::<T>),
        )
        .api_route(
            "/{auction_id}/winner",
            get(get_winner::<T>).post(select_winner::<T>),
        )
}

/// Create an auction for a project.
///
/// The auction starts out pending. Each project can have at most one auction.
///
/// # Authorization
///
/// Requires a company or admin token.
///
/// # Returns
///
/// - `201 Created`: The new auction
/// - `400 Bad Request`: The deadline is not after the start
/// - `403 Forbidden`: Missing management permissions
/// - `404 Not Found`: The project does not exist
/// - `409 Conflict`: The project already has an auction
async fn create_auction<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidJson(body): ValidJson<NewAuction>,
) -> Result<(StatusCode, Json<Auction>), ApiError> {
    require_manager(&app, &auth).await?;
    let auction = services::create_auction(&app, &body)
        .await
        .map_err(|err| ApiError::new(err, &config))?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// List auctions, optionally filtered by project, status and schedule.
///
/// `start_date` keeps auctions whose bidding opens at or after it, `end_date`
/// those whose deadline is at or before it.
async fn list_auctions<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidQuery(query): ValidQuery<AuctionQuery>,
) -> Result<Json<Vec<Auction>>, ApiError> {
    services::list_auctions(&app, &query)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Retrieve an auction.
async fn get_auction<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(Id { auction_id }): ValidPath<Id>,
) -> Result<Json<Auction>, ApiError> {
    services::get_auction(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Change an auction's status and/or bidding deadline.
///
/// Status changes follow the lifecycle: pending to active or cancelled,
/// active to completed or cancelled. A new deadline must be in the future and
/// after the bidding start.
///
/// # Authorization
///
/// Requires a company or admin token.
///
/// # Returns
///
/// - `200 OK`: The updated auction
/// - `400 Bad Request`: Neither field was given
/// - `403 Forbidden`: Missing management permissions
/// - `404 Not Found`: The auction does not exist
/// - `422 Unprocessable Entity`: The transition or the deadline is not allowed
async fn update_auction<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(Id { auction_id }): ValidPath<Id>,
    ValidJson(body): ValidJson<AuctionUpdate>,
) -> Result<Json<Auction>, ApiError> {
    require_manager(&app, &auth).await?;
    services::update_auction(&app, auction_id, &body)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Delete a pending or cancelled auction along with its bids.
///
/// # Authorization
///
/// Requires a company or admin token.
///
/// # Returns
///
/// - `200 OK`: The deleted auction
/// - `403 Forbidden`: Missing management permissions
/// - `404 Not Found`: The auction does not exist
/// - `422 Unprocessable Entity`: The auction is active or completed
async fn delete_auction<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(Id { auction_id }): ValidPath<Id>,
) -> Result<Json<Auction>, ApiError> {
    require_manager(&app, &auth).await?;
    services::delete_auction(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}

/// Record the winning bid of a completed auction.
///
/// # Authorization
///
/// Requires a company or admin token.
///
/// # Returns
///
/// - `201 Created`: The winner record
/// - `403 Forbidden`: Missing management permissions
/// - `404 Not Found`: The auction or the bid does not exist
/// - `409 Conflict`: A winner was already chosen
/// - `422 Unprocessable Entity`: The auction is not completed, or the bid
///   belongs to another auction
async fn select_winner<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(Id { auction_id }): ValidPath<Id>,
    ValidJson(body): ValidJson<NewWinner>,
) -> Result<(StatusCode, Json<Winner>), ApiError> {
    require_manager(&app, &auth).await?;
    let winner = services::select_winner(&app, auction_id, &body)
        .await
        .map_err(|err| ApiError::new(err, &config))?;
    Ok((StatusCode::CREATED, Json(winner)))
}

/// Retrieve the winner of an auction.
async fn get_winner<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidPath(Id { auction_id }): ValidPath<Id>,
) -> Result<Json<Winner>, ApiError> {
    services::get_winner(&app, auction_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}
