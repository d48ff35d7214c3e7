//! Route handlers, grouped by resource.

pub(crate) mod auctions;
pub(crate) mod bids;
pub(crate) mod verification;

use bh_core::models::DeveloperId;
use headers::{Authorization, authorization::Bearer};

use crate::{ApiApplication, error::ApiError};

/// Fail unless the token may manage auctions
async fn require_manager<T: ApiApplication>(
    app: &T,
    auth: &Authorization<Bearer>,
) -> Result<(), ApiError> {
    if app.can_manage_auctions(auth).await {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "managing auctions requires a company or admin token",
        ))
    }
}

/// The developer the token acts for
async fn acting_developer<T: ApiApplication>(
    app: &T,
    auth: &Authorization<Bearer>,
) -> Result<DeveloperId, ApiError> {
    app.acting_developer(auth)
        .await
        .ok_or_else(|| ApiError::forbidden("a developer token is required"))
}

/// Fail unless the token acts for `developer_id`
async fn require_developer<T: ApiApplication>(
    app: &T,
    auth: &Authorization<Bearer>,
    developer_id: DeveloperId,
) -> Result<(), ApiError> {
    if acting_developer(app, auth).await? == developer_id {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "the token does not act for developer {developer_id}"
        )))
    }
}
