//! Email verification codes.

use std::sync::Arc;

use aide::axum::{ApiRouter, routing::post};
use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::TypedHeader;
use bh_core::{
    models::{CodeCheck, CodeRequest, CodeVerdict, IssuedCode},
    services,
};
use headers::{Authorization, authorization::Bearer};

use super::require_manager;
use crate::{ApiApplication, config::AxumConfig, error::ApiError, extract::ValidJson};

/// Creates a router with verification endpoints.
pub fn router<T: ApiApplication>() -> ApiRouter<T> {
    ApiRouter::new()
        .api_route("/issue", post(issue_code::<T>))
        .api_route("/verify", post(verify_code::<T>))
}

/// Issue a six-digit code for an email address.
///
/// The code is returned to the caller, which delivers it. Issuing again for
/// the same address replaces the earlier code.
///
/// # Authorization
///
/// Requires a `company` or `admin` token.
///
/// # Returns
///
/// - `201 Created`: The code and its expiry
/// - `400 Bad Request`: The address is malformed
/// - `403 Forbidden`: The token may not issue codes
async fn issue_code<T: ApiApplication>(
    State(app): State<T>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidJson(body): ValidJson<CodeRequest>,
) -> Result<(StatusCode, Json<IssuedCode>), ApiError> {
    require_manager(&app, &auth).await?;
    let issued = services::issue_verification_code(&app, &body)
        .await
        .map_err(|err| ApiError::new(err, &config))?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// Check a code entered by the address owner.
///
/// A matching code that has not expired is consumed, so a second check with
/// the same code fails.
///
/// # Returns
///
/// - `200 OK`: `verified` tells whether the code was accepted
/// - `400 Bad Request`: The address is malformed
async fn verify_code<T: ApiApplication>(
    State(app): State<T>,
    Extension(config): Extension<Arc<AxumConfig>>,
    ValidJson(body): ValidJson<CodeCheck>,
) -> Result<Json<CodeVerdict>, ApiError> {
    services::verify_code(&app, &body)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(err, &config))
}
