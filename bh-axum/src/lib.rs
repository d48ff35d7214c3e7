#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod routes;

use aide::{
    axum::{ApiRouter, routing::get},
    openapi::OpenApi,
};
use axum::{Extension, Json};
use bh_core::ports::Application;
use headers::{Authorization, authorization::Bearer};
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod openapi;
use openapi::{api_docs, docs_routes};

pub mod config;
use config::AxumConfig;

pub mod error;
pub mod extract;

/// Response for the health check endpoint
#[derive(Serialize, JsonSchema)]
#[schemars(inline)]
struct HealthResponse {
    status: String,
}

/// Simple health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn api_router<T: ApiApplication>() -> ApiRouter<T> {
    ApiRouter::new()
        .api_route("/health", get(health_check))
        .nest("/auctions", routes::auctions::router())
        .nest("/bids", routes::bids::router())
        .nest("/verification", routes::verification::router())
        .nest_api_service("/docs", docs_routes())
}

/// Construct a full API router with the given state and config
pub fn router<T: ApiApplication>(state: T, config: AxumConfig) -> axum::Router {
    let mut api = OpenApi::default();
    api_router()
        .finish_api_with(&mut api, api_docs)
        .layer(Extension(Arc::new(api)))
        .layer(Extension(Arc::new(config)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The OpenAPI document served under `/docs/api.json`
pub fn openapi<T: ApiApplication>() -> OpenApi {
    let mut api = OpenApi::default();
    let _ = api_router::<T>().finish_api_with(&mut api, api_docs);
    api
}

/// Starts the HTTP server with the provided configuration
pub async fn start_server<T: ApiApplication>(
    config: AxumConfig,
    app: T,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    tracing::info!("Listening for requests on {}", listener.local_addr()?);

    let service = router(app, config);
    axum::serve(listener, service).await
}

/// Axum imposes all sorts of constraints on what can pass for state. This
/// trait, coupled with a blanket implementation, specifies them upfront and
/// in one place: the request context is the bearer token, and the
/// application is cheap to clone and shareable across tasks.
pub trait ApiApplication:
    Clone + Send + Sync + 'static + Application<Context = Authorization<Bearer>>
{
}

impl<T> ApiApplication for T where
    T: Clone + Send + Sync + 'static + Application<Context = Authorization<Bearer>>
{
}
