//! Rendering of failures as JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bh_core::{ErrorKind, MarketError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{Level, event};

use crate::config::AxumConfig;

/// The body of every error response
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    /// Always `false`
    pub success: bool,
    /// The HTTP status, mirrored from the response
    pub status: u16,
    /// A human readable description
    pub message: String,
    /// A stable machine-readable code
    pub error: String,
    /// Fields specific to the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// An error ready to be sent to the client
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Source => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::State => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn details_for(err: &MarketError, expose_backend: bool) -> Option<Value> {
    match err {
        MarketError::AuctionExists {
            project_id,
            auction_id,
        } => Some(json!({ "project_id": project_id, "auction_id": auction_id })),
        MarketError::BidExists {
            auction_id,
            developer_id,
            bid_id,
            amount,
        } => Some(json!({
            "auction_id": auction_id,
            "developer_id": developer_id,
            "bid_id": bid_id,
            "amount": amount,
        })),
        MarketError::WinnerExists {
            auction_id,
            winner_id,
        } => Some(json!({ "auction_id": auction_id, "winner_id": winner_id })),
        MarketError::AuctionNotActive { current, required } => {
            Some(json!({ "current": current.to_string(), "required": required.to_string() }))
        }
        MarketError::AuctionNotStarted { starts_at } => {
            Some(json!({ "starts_at": rfc3339(*starts_at) }))
        }
        MarketError::AuctionEnded { ended_at } => Some(json!({ "ended_at": rfc3339(*ended_at) })),
        MarketError::InvalidTransition { from, to } => {
            Some(json!({ "from": from.to_string(), "to": to.to_string() }))
        }
        MarketError::PropagationPending { bid, failures } => {
            let failures = if expose_backend {
                json!(failures)
            } else {
                json!(failures.iter().map(|f| f.source).collect::<Vec<_>>())
            };
            Some(json!({ "bid": bid, "failures": failures }))
        }
        MarketError::Backend { store, error } if expose_backend => {
            Some(json!({ "store": store, "cause": error.to_string() }))
        }
        _ => None,
    }
}

fn rfc3339(at: time::OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| at.to_string())
}

impl ApiError {
    /// Convert a service failure, logging it if it was a store failure.
    ///
    /// Store errors keep their detail only when the configuration asks for it.
    pub fn new(err: MarketError, config: &AxumConfig) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Backend {
            event!(Level::ERROR, code = err.code(), err = err.to_string());
        }

        let message = match &err {
            MarketError::Backend { store, .. } if !config.expose_backend_errors => {
                format!("the {store} store could not complete the request")
            }
            _ => err.to_string(),
        };

        Self {
            status: status_for(kind),
            code: err.code(),
            details: details_for(&err, config.expose_backend_errors),
            message,
        }
    }

    /// A malformed request
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation_error",
            message: message.into(),
            details: None,
        }
    }

    /// A caller lacking the required permission
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "forbidden",
            message: message.into(),
            details: None,
        }
    }

    /// The response status
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            status: self.status.as_u16(),
            message: self.message,
            error: self.code.to_owned(),
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl aide::OperationOutput for ApiError {
    type Inner = ErrorBody;
}
