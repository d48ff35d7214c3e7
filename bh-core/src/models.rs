mod amount;
mod auction;
mod bid;
mod comparison;
mod ids;
mod listing;
mod propagation;
mod source;
mod verification;
mod winner;

pub use amount::{Amount, AmountError};
pub use auction::{Auction, AuctionChanges, AuctionQuery, AuctionStatus, AuctionUpdate, NewAuction};
pub use bid::{Bid, BidDraft, BidUpdate, DualWriteOutcome, NewBid};
pub use comparison::{BidComparison, ComparisonSummary, MatchKind, MatchedBid};
pub use ids::{AuctionId, BidId, BidKey, DeveloperId, IdError, ProjectId, WinnerId};
pub use listing::{BidListing, NormalizedBid, Page, Pagination, SourceFailure, StorageSelection};
pub use propagation::{Propagation, PropagationReport, PropagationState, SyncReport};
pub use source::BidSource;
pub use verification::{CodeCheck, CodeRequest, CodeVerdict, IssuedCode};
pub use winner::{NewWinner, Winner};

/// JSON schema for an RFC3339 timestamp.
///
/// The `time` crate does not integrate with schemars, so every timestamp
/// field points its schema here.
#[cfg(feature = "schemars")]
pub(crate) fn datetime_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "string",
        "format": "date-time",
    })
}

/// JSON schema for an optional RFC3339 timestamp.
#[cfg(feature = "schemars")]
pub(crate) fn optional_datetime_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": ["string", "null"],
        "format": "date-time",
    })
}
