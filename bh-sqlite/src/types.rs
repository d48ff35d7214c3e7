//! Type definitions for the SQLite implementation.
//!
//! The row types mirror the tables one to one and convert into the core
//! models. Conversions can fail if a row was written outside this crate with
//! out-of-range values; such rows surface as `sqlx::Error::Decode`.

use bh_core::models::{
    Amount, Auction, AuctionId, AuctionStatus, Bid, BidId, BidKey, BidSource, DeveloperId,
    ProjectId, Propagation, PropagationState, Winner, WinnerId,
};

mod datetime;
pub use datetime::DateTime;

fn decode(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> sqlx::Error {
    sqlx::Error::Decode(err.into())
}

/// Convert a stored id, which SQLite guarantees to be positive for rowids
macro_rules! stored_id {
    ($ty:ident, $value:expr) => {
        $ty::new($value).map_err(decode)?
    };
}

#[derive(sqlx::FromRow)]
pub(crate) struct AuctionRow {
    pub id: i64,
    pub project_id: i64,
    pub bidding_started_at: DateTime,
    pub bidding_deadline: DateTime,
    pub status: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl TryFrom<AuctionRow> for Auction {
    type Error = sqlx::Error;

    fn try_from(row: AuctionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored_id!(AuctionId, row.id),
            project_id: stored_id!(ProjectId, row.project_id),
            bidding_started_at: row.bidding_started_at.into(),
            bidding_deadline: row.bidding_deadline.into(),
            status: AuctionStatus::try_from(row.status).map_err(decode)?,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BidRow {
    pub id: i64,
    pub auction_id: i64,
    pub developer_id: i64,
    pub amount_cents: i64,
    pub key: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl TryFrom<BidRow> for Bid {
    type Error = sqlx::Error;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored_id!(BidId, row.id),
            auction_id: stored_id!(AuctionId, row.auction_id),
            developer_id: stored_id!(DeveloperId, row.developer_id),
            amount: Amount::from_cents(row.amount_cents).map_err(decode)?,
            key: row.key.parse::<BidKey>().map_err(decode)?,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct WinnerRow {
    pub id: i64,
    pub auction_id: i64,
    pub bid_id: i64,
    pub winner_id: i64,
    pub bid_amount_cents: i64,
    pub created_at: DateTime,
}

impl TryFrom<WinnerRow> for Winner {
    type Error = sqlx::Error;

    fn try_from(row: WinnerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored_id!(WinnerId, row.id),
            bid_id: stored_id!(BidId, row.bid_id),
            auction_id: stored_id!(AuctionId, row.auction_id),
            winner_id: stored_id!(DeveloperId, row.winner_id),
            bid_amount: Amount::from_cents(row.bid_amount_cents).map_err(decode)?,
            created_at: row.created_at.into(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PropagationRow {
    pub bid_id: i64,
    pub target: String,
    pub state: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub updated_at: DateTime,
}

impl TryFrom<PropagationRow> for Propagation {
    type Error = sqlx::Error;

    fn try_from(row: PropagationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            bid_id: stored_id!(BidId, row.bid_id),
            target: row
                .target
                .parse::<BidSource>()
                .map_err(|err| decode(err.to_string()))?,
            state: row.state.parse::<PropagationState>().map_err(decode)?,
            attempts: u32::try_from(row.attempts).map_err(decode)?,
            last_error: row.last_error,
            updated_at: row.updated_at.into(),
        })
    }
}

/// A pending outbox entry joined with its bid
#[derive(sqlx::FromRow)]
pub(crate) struct PendingRow {
    #[sqlx(flatten)]
    pub bid: BidRow,
    pub target: String,
    pub state: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub propagated_at: DateTime,
}

impl TryFrom<PendingRow> for (Bid, Propagation) {
    type Error = sqlx::Error;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        let propagation = PropagationRow {
            bid_id: row.bid.id,
            target: row.target,
            state: row.state,
            attempts: row.attempts,
            last_error: row.last_error,
            updated_at: row.propagated_at,
        }
        .try_into()?;
        Ok((row.bid.try_into()?, propagation))
    }
}
