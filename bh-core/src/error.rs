use time::OffsetDateTime;

use crate::models::{
    Amount, AuctionId, AuctionStatus, Bid, BidId, BidSource, DeveloperId, ProjectId,
    SourceFailure, WinnerId,
};

/// A type-erased error from a storage adapter
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of [`MarketError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// A referenced entity does not exist
    NotFound,
    /// The write would violate a uniqueness rule
    Conflict,
    /// The auction is not in a state that allows the operation
    State,
    /// The caller does not own the entity
    Permission,
    /// An unknown or disabled store was requested
    Source,
    /// A downstream store failed
    Backend,
}

/// Every way an auction or bid operation can fail.
///
/// Validation, state and permission failures are all detected before any
/// write happens. `Backend` wraps a failure of a store, and
/// `PropagationPending` reports a bid that is durable in the relational store
/// but has not reached every replica yet.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// The auction does not exist
    #[error("auction {0} not found")]
    AuctionNotFound(AuctionId),

    /// The project does not exist
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// The developer does not exist
    #[error("developer {0} not found")]
    DeveloperNotFound(DeveloperId),

    /// The bid does not exist
    #[error("bid {0} not found")]
    BidNotFound(BidId),

    /// No winner has been chosen for the auction
    #[error("no winner recorded for auction {0}")]
    WinnerNotFound(AuctionId),

    /// The auction has no bids yet
    #[error("auction {0} has no bids")]
    NoBids(AuctionId),

    /// The project already has an auction
    #[error("project {project_id} already has auction {auction_id}")]
    AuctionExists {
        /// The project in question
        project_id: ProjectId,
        /// The auction that already exists
        auction_id: AuctionId,
    },

    /// The developer already has a bid on the auction
    #[error("developer {developer_id} already has bid {bid_id} on auction {auction_id}")]
    BidExists {
        /// The auction in question
        auction_id: AuctionId,
        /// The developer in question
        developer_id: DeveloperId,
        /// The conflicting bid
        bid_id: BidId,
        /// The amount of the conflicting bid
        amount: Amount,
    },

    /// A winner was already recorded
    #[error("auction {auction_id} already has winner {winner_id}")]
    WinnerExists {
        /// The auction in question
        auction_id: AuctionId,
        /// The existing winner record
        winner_id: WinnerId,
    },

    /// Bidding requires an active auction
    #[error("auction is {current}, bidding requires it to be {required}")]
    AuctionNotActive {
        /// The stored status
        current: AuctionStatus,
        /// The status the operation needs
        required: AuctionStatus,
    },

    /// Bidding has not opened yet
    #[error("bidding opens at {starts_at}")]
    AuctionNotStarted {
        /// When bidding opens
        starts_at: OffsetDateTime,
    },

    /// Bidding has closed
    #[error("bidding closed at {ended_at}")]
    AuctionEnded {
        /// When bidding closed
        ended_at: OffsetDateTime,
    },

    /// The status change is not in the lifecycle table
    #[error("auction cannot move from {from} to {to}")]
    InvalidTransition {
        /// The stored status
        from: AuctionStatus,
        /// The requested status
        to: AuctionStatus,
    },

    /// A deadline edit that would break the schedule
    #[error("{0}")]
    InvalidSchedule(String),

    /// Only pending or cancelled auctions can be deleted
    #[error("auction is {0} and cannot be deleted")]
    DeletionNotAllowed(AuctionStatus),

    /// Winners can only be chosen for completed auctions
    #[error("auction is {0}; a winner can only be chosen once it is completed")]
    AuctionNotCompleted(AuctionStatus),

    /// The bid belongs to another auction
    #[error("bid {bid_id} does not belong to auction {auction_id}")]
    BidAuctionMismatch {
        /// The bid in question
        bid_id: BidId,
        /// The auction it was expected to belong to
        auction_id: AuctionId,
    },

    /// The caller may not perform the operation
    #[error("{0}")]
    Permission(String),

    /// The requested store is unknown or disabled
    #[error("unknown or disabled bid source `{0}`")]
    InvalidSource(String),

    /// A store failed
    #[error("{store} store failed: {error}")]
    Backend {
        /// Which store failed
        store: BidSource,
        /// The underlying failure
        #[source]
        error: BoxError,
    },

    /// The bid is committed in the relational store but some replicas failed
    #[error("bid {} was recorded but {} replica(s) are pending", .bid.id, .failures.len())]
    PropagationPending {
        /// The committed bid
        bid: Box<Bid>,
        /// The replicas that failed, which remain queued for retry
        failures: Vec<SourceFailure>,
    },
}

impl MarketError {
    /// Wrap a failure of the given store
    pub fn backend(store: BidSource, error: impl Into<BoxError>) -> Self {
        Self::Backend {
            store,
            error: error.into(),
        }
    }

    /// Wrap a failure of the relational store
    pub fn relational(error: impl Into<BoxError>) -> Self {
        Self::backend(BidSource::Relational, error)
    }

    /// The coarse classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::AuctionNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::DeveloperNotFound(_)
            | Self::BidNotFound(_)
            | Self::WinnerNotFound(_)
            | Self::NoBids(_) => ErrorKind::NotFound,
            Self::AuctionExists { .. } | Self::BidExists { .. } | Self::WinnerExists { .. } => {
                ErrorKind::Conflict
            }
            Self::AuctionNotActive { .. }
            | Self::AuctionNotStarted { .. }
            | Self::AuctionEnded { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidSchedule(_)
            | Self::DeletionNotAllowed(_)
            | Self::AuctionNotCompleted(_)
            | Self::BidAuctionMismatch { .. } => ErrorKind::State,
            Self::Permission(_) => ErrorKind::Permission,
            Self::InvalidSource(_) => ErrorKind::Source,
            Self::Backend { .. } | Self::PropagationPending { .. } => ErrorKind::Backend,
        }
    }

    /// A stable, machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::AuctionNotFound(_) => "auction_not_found",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::DeveloperNotFound(_) => "developer_not_found",
            Self::BidNotFound(_) => "bid_not_found",
            Self::WinnerNotFound(_) => "winner_not_found",
            Self::NoBids(_) => "no_bids",
            Self::AuctionExists { .. } => "auction_exists",
            Self::BidExists { .. } => "bid_exists",
            Self::WinnerExists { .. } => "winner_exists",
            Self::AuctionNotActive { .. } => "auction_not_active",
            Self::AuctionNotStarted { .. } => "auction_not_started",
            Self::AuctionEnded { .. } => "auction_ended",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidSchedule(_) => "invalid_schedule",
            Self::DeletionNotAllowed(_) => "deletion_not_allowed",
            Self::AuctionNotCompleted(_) => "auction_not_completed",
            Self::BidAuctionMismatch { .. } => "bid_auction_mismatch",
            Self::Permission(_) => "forbidden",
            Self::InvalidSource(_) => "invalid_source",
            Self::Backend { .. } => "backend_error",
            Self::PropagationPending { .. } => "propagation_pending",
        }
    }
}
