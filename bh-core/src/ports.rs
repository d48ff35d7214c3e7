mod application;
mod auction;
mod bid;
mod directory;
mod ledger;
mod propagation;
mod winner;

pub use application::Application;
pub use auction::AuctionRepository;
pub use bid::{BidRepository, PrimaryBidRepository};
pub use directory::DirectoryRepository;
pub use ledger::BidLedger;
pub use propagation::PropagationRepository;
pub use winner::WinnerRepository;

/// Base trait for every storage adapter.
///
/// Each adapter reports failures through its own error type; the services
/// wrap them into [`crate::MarketError::Backend`] tagged with the store that
/// failed.
pub trait Repository {
    /// The error returned by the adapter's operations
    type Error: std::error::Error + Send + Sync + 'static;
}

/// The full set of capabilities the relational store provides.
///
/// The relational store is the source of truth: auctions, winners, the
/// directory and the propagation outbox all live there, next to the bids.
pub trait RelationalRepository:
    AuctionRepository
    + PrimaryBidRepository
    + PropagationRepository
    + WinnerRepository
    + DirectoryRepository
{
}

impl<T> RelationalRepository for T where
    T: AuctionRepository
        + PrimaryBidRepository
        + PropagationRepository
        + WinnerRepository
        + DirectoryRepository
{
}
