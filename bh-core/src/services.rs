mod admission;
mod auctions;
mod bids;
mod propagation;
mod reconciliation;
mod verification;
mod winner;

pub use admission::{admit_bid, ensure_live_auction};
pub use auctions::{
    create_auction, delete_auction, expire_auctions, get_auction, list_auctions, update_auction,
};
pub use bids::{bids_for_auction, create_bid, delete_bid, last_bid, update_bid};
pub use propagation::{propagate_pending, propagate_to, propagation_status};
pub use reconciliation::{
    BidBackend, compare_bid_sources, create_bid_in_both_sources, get_bids_by_source,
    ledger_bids_by_developer, list_bids, sync_auction,
};
pub use verification::{issue_verification_code, verify_code};
pub use winner::{get_winner, select_winner};
