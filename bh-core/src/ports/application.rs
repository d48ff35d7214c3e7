use time::OffsetDateTime;

use super::{BidLedger, BidRepository, RelationalRepository};
use crate::{
    models::{BidKey, DeveloperId},
    verification::VerificationCodes,
};

/// Everything the services need from the host application.
///
/// The application owns the stores, supplies the clock, and turns a request
/// context (for the REST API, the bearer token) into permissions.
pub trait Application: Send + Sync {
    /// Per-request authorization context
    type Context: Send + Sync;

    /// The relational store, source of truth
    type Primary: RelationalRepository + Send + Sync + 'static;

    /// The document store replica
    type Document: BidRepository + Send + Sync + 'static;

    /// The ledger replica
    type Ledger: BidLedger + Send + Sync + 'static;

    /// The relational store
    fn primary(&self) -> &Self::Primary;

    /// The document store
    fn document(&self) -> &Self::Document;

    /// The ledger, or `None` when it is disabled
    fn ledger(&self) -> Option<&Self::Ledger>;

    /// The current time
    fn now(&self) -> OffsetDateTime;

    /// The outstanding email verification codes
    fn verification_codes(&self) -> &VerificationCodes;

    /// A fresh idempotency key for a new bid
    fn generate_bid_key(&self) -> BidKey {
        BidKey::generate()
    }

    /// How many failed attempts an outbox entry gets before it is marked failed
    fn max_propagation_attempts(&self) -> u32 {
        5
    }

    /// The developer the context acts as, if any
    fn acting_developer(
        &self,
        context: &Self::Context,
    ) -> impl Future<Output = Option<DeveloperId>> + Send;

    /// Whether the context may create, edit and close auctions
    fn can_manage_auctions(&self, context: &Self::Context) -> impl Future<Output = bool> + Send;
}
