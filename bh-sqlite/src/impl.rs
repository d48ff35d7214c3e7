//! Repository trait implementations for the SQLite database.
//!
//! Every query is parameterized. Conflicts on the uniqueness constraints are
//! resolved with `on conflict do nothing`, after which the conflicting row is
//! loaded and handed back to the caller.

use crate::Db;
use bh_core::ports::Repository;

mod auction;
mod bid;
mod directory;
mod propagation;
mod winner;

impl Repository for Db {
    type Error = sqlx::Error;
}
