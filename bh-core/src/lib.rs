#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Core domain models for the auction system.
///
/// This module contains the entities (auctions, bids, winners) and the
/// normalized shapes used to compare the same bid across stores. The few
/// rules that do not require I/O, such as the status transition table and the
/// bidding window check, live next to the types they govern.
pub mod models;

/// Interface traits for the auction system.
///
/// These are the "ports" of the hexagonal architecture: the relational store,
/// the document store and the ledger each implement a subset of them, and the
/// `Application` trait ties a concrete set of adapters together.
pub mod ports;

/// Operations composed from the ports.
///
/// Every function here takes an `Application` and performs one user-facing
/// operation: admitting a bid, propagating it to secondary stores,
/// reconciling the stores or choosing a winner.
pub mod services;

mod error;
pub use error::{BoxError, ErrorKind, MarketError};

pub mod verification;
