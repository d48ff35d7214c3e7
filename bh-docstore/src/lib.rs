#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod repository;
mod value;

pub use client::{DocumentClient, Direction, MemoryClient, Query};
pub use config::DocumentConfig;
pub use error::DocumentError;
pub use repository::{BidDocument, DocumentBidRepository};
pub use value::{Fields, StoredDocument, Timestamp, Value};
