#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod config;
mod entry;
mod error;
mod memory;

pub use config::LedgerConfig;
pub use entry::LedgerEntry;
pub use error::LedgerError;
pub use memory::MemoryLedger;
