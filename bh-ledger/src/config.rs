use serde::{Deserialize, Serialize};

/// Ledger settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Whether bids are written to the ledger at all
    #[serde(default)]
    pub enabled: bool,

    /// The chain the ledger reports in its entries
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// The most entries the ledger accepts; unbounded when absent
    #[serde(default)]
    pub capacity: Option<usize>,
}

fn default_chain_id() -> u64 {
    31337
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chain_id: default_chain_id(),
            capacity: None,
        }
    }
}
