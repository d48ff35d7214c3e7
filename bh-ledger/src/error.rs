/// Failures reported by the ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger refuses further entries
    #[error("ledger is full ({capacity} entries)")]
    Full {
        /// The configured capacity
        capacity: usize,
    },

    /// The bid cannot be represented on the ledger
    #[error("invalid ledger entry: {0}")]
    Invalid(String),
}
