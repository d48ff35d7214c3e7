/// Failures reported by the document replica
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The store could not be reached or rejected the request
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A stored document is missing a field or holds the wrong type
    #[error("malformed document {id}: {reason}")]
    Malformed {
        /// The offending document
        id: String,
        /// What was wrong with it
        reason: String,
    },
}
