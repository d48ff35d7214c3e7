use serde::{Deserialize, Serialize};

/// Where the replica keeps its documents.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentConfig {
    /// The collection holding bid documents
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "bids".to_owned()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
        }
    }
}
