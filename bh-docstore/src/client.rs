use std::{cmp::Ordering, sync::Arc};

use indexmap::IndexMap;
use rand::{Rng as _, distr::Alphanumeric};
use tokio::sync::RwLock;

use crate::{DocumentError, Fields, StoredDocument, Value};

/// Sort direction for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// A query over one collection: equality filters, ordering and a limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    /// Match every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep documents whose `field` equals `value`
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_owned(), value.into()));
        self
    }

    /// Sort by `field`; later calls break ties of earlier ones
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order.push((field.to_owned(), direction));
        self
    }

    /// Return at most `limit` documents
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|(field, expected)| {
            fields
                .get(field)
                .is_some_and(|actual| actual.compare(expected) == Ordering::Equal)
        })
    }

    fn compare(&self, a: &Fields, b: &Fields) -> Ordering {
        for (field, direction) in &self.order {
            let ordering = match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => x.compare(y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// The operations the bid replica needs from a document store.
pub trait DocumentClient: Send + Sync {
    /// Add a document to a collection under a generated id
    fn add(
        &self,
        collection: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<StoredDocument, DocumentError>> + Send;

    /// Run a query against a collection
    fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<StoredDocument>, DocumentError>> + Send;
}

type Collections = IndexMap<String, IndexMap<String, Fields>>;

/// An in-process document store.
///
/// Clones share the same data. Documents live only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryClient {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, IndexMap::len)
    }
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

impl DocumentClient for MemoryClient {
    async fn add(&self, collection: &str, fields: Fields) -> Result<StoredDocument, DocumentError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_owned()).or_default();

        let mut id = generate_id();
        while documents.contains_key(&id) {
            id = generate_id();
        }
        documents.insert(id.clone(), fields.clone());

        Ok(StoredDocument { id, fields })
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<StoredDocument>, DocumentError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<_> = documents
            .iter()
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        // stable, so insertion order breaks remaining ties
        found.sort_by(|a, b| query.compare(&a.fields, &b.fields));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }
}
