use std::sync::Arc;

use bh_core::{
    models::{Amount, AuctionId, Bid, BidDraft, BidKey, BidSource, DeveloperId, NormalizedBid},
    ports::{BidRepository, Repository},
};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{Level, event};

use crate::{
    DocumentClient, DocumentConfig, DocumentError, Fields, Query, StoredDocument, Timestamp, Value,
};

const AUCTION_ID: &str = "auctionId";
const DEVELOPER_ID: &str = "developerId";
const AMOUNT: &str = "amount";
const BID_KEY: &str = "bidKey";
const CREATED_AT: &str = "createdAt";

/// A bid as the document store holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidDocument {
    /// The generated document id
    pub id: String,
    /// The auction the bid was placed on
    pub auction_id: AuctionId,
    /// The bidder
    pub developer_id: DeveloperId,
    /// The bid amount
    pub amount: Amount,
    /// When the bid was placed
    pub created_at: OffsetDateTime,
    /// The idempotency key; documents written before keys existed have none
    pub key: Option<BidKey>,
}

impl From<BidDocument> for NormalizedBid {
    fn from(doc: BidDocument) -> Self {
        NormalizedBid::new(
            doc.id,
            doc.auction_id,
            doc.developer_id,
            doc.amount,
            doc.created_at,
            BidSource::Document,
            doc.key,
        )
    }
}

impl BidDocument {
    fn fields(bid: &BidDraft) -> Fields {
        Fields::from([
            (AUCTION_ID.to_owned(), Value::from(bid.auction_id.0)),
            (DEVELOPER_ID.to_owned(), Value::from(bid.developer_id.0)),
            (AMOUNT.to_owned(), Value::from(bid.amount.to_string())),
            (BID_KEY.to_owned(), Value::from(bid.key.to_string())),
            (
                CREATED_AT.to_owned(),
                Value::from(Timestamp::from(bid.created_at)),
            ),
        ])
    }
}

impl TryFrom<StoredDocument> for BidDocument {
    type Error = DocumentError;

    fn try_from(doc: StoredDocument) -> Result<Self, Self::Error> {
        let StoredDocument { id, fields } = doc;
        let malformed = |reason: String| DocumentError::Malformed {
            id: id.clone(),
            reason,
        };
        let field = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| malformed(format!("missing {name}")))
        };

        let auction_id = match field(AUCTION_ID)? {
            Value::Integer(raw) => AuctionId::new(*raw),
            Value::String(raw) => raw.parse(),
            other => return Err(malformed(format!("{AUCTION_ID} is {other:?}"))),
        }
        .map_err(|err| malformed(err.to_string()))?;

        let developer_id = match field(DEVELOPER_ID)? {
            Value::Integer(raw) => DeveloperId::new(*raw),
            Value::String(raw) => raw.parse(),
            other => return Err(malformed(format!("{DEVELOPER_ID} is {other:?}"))),
        }
        .map_err(|err| malformed(err.to_string()))?;

        // older documents stored the amount as a double
        let amount = match field(AMOUNT)? {
            Value::String(raw) => raw.parse(),
            Value::Double(raw) => Amount::from_f64(*raw),
            Value::Integer(raw) => Amount::from_f64(*raw as f64),
            other => return Err(malformed(format!("{AMOUNT} is {other:?}"))),
        }
        .map_err(|err| malformed(err.to_string()))?;

        let created_at = match field(CREATED_AT)? {
            Value::Timestamp(stamp) => {
                OffsetDateTime::try_from(*stamp).map_err(|err| malformed(err.to_string()))?
            }
            other => return Err(malformed(format!("{CREATED_AT} is {other:?}"))),
        };

        let key = match fields.get(BID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => {
                Some(
                    raw.parse::<BidKey>()
                        .map_err(|err| malformed(err.to_string()))?,
                )
            }
            Some(other) => return Err(malformed(format!("{BID_KEY} is {other:?}"))),
        };

        Ok(Self {
            id,
            auction_id,
            developer_id,
            amount,
            created_at,
            key,
        })
    }
}

/// The document-store bid replica.
///
/// Writes are deduplicated on the bid's idempotency key. The store has no
/// unique constraints of its own, so the check and the insert run under a
/// lock shared by every clone of the repository.
#[derive(Debug, Clone)]
pub struct DocumentBidRepository<C> {
    client: C,
    collection: String,
    write: Arc<Mutex<()>>,
}

impl<C: DocumentClient> DocumentBidRepository<C> {
    /// Wrap a client
    pub fn new(client: C, config: &DocumentConfig) -> Self {
        Self {
            client,
            collection: config.collection.clone(),
            write: Arc::default(),
        }
    }

    /// The underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<BidDocument>, DocumentError> {
        self.client
            .query(&self.collection, query)
            .await?
            .into_iter()
            .map(BidDocument::try_from)
            .collect()
    }

    async fn find_by_key(&self, key: BidKey) -> Result<Option<BidDocument>, DocumentError> {
        let query = Query::new().where_eq(BID_KEY, key.to_string()).limit(1);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    async fn insert(&self, bid: &BidDraft) -> Result<BidDocument, DocumentError> {
        let stored = self
            .client
            .add(&self.collection, BidDocument::fields(bid))
            .await?;
        event!(Level::DEBUG, id = %stored.id, key = %bid.key, "stored bid document");
        stored.try_into()
    }
}

fn oldest_first(mut docs: Vec<BidDocument>) -> Vec<BidDocument> {
    docs.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    docs
}

impl<C> Repository for DocumentBidRepository<C> {
    type Error = DocumentError;
}

impl<C: DocumentClient> BidRepository for DocumentBidRepository<C> {
    type Record = BidDocument;

    const SOURCE: BidSource = BidSource::Document;

    async fn get_bids_by_auction(
        &self,
        auction_id: AuctionId,
    ) -> Result<Vec<BidDocument>, Self::Error> {
        let query = Query::new().where_eq(AUCTION_ID, auction_id.0);
        self.fetch(&query).await.map(oldest_first)
    }

    async fn create_bid(
        &self,
        bid: &BidDraft,
    ) -> Result<Result<BidDocument, BidDocument>, Self::Error> {
        let _guard = self.write.lock().await;
        if let Some(existing) = self.find_by_key(bid.key).await? {
            return Ok(Err(existing));
        }
        self.insert(bid).await.map(Ok)
    }

    async fn get_last_bid(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<BidDocument>, Self::Error> {
        // last in (createdAt, id) order, like get_bids_by_auction
        Ok(self.get_bids_by_auction(auction_id).await?.pop())
    }

    async fn sync_bids(&self, bids: &[Bid]) -> Result<usize, Self::Error> {
        let _guard = self.write.lock().await;
        let mut inserted = 0;
        for bid in bids {
            if self.find_by_key(bid.key).await?.is_none() {
                self.insert(&BidDraft::from(bid)).await?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_all_bids(&self) -> Result<Vec<BidDocument>, Self::Error> {
        self.fetch(&Query::new()).await.map(oldest_first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryClient;
    use time::macros::datetime;

    fn draft(auction: i64, developer: i64, cents: i64) -> BidDraft {
        BidDraft {
            auction_id: AuctionId(auction),
            developer_id: DeveloperId(developer),
            amount: Amount::from_cents(cents).unwrap(),
            key: BidKey::generate(),
            created_at: datetime!(2025-03-01 12:00 UTC),
        }
    }

    fn repository() -> DocumentBidRepository<MemoryClient> {
        DocumentBidRepository::new(MemoryClient::new(), &DocumentConfig::default())
    }

    #[tokio::test]
    async fn test_create_is_idempotent_on_key() -> anyhow::Result<()> {
        let repo = repository();
        let bid = draft(5, 9, 10000);

        let first = repo.create_bid(&bid).await?.unwrap();
        assert_eq!(first.amount.to_string(), "100.00");
        assert_eq!(first.key, Some(bid.key));

        let second = repo.create_bid(&bid).await?;
        assert_eq!(second, Err(first.clone()));
        assert_eq!(repo.client().count("bids").await, 1);

        let normalized = NormalizedBid::from(first);
        assert_eq!(normalized.source, BidSource::Document);
        assert_eq!(normalized.amount, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_by_auction() -> anyhow::Result<()> {
        let repo = repository();
        let mut early = draft(5, 1, 500);
        early.created_at = datetime!(2025-03-01 11:00 UTC);
        let late = draft(5, 2, 700);
        repo.create_bid(&late).await?.unwrap();
        repo.create_bid(&early).await?.unwrap();
        repo.create_bid(&draft(6, 1, 900)).await?.unwrap();

        let bids = repo.get_bids_by_auction(AuctionId(5)).await?;
        let developers: Vec<_> = bids.iter().map(|b| b.developer_id.0).collect();
        assert_eq!(developers, [1, 2]);

        let last = repo.get_last_bid(AuctionId(5)).await?.unwrap();
        assert_eq!(last.developer_id, DeveloperId(2));
        assert!(repo.get_last_bid(AuctionId(7)).await?.is_none());
        assert_eq!(repo.get_all_bids().await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_last_bid_agrees_with_listing_on_tied_timestamps() -> anyhow::Result<()> {
        let repo = repository();
        // every draft shares one created_at
        for developer in [1, 2, 3, 4] {
            repo.create_bid(&draft(5, developer, 100 * developer))
                .await?
                .unwrap();
        }

        let bids = repo.get_bids_by_auction(AuctionId(5)).await?;
        assert!(bids.windows(2).all(|w| w[0].id < w[1].id));
        let last = repo.get_last_bid(AuctionId(5)).await?;
        assert_eq!(last.as_ref(), bids.last());
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_documents() -> anyhow::Result<()> {
        let repo = repository();
        let fields = Fields::from([
            (AUCTION_ID.to_owned(), Value::Integer(5)),
            (DEVELOPER_ID.to_owned(), Value::String("9".into())),
            (AMOUNT.to_owned(), Value::Double(99.999)),
            (
                CREATED_AT.to_owned(),
                Value::Timestamp(datetime!(2025-03-01 12:00 UTC).into()),
            ),
        ]);
        repo.client().add("bids", fields).await?;

        let bids = repo.get_bids_by_auction(AuctionId(5)).await?;
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].amount.cents(), 10000);
        assert_eq!(bids[0].developer_id, DeveloperId(9));
        assert!(bids[0].key.is_none());

        repo.client()
            .add("bids", Fields::from([(AUCTION_ID.to_owned(), Value::Integer(5))]))
            .await?;
        assert!(matches!(
            repo.get_bids_by_auction(AuctionId(5)).await,
            Err(DocumentError::Malformed { .. })
        ));
        Ok(())
    }
}
