use std::sync::Arc;

use bh_core::{
    models::{AuctionId, Bid, BidKey, DeveloperId},
    ports::{BidLedger, Repository},
};
use rand::RngCore as _;
use rustc_hash::FxHashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{Level, event};

use crate::{LedgerConfig, LedgerEntry, LedgerError};

#[derive(Debug, Default)]
struct Log {
    entries: Vec<LedgerEntry>,
    by_key: FxHashMap<BidKey, usize>,
}

/// An in-process append-only ledger.
///
/// Clones share the same log.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    log: Arc<RwLock<Log>>,
    chain_id: u64,
    capacity: Option<usize>,
}

impl MemoryLedger {
    /// An empty ledger
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            log: Arc::default(),
            chain_id: config.chain_id,
            capacity: config.capacity,
        }
    }

    /// The number of entries on the ledger
    pub async fn len(&self) -> usize {
        self.log.read().await.entries.len()
    }

    /// Whether nothing has been appended yet
    pub async fn is_empty(&self) -> bool {
        self.log.read().await.entries.is_empty()
    }

    async fn select(&self, keep: impl Fn(&LedgerEntry) -> bool) -> Vec<LedgerEntry> {
        self.log
            .read()
            .await
            .entries
            .iter()
            .filter(|entry| keep(entry))
            .cloned()
            .collect()
    }
}

fn tx_hash() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let mut hash = String::with_capacity(66);
    hash.push_str("0x");
    for byte in bytes {
        hash.push_str(&format!("{byte:02x}"));
    }
    hash
}

/// Blocks are sealed on whole seconds
fn block_time(at: OffsetDateTime) -> Result<OffsetDateTime, LedgerError> {
    at.replace_nanosecond(0)
        .map_err(|err| LedgerError::Invalid(err.to_string()))
}

impl Repository for MemoryLedger {
    type Error = LedgerError;
}

impl BidLedger for MemoryLedger {
    type Record = LedgerEntry;

    async fn create_bid_on_chain(
        &self,
        bid: &Bid,
    ) -> Result<Result<LedgerEntry, LedgerEntry>, Self::Error> {
        let mut log = self.log.write().await;

        if let Some(&index) = log.by_key.get(&bid.key) {
            return Ok(Err(log.entries[index].clone()));
        }
        if let Some(capacity) = self.capacity
            && log.entries.len() >= capacity
        {
            return Err(LedgerError::Full { capacity });
        }

        let index = log.entries.len();
        let entry = LedgerEntry {
            sequence: index as u64 + 1,
            chain_id: self.chain_id,
            tx_hash: tx_hash(),
            auction_id: bid.auction_id,
            developer_id: bid.developer_id,
            amount: bid.amount,
            bid_key: bid.key,
            bid_id: bid.id,
            block_timestamp: block_time(bid.created_at)?,
        };
        log.entries.push(entry.clone());
        log.by_key.insert(bid.key, index);

        event!(
            Level::DEBUG,
            sequence = entry.sequence,
            tx_hash = %entry.tx_hash,
            "appended bid to ledger"
        );
        Ok(Ok(entry))
    }

    async fn get_bids_by_auction(
        &self,
        auction_id: AuctionId,
    ) -> Result<Vec<LedgerEntry>, Self::Error> {
        Ok(self.select(|entry| entry.auction_id == auction_id).await)
    }

    async fn get_bids_by_developer(
        &self,
        developer_id: DeveloperId,
    ) -> Result<Vec<LedgerEntry>, Self::Error> {
        Ok(self.select(|entry| entry.developer_id == developer_id).await)
    }

    async fn get_all_bids(&self) -> Result<Vec<LedgerEntry>, Self::Error> {
        Ok(self.log.read().await.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bh_core::models::{Amount, BidId, BidSource, NormalizedBid};
    use time::macros::datetime;

    fn bid(id: i64, auction: i64, developer: i64) -> Bid {
        let at = datetime!(2025-03-01 12:00:00.250 UTC);
        Bid {
            id: BidId(id),
            auction_id: AuctionId(auction),
            developer_id: DeveloperId(developer),
            amount: Amount::from_cents(10000).unwrap(),
            key: BidKey::generate(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_append_is_idempotent() -> anyhow::Result<()> {
        let ledger = MemoryLedger::new(&LedgerConfig::default());
        let first = bid(1, 5, 9);

        let entry = ledger.create_bid_on_chain(&first).await?.unwrap();
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.chain_id, 31337);
        assert_eq!(entry.tx_hash.len(), 66);
        assert!(entry.tx_hash.starts_with("0x"));
        assert_eq!(entry.block_timestamp, datetime!(2025-03-01 12:00 UTC));

        let again = ledger.create_bid_on_chain(&first).await?;
        assert_eq!(again, Err(entry.clone()));
        assert_eq!(ledger.len().await, 1);

        let normalized = NormalizedBid::from(entry);
        assert_eq!(normalized.id, "1");
        assert_eq!(normalized.source, BidSource::Ledger);
        assert_eq!(normalized.key, Some(first.key));
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_filter_in_append_order() -> anyhow::Result<()> {
        let ledger = MemoryLedger::new(&LedgerConfig::default());
        for (id, auction, developer) in [(1, 5, 9), (2, 6, 9), (3, 5, 4)] {
            ledger
                .create_bid_on_chain(&bid(id, auction, developer))
                .await?
                .unwrap();
        }

        let by_auction = ledger.get_bids_by_auction(AuctionId(5)).await?;
        let sequences: Vec<_> = by_auction.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, [1, 3]);

        let by_developer = ledger.get_bids_by_developer(DeveloperId(9)).await?;
        let bids: Vec<_> = by_developer.iter().map(|e| e.bid_id.0).collect();
        assert_eq!(bids, [1, 2]);

        assert_eq!(ledger.get_all_bids().await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_capacity() -> anyhow::Result<()> {
        let ledger = MemoryLedger::new(&LedgerConfig {
            capacity: Some(1),
            ..LedgerConfig::default()
        });
        let first = bid(1, 5, 9);
        ledger.create_bid_on_chain(&first).await?.unwrap();
        assert!(matches!(
            ledger.create_bid_on_chain(&bid(2, 5, 4)).await,
            Err(LedgerError::Full { capacity: 1 })
        ));
        // a replay of an existing entry still succeeds
        assert!(ledger.create_bid_on_chain(&first).await?.is_err());
        Ok(())
    }
}
