#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use bh_core::{
    models::{
        Amount, Auction, AuctionId, AuctionStatus, AuctionUpdate, DeveloperId, NewAuction, NewBid,
        ProjectId,
    },
    ports::Application,
    services,
    verification::VerificationCodes,
};
use bh_docstore::{
    DocumentBidRepository, DocumentClient, DocumentConfig, DocumentError, Fields, MemoryClient,
    Query, StoredDocument,
};
use bh_ledger::{LedgerConfig, MemoryLedger};
use bh_sqlite::{Db, config::SqliteConfig};
use time::{OffsetDateTime, macros::datetime};

pub const T0: OffsetDateTime = datetime!(2025-06-01 09:00 UTC);

/// A document client that can be switched off
#[derive(Debug, Clone, Default)]
pub struct FlakyClient {
    pub inner: MemoryClient,
    pub offline: Arc<AtomicBool>,
}

impl FlakyClient {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DocumentError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(DocumentError::Unavailable("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl DocumentClient for FlakyClient {
    async fn add(&self, collection: &str, fields: Fields) -> Result<StoredDocument, DocumentError> {
        self.check()?;
        self.inner.add(collection, fields).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<StoredDocument>, DocumentError> {
        self.check()?;
        self.inner.query(collection, query).await
    }
}

pub struct TestApp {
    pub db: Db,
    pub document: DocumentBidRepository<FlakyClient>,
    pub ledger: Option<MemoryLedger>,
    pub codes: VerificationCodes,
    pub clock: Arc<Mutex<OffsetDateTime>>,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::build(None).await
    }

    pub async fn with_ledger() -> anyhow::Result<Self> {
        Self::build(Some(MemoryLedger::new(&LedgerConfig {
            enabled: true,
            ..LedgerConfig::default()
        })))
        .await
    }

    async fn build(ledger: Option<MemoryLedger>) -> anyhow::Result<Self> {
        let db = Db::open(&SqliteConfig::default()).await?;
        for id in 1..=3 {
            db.register_project(ProjectId(id), &format!("project {id}"))
                .await?;
        }
        for id in [4, 7, 9] {
            db.register_developer(DeveloperId(id), &format!("dev{id}@example.com"))
                .await?;
        }
        Ok(Self {
            db,
            document: DocumentBidRepository::new(
                FlakyClient::default(),
                &DocumentConfig::default(),
            ),
            ledger,
            codes: VerificationCodes::new(std::time::Duration::from_secs(300)),
            clock: Arc::new(Mutex::new(T0)),
        })
    }

    pub fn set_now(&self, now: OffsetDateTime) {
        *self.clock.lock().unwrap() = now;
    }

    pub fn document_client(&self) -> &FlakyClient {
        self.document.client()
    }

    /// An auction on `project` open for bidding from T0+1h to T0+2h
    pub async fn live_auction(&self, project: i64) -> anyhow::Result<Auction> {
        let auction = services::create_auction(
            self,
            &NewAuction {
                project_id: ProjectId(project),
                bidding_started_at: T0 + time::Duration::hours(1),
                bidding_deadline: T0 + time::Duration::hours(2),
            },
        )
        .await?;
        let active = services::update_auction(
            self,
            auction.id,
            &AuctionUpdate {
                status: Some(AuctionStatus::Active),
                bidding_deadline: None,
            },
        )
        .await?;
        Ok(active)
    }
}

pub fn new_bid(auction_id: AuctionId, developer: i64, amount: &str) -> NewBid {
    NewBid {
        auction_id,
        developer_id: DeveloperId(developer),
        amount: amount.parse::<Amount>().unwrap(),
    }
}

impl Application for TestApp {
    type Context = ();
    type Primary = Db;
    type Document = DocumentBidRepository<FlakyClient>;
    type Ledger = MemoryLedger;

    fn primary(&self) -> &Db {
        &self.db
    }

    fn document(&self) -> &Self::Document {
        &self.document
    }

    fn ledger(&self) -> Option<&MemoryLedger> {
        self.ledger.as_ref()
    }

    fn now(&self) -> OffsetDateTime {
        *self.clock.lock().unwrap()
    }

    fn verification_codes(&self) -> &VerificationCodes {
        &self.codes
    }

    fn max_propagation_attempts(&self) -> u32 {
        3
    }

    async fn acting_developer(&self, _context: &()) -> Option<DeveloperId> {
        None
    }

    async fn can_manage_auctions(&self, _context: &()) -> bool {
        true
    }
}
