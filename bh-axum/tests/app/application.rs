use super::Permissions;
use bh_core::{
    models::{DeveloperId, ProjectId},
    ports::Application,
    verification::VerificationCodes,
};
use bh_docstore::{DocumentBidRepository, DocumentConfig, MemoryClient};
use bh_ledger::{LedgerConfig, MemoryLedger};
use bh_sqlite::{Db, config::SqliteConfig};
use headers::{Authorization, authorization::Bearer};
use std::sync::{Arc, Mutex};
use time::{OffsetDateTime, macros::datetime};

pub const T0: OffsetDateTime = datetime!(2025-06-01 09:00 UTC);

#[derive(Clone)]
pub struct TestApp {
    pub db: Db,
    pub document: DocumentBidRepository<MemoryClient>,
    pub ledger: Option<MemoryLedger>,
    pub codes: VerificationCodes,
    pub clock: Arc<Mutex<OffsetDateTime>>,
}

impl TestApp {
    pub async fn new(with_ledger: bool) -> anyhow::Result<Self> {
        let db = Db::open(&SqliteConfig::default()).await?;
        for id in 1..=3 {
            db.register_project(ProjectId(id), &format!("project {id}"))
                .await?;
        }
        for id in [4, 7, 9] {
            db.register_developer(DeveloperId(id), &format!("dev{id}@example.com"))
                .await?;
        }
        let ledger = with_ledger.then(|| {
            MemoryLedger::new(&LedgerConfig {
                enabled: true,
                ..LedgerConfig::default()
            })
        });
        Ok(Self {
            db,
            document: DocumentBidRepository::new(MemoryClient::new(), &DocumentConfig::default()),
            ledger,
            codes: VerificationCodes::new(std::time::Duration::from_secs(600)),
            clock: Arc::new(Mutex::new(T0)),
        })
    }

    pub fn set_now(&self, now: OffsetDateTime) {
        *self.clock.lock().unwrap() = now;
    }

    fn permissions(&self, context: &Authorization<Bearer>) -> Option<Permissions> {
        context.0.token().parse().ok()
    }
}

impl Application for TestApp {
    // plain-text permission declarations stand in for a signed token
    type Context = Authorization<Bearer>;

    type Primary = Db;
    type Document = DocumentBidRepository<MemoryClient>;
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

    async fn acting_developer(&self, context: &Self::Context) -> Option<DeveloperId> {
        self.permissions(context).and_then(|p| p.developer)
    }

    async fn can_manage_auctions(&self, context: &Self::Context) -> bool {
        self.permissions(context).is_some_and(|p| p.company)
    }
}
