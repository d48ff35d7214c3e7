//! Application implementation with JWT-based authorization.
//!
//! This module wires the stores together and implements the Application
//! trait, deciding permissions from HS256-signed bearer tokens.

use bh_core::{
    MarketError,
    models::{DeveloperId, PropagationReport},
    ports::Application,
    services,
    verification::VerificationCodes,
};
use bh_docstore::{DocumentBidRepository, DocumentConfig, MemoryClient};
use bh_ledger::{LedgerConfig, MemoryLedger};
use bh_sqlite::Db;
use headers::{Authorization, authorization::Bearer};
use jwt_simple::{
    claims::JWTClaims,
    prelude::{HS256Key, MACLike},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{Level, event};

use crate::{PropagationConfig, VerificationConfig};

/// The running application: every store, the token key and the
/// verification codes.
#[derive(Clone)]
pub struct MarketApp {
    /// The relational store
    pub db: Db,
    /// The document replica
    pub document: DocumentBidRepository<MemoryClient>,
    /// The ledger replica, if enabled
    pub ledger: Option<MemoryLedger>,
    /// HMAC key for JWT token verification
    pub key: HS256Key,
    /// Outstanding verification codes
    pub codes: VerificationCodes,
    /// Attempts before a replica write is given up on
    pub max_attempts: u32,
}

impl MarketApp {
    /// Assemble the application around an opened database
    pub fn new(
        db: Db,
        key: HS256Key,
        document: &DocumentConfig,
        ledger: &LedgerConfig,
        propagation: &PropagationConfig,
        verification: &VerificationConfig,
    ) -> Self {
        Self {
            db,
            document: DocumentBidRepository::new(MemoryClient::new(), document),
            ledger: ledger.enabled.then(|| MemoryLedger::new(ledger)),
            key,
            codes: VerificationCodes::new(verification.ttl),
            max_attempts: propagation.max_attempts,
        }
    }

    /// Extract and verify JWT claims from the authorization header.
    fn claims(&self, context: &Authorization<Bearer>) -> Option<JWTClaims<CustomJWTClaims>> {
        let token = context.0.token();
        self.key.verify_token::<CustomJWTClaims>(token, None).ok()
    }

    /// Complete expired auctions and drop stale verification codes
    pub async fn sweep(&self, now: OffsetDateTime) -> Result<(), MarketError> {
        services::expire_auctions(self).await?;
        let purged = self.codes.purge_expired(now);
        if purged > 0 {
            event!(Level::DEBUG, purged, "dropped expired verification codes");
        }
        Ok(())
    }

    /// Retry up to `batch_size` pending replica writes
    pub async fn propagate(&self, batch_size: usize) -> Result<PropagationReport, MarketError> {
        let report = services::propagate_pending(self, batch_size).await?;
        if report.attempted > 0 {
            event!(
                Level::INFO,
                attempted = report.attempted,
                succeeded = report.succeeded,
                failed = report.failed,
                "propagation pass"
            );
        }
        Ok(report)
    }
}

impl Application for MarketApp {
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
        OffsetDateTime::now_utc()
    }

    fn verification_codes(&self) -> &VerificationCodes {
        &self.codes
    }

    fn max_propagation_attempts(&self) -> u32 {
        self.max_attempts
    }

    async fn acting_developer(&self, context: &Self::Context) -> Option<DeveloperId> {
        // the standard sub: claim is the developer id
        self.claims(context)?.subject?.parse().ok()
    }

    async fn can_manage_auctions(&self, context: &Self::Context) -> bool {
        self.claims(context)
            .map(|claims| claims.custom.company || claims.custom.admin)
            .unwrap_or(false)
    }
}

/// Custom claims structure for JWT tokens.
#[derive(Serialize, Deserialize)]
pub struct CustomJWTClaims {
    /// The token holder runs auctions for a company
    #[serde(default)]
    pub company: bool,
    /// The token holder is an administrator
    #[serde(default)]
    pub admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bh_sqlite::config::SqliteConfig;
    use jwt_simple::prelude::{Claims, Duration};

    async fn app(key: &HS256Key) -> MarketApp {
        let db = Db::open(&SqliteConfig::default()).await.unwrap();
        MarketApp::new(
            db,
            key.clone(),
            &DocumentConfig::default(),
            &LedgerConfig::default(),
            &PropagationConfig::default(),
            &VerificationConfig::default(),
        )
    }

    fn bearer(
        key: &HS256Key,
        subject: Option<&str>,
        custom: CustomJWTClaims,
    ) -> Authorization<Bearer> {
        let mut claims = Claims::with_custom_claims(custom, Duration::from_hours(1));
        if let Some(subject) = subject {
            claims = claims.with_subject(subject);
        }
        let token = key.authenticate(claims).unwrap();
        Authorization::bearer(&token).unwrap()
    }

    #[tokio::test]
    async fn test_token_permissions() {
        let key = HS256Key::generate();
        let app = app(&key).await;
        assert!(app.ledger().is_none());

        let developer = bearer(&key, Some("9"), CustomJWTClaims { company: false, admin: false });
        assert_eq!(app.acting_developer(&developer).await, Some(DeveloperId(9)));
        assert!(!app.can_manage_auctions(&developer).await);

        let company = bearer(&key, None, CustomJWTClaims { company: true, admin: false });
        assert_eq!(app.acting_developer(&company).await, None);
        assert!(app.can_manage_auctions(&company).await);

        let claims = CustomJWTClaims {
            company: false,
            admin: true,
        };
        let admin = bearer(&key, Some("not-a-number"), claims);
        assert_eq!(app.acting_developer(&admin).await, None);
        assert!(app.can_manage_auctions(&admin).await);
    }

    #[tokio::test]
    async fn test_foreign_tokens_are_rejected() {
        let key = HS256Key::generate();
        let app = app(&key).await;

        let claims = CustomJWTClaims {
            company: true,
            admin: true,
        };
        let forged = bearer(&HS256Key::generate(), Some("9"), claims);
        assert_eq!(app.acting_developer(&forged).await, None);
        assert!(!app.can_manage_auctions(&forged).await);
    }

    #[tokio::test]
    async fn test_sweep_purges_codes() -> anyhow::Result<()> {
        let key = HS256Key::generate();
        let app = app(&key).await;
        let now = OffsetDateTime::now_utc();
        app.codes.issue("dev@example.com", now);

        app.sweep(now).await?;
        assert_eq!(app.codes.len(), 1);
        app.sweep(now + time::Duration::hours(1)).await?;
        assert!(app.codes.is_empty());

        let report = app.propagate(10).await?;
        assert_eq!(report.attempted, 0);
        Ok(())
    }
}
