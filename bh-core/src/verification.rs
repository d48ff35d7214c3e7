//! Short-lived, single-use verification codes keyed by email address.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use rand::Rng as _;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
struct Entry {
    code: String,
    expires_at: OffsetDateTime,
}

/// A concurrent store of verification codes with per-entry expiry.
///
/// Cloning is cheap and clones share the same entries, so one store can be
/// handed to every request handler and to the purge task.
#[derive(Debug, Clone)]
pub struct VerificationCodes {
    entries: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl VerificationCodes {
    /// A store whose codes expire `ttl` after issue
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Issue a fresh six-digit code for `email`, replacing any previous one
    pub fn issue(&self, email: &str, now: OffsetDateTime) -> String {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        self.entries.insert(
            normalize(email),
            Entry {
                code: code.clone(),
                expires_at: now + self.ttl,
            },
        );
        code
    }

    /// Check a code. A matching, unexpired code is consumed.
    pub fn verify(&self, email: &str, code: &str, now: OffsetDateTime) -> bool {
        self.entries
            .remove_if(&normalize(email), |_, entry| {
                entry.expires_at >= now && entry.code == code.trim()
            })
            .is_some()
    }

    /// Drop every expired code, returning how many were removed
    pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at >= now);
        before.saturating_sub(self.entries.len())
    }

    /// How long a code stays valid
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
