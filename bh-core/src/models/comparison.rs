//! Divergence reporting between the relational store and the document store.
//!
//! Records are paired by idempotency key when both sides carry one. Records
//! written before keys existed fall back to the composite
//! `(developer_id, amount in cents)`. Matching is a multiset match: every
//! record pairs with at most one record on the other side, so two identical
//! bids on one side and one on the other leave exactly one unmatched.
//!
//! A key pair whose amounts disagree is the same bid edited in only one
//! store. It is reported under `mismatched` and makes the comparison
//! inconsistent.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{AuctionId, BidKey, DeveloperId, NormalizedBid};

/// How a pair of records was matched
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    /// Both records carry the same idempotency key
    IdempotencyKey,
    /// At least one record lacks a key; developer and amount agree
    DeveloperAmount,
}

/// A record present in both stores
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedBid {
    /// The relational copy
    pub postgres: NormalizedBid,
    /// The document copy
    pub firebase: NormalizedBid,
    /// How the two were paired
    pub matched_on: MatchKind,
}

/// Partition sizes of a comparison
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    /// Records read from the relational store
    pub postgres_count: usize,
    /// Records read from the document store
    pub firebase_count: usize,
    /// Pairs found in both with equal amounts
    pub common_count: usize,
    /// Key pairs whose amounts differ
    pub mismatched_count: usize,
    /// Relational records without a partner
    pub postgres_only_count: usize,
    /// Document records without a partner
    pub firebase_only_count: usize,
}

/// The result of comparing one auction's bids across the two stores
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidComparison {
    /// The auction compared
    pub auction_id: AuctionId,
    /// Records present in both stores
    pub common_bids: Vec<MatchedBid>,
    /// Records sharing a key whose amounts differ
    pub mismatched: Vec<MatchedBid>,
    /// Records only in the relational store
    pub postgres_only: Vec<NormalizedBid>,
    /// Records only in the document store
    pub firebase_only: Vec<NormalizedBid>,
    /// True when every record is paired and every pair agrees on the amount
    pub is_consistent: bool,
    /// Partition sizes
    pub summary: ComparisonSummary,
}

impl BidComparison {
    /// Pair up the two partitions
    pub fn build(
        auction_id: AuctionId,
        relational: Vec<NormalizedBid>,
        document: Vec<NormalizedBid>,
    ) -> Self {
        let postgres_count = relational.len();
        let firebase_count = document.len();

        let mut partner: Vec<Option<(usize, MatchKind)>> = vec![None; relational.len()];
        let mut taken = vec![false; document.len()];

        // First pass: idempotency keys
        let mut by_key: FxHashMap<BidKey, Vec<usize>> = FxHashMap::default();
        for (j, bid) in document.iter().enumerate() {
            if let Some(key) = bid.key {
                by_key.entry(key).or_default().push(j);
            }
        }
        for (i, bid) in relational.iter().enumerate() {
            let Some(candidates) = bid.key.and_then(|key| by_key.get(&key)) else {
                continue;
            };
            if let Some(&j) = candidates.iter().find(|&&j| !taken[j]) {
                taken[j] = true;
                partner[i] = Some((j, MatchKind::IdempotencyKey));
            }
        }

        // Second pass: composite key, only where a side has no idempotency key
        let mut by_composite: FxHashMap<(DeveloperId, i64), Vec<usize>> = FxHashMap::default();
        for (j, bid) in document.iter().enumerate() {
            if !taken[j] {
                by_composite
                    .entry((bid.developer_id, bid.cents()))
                    .or_default()
                    .push(j);
            }
        }
        for (i, bid) in relational.iter().enumerate() {
            if partner[i].is_some() {
                continue;
            }
            let Some(candidates) = by_composite.get(&(bid.developer_id, bid.cents())) else {
                continue;
            };
            let found = candidates
                .iter()
                .copied()
                .find(|&j| !taken[j] && (bid.key.is_none() || document[j].key.is_none()));
            if let Some(j) = found {
                taken[j] = true;
                partner[i] = Some((j, MatchKind::DeveloperAmount));
            }
        }

        let mut document: Vec<Option<NormalizedBid>> = document.into_iter().map(Some).collect();
        let mut common_bids = Vec::new();
        let mut mismatched = Vec::new();
        let mut postgres_only = Vec::new();
        for (bid, paired) in relational.into_iter().zip(partner) {
            match paired.and_then(|(j, kind)| document[j].take().map(|doc| (doc, kind))) {
                Some((firebase, matched_on)) => {
                    let pair = MatchedBid {
                        postgres: bid,
                        firebase,
                        matched_on,
                    };
                    if pair.postgres.cents() == pair.firebase.cents() {
                        common_bids.push(pair);
                    } else {
                        mismatched.push(pair);
                    }
                }
                None => postgres_only.push(bid),
            }
        }
        let firebase_only: Vec<_> = document.into_iter().flatten().collect();

        Self {
            auction_id,
            is_consistent: postgres_only.is_empty()
                && firebase_only.is_empty()
                && mismatched.is_empty(),
            summary: ComparisonSummary {
                postgres_count,
                firebase_count,
                common_count: common_bids.len(),
                mismatched_count: mismatched.len(),
                postgres_only_count: postgres_only.len(),
                firebase_only_count: firebase_only.len(),
            },
            common_bids,
            mismatched,
            postgres_only,
            firebase_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, BidSource};
    use time::macros::datetime;

    fn bid(
        source: BidSource,
        id: &str,
        developer: i64,
        cents: i64,
        key: Option<BidKey>,
    ) -> NormalizedBid {
        NormalizedBid::new(
            id.to_owned(),
            AuctionId(1),
            DeveloperId(developer),
            Amount::from_cents(cents).unwrap(),
            datetime!(2025-01-01 00:00:00 UTC),
            source,
            key,
        )
    }

    fn pg(id: &str, developer: i64, cents: i64, key: Option<BidKey>) -> NormalizedBid {
        bid(BidSource::Relational, id, developer, cents, key)
    }

    fn doc(id: &str, developer: i64, cents: i64, key: Option<BidKey>) -> NormalizedBid {
        bid(BidSource::Document, id, developer, cents, key)
    }

    fn check_counts(cmp: &BidComparison) {
        let s = cmp.summary;
        let paired = s.common_count + s.mismatched_count;
        assert_eq!(paired + s.postgres_only_count, s.postgres_count);
        assert_eq!(paired + s.firebase_only_count, s.firebase_count);
        assert_eq!(
            cmp.is_consistent,
            s.postgres_only_count == 0 && s.firebase_only_count == 0 && s.mismatched_count == 0
        );
    }

    #[test]
    fn test_amount_drift_under_one_key_is_inconsistent() {
        let key = BidKey::generate();
        let cmp = BidComparison::build(
            AuctionId(1),
            vec![pg("1", 9, 25000, Some(key))],
            vec![doc("x", 9, 10000, Some(key))],
        );
        check_counts(&cmp);
        assert!(!cmp.is_consistent);
        assert!(cmp.common_bids.is_empty());
        assert!(cmp.postgres_only.is_empty());
        assert!(cmp.firebase_only.is_empty());
        assert_eq!(cmp.summary.mismatched_count, 1);
        let pair = &cmp.mismatched[0];
        assert_eq!(pair.matched_on, MatchKind::IdempotencyKey);
        assert_eq!(pair.postgres.cents(), 25000);
        assert_eq!(pair.firebase.cents(), 10000);
    }

    #[test]
    fn test_same_key_same_amount_is_common() {
        let key = BidKey::generate();
        let cmp = BidComparison::build(
            AuctionId(1),
            vec![pg("1", 9, 10000, Some(key))],
            vec![doc("x", 9, 10000, Some(key))],
        );
        check_counts(&cmp);
        assert!(cmp.is_consistent);
        assert!(cmp.mismatched.is_empty());
        assert_eq!(cmp.common_bids[0].matched_on, MatchKind::IdempotencyKey);
    }

    #[test]
    fn test_distinct_keys_never_match_on_composite() {
        let cmp = BidComparison::build(
            AuctionId(1),
            vec![pg("1", 9, 10000, Some(BidKey::generate()))],
            vec![doc("x", 9, 10000, Some(BidKey::generate()))],
        );
        check_counts(&cmp);
        assert!(!cmp.is_consistent);
        assert_eq!(cmp.summary.postgres_only_count, 1);
        assert_eq!(cmp.summary.firebase_only_count, 1);
    }

    #[test]
    fn test_legacy_records_match_on_composite() {
        let cmp = BidComparison::build(
            AuctionId(1),
            vec![pg("1", 9, 10000, Some(BidKey::generate())), pg("2", 4, 550, None)],
            vec![doc("x", 9, 10000, None), doc("y", 4, 550, None)],
        );
        check_counts(&cmp);
        assert!(cmp.is_consistent);
        assert!(
            cmp.common_bids
                .iter()
                .all(|pair| pair.matched_on == MatchKind::DeveloperAmount)
        );
    }

    #[test]
    fn test_multiset_matching() {
        // two identical legacy records on one side, one on the other
        let cmp = BidComparison::build(
            AuctionId(1),
            vec![pg("1", 9, 10000, None), pg("2", 9, 10000, None)],
            vec![doc("x", 9, 10000, None)],
        );
        check_counts(&cmp);
        assert_eq!(cmp.summary.common_count, 1);
        assert_eq!(cmp.postgres_only.len(), 1);
        assert_eq!(cmp.postgres_only[0].id, "2");
        assert!(cmp.firebase_only.is_empty());
    }

    #[test]
    fn test_counts_hold_for_mixed_inputs() {
        let shared = BidKey::generate();
        let cases = [
            (vec![], vec![]),
            (vec![pg("1", 1, 100, None)], vec![]),
            (vec![], vec![doc("a", 1, 100, None)]),
            (
                vec![pg("1", 1, 100, Some(shared)), pg("2", 2, 200, None), pg("3", 2, 200, None)],
                vec![
                    doc("a", 1, 100, Some(shared)),
                    doc("b", 2, 200, None),
                    doc("c", 3, 300, Some(BidKey::generate())),
                ],
            ),
            (
                vec![pg("1", 1, 150, Some(shared)), pg("2", 2, 200, None)],
                vec![doc("a", 1, 100, Some(shared))],
            ),
        ];
        for (relational, document) in cases {
            let cmp = BidComparison::build(AuctionId(1), relational, document);
            check_counts(&cmp);
        }
    }
}
