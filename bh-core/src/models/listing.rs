use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use super::{Amount, AuctionId, BidKey, BidSource, DeveloperId};
use crate::MarketError;

const FORMATTED_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

/// The common shape every store's bid record is converted into.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBid {
    /// The store-native id, as a string
    pub id: String,
    /// The auction the bid was placed on
    pub auction_id: AuctionId,
    /// The bidder
    pub developer_id: DeveloperId,
    /// The amount, rounded to cents
    pub amount: f64,
    /// When the bid was placed
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// `created_at` in a human readable form
    pub formatted_date: String,
    /// The store the record came from
    pub source: BidSource,
    /// The idempotency key, absent on records written before keys existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<BidKey>,
}

impl NormalizedBid {
    /// Assemble a normalized record, deriving the formatted date
    pub fn new(
        id: String,
        auction_id: AuctionId,
        developer_id: DeveloperId,
        amount: Amount,
        created_at: OffsetDateTime,
        source: BidSource,
        key: Option<BidKey>,
    ) -> Self {
        let created_at = created_at.to_offset(time::UtcOffset::UTC);
        Self {
            id,
            auction_id,
            developer_id,
            amount: amount.as_f64(),
            formatted_date: format_date(created_at),
            created_at,
            source,
            key,
        }
    }

    /// The amount in whole cents, used for composite matching
    pub fn cents(&self) -> i64 {
        (self.amount * 100.0).round() as i64
    }
}

fn format_date(at: OffsetDateTime) -> String {
    // the format only uses fields every OffsetDateTime has
    at.format(FORMATTED_DATE)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Which stores a listing reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageSelection {
    /// A single store
    Only(BidSource),
    /// Every enabled store
    #[default]
    Both,
}

impl StorageSelection {
    /// The stores to read, in listing order
    pub fn sources(self, ledger_enabled: bool) -> Vec<BidSource> {
        match self {
            Self::Only(source) => vec![source],
            Self::Both if ledger_enabled => {
                vec![BidSource::Relational, BidSource::Document, BidSource::Ledger]
            }
            Self::Both => vec![BidSource::Relational, BidSource::Document],
        }
    }
}

impl FromStr for StorageSelection {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "both" | "all" => Ok(Self::Both),
            _ => s.parse().map(Self::Only),
        }
    }
}

impl Display for StorageSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Only(source) => source.fmt(f),
            Self::Both => f.write_str("both"),
        }
    }
}

impl Serialize for StorageSelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StorageSelection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "schemars")]
impl schemars::JsonSchema for StorageSelection {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> std::borrow::Cow<'static, str> {
        "StorageSelection".into()
    }

    fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "enum": ["postgresql", "postgres", "firebase", "blockchain", "both"],
        })
    }
}

fn default_limit() -> usize {
    10
}

/// Offset pagination parameters
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// The maximum number of records to return
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// The number of records to skip
    #[serde(default)]
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Page {
    /// Clamp the limit to `1..=max`
    pub fn clamp(self, max: usize) -> Self {
        Self {
            limit: self.limit.clamp(1, max.max(1)),
            offset: self.offset,
        }
    }
}

/// Pagination metadata for a listing
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The number of records before pagination
    pub total: usize,
    /// The requested limit
    pub limit: usize,
    /// The requested offset
    pub offset: usize,
    /// Whether records exist past this page
    pub has_more: bool,
}

/// A store that could not be read while building a listing
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// The store that failed
    pub source: BidSource,
    /// What went wrong
    pub message: String,
}

/// A merged, paginated listing of bids across stores
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidListing {
    /// The requested page of bids, newest first
    pub data: Vec<NormalizedBid>,
    /// Pagination metadata
    pub pagination: Pagination,
    /// The stores that were read successfully
    pub sources: Vec<BidSource>,
    /// The stores that failed
    pub errors: Vec<SourceFailure>,
}

impl BidListing {
    /// Merge partitions, sort newest first, then cut out the requested page.
    ///
    /// Ties on `created_at` fall back to the store order and then the id, so
    /// paging is stable across requests.
    pub fn merge(
        mut records: Vec<NormalizedBid>,
        page: Page,
        sources: Vec<BidSource>,
        errors: Vec<SourceFailure>,
    ) -> Self {
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.source.cmp(&b.source))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = records.len();
        let data: Vec<_> = records
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();

        Self {
            pagination: Pagination {
                total,
                limit: page.limit,
                offset: page.offset,
                has_more: page.offset.saturating_add(data.len()) < total,
            },
            data,
            sources,
            errors,
        }
    }
}
