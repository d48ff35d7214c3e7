//! Strongly-typed identifiers.
//!
//! Relational rows are keyed by positive integers. Clients send those either
//! as JSON numbers or as numeric strings (form posts and path segments), so
//! deserialization accepts both while serialization always produces numbers.
//! Using a distinct type per entity keeps an auction id from being passed
//! where a developer id is expected.

use std::{fmt::Display, str::FromStr};

/// Failure to interpret a value as an identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Zero and negative values are never valid identifiers
    #[error("identifier must be a positive integer")]
    NotPositive,

    /// The value could not be parsed as an integer
    #[error("identifier is not numeric: {0}")]
    NotNumeric(String),
}

fn check_id(value: i64) -> Result<i64, IdError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(IdError::NotPositive)
    }
}

fn parse_id(value: &str) -> Result<i64, IdError> {
    let parsed = value
        .trim()
        .parse::<i64>()
        .map_err(|_| IdError::NotNumeric(value.to_owned()))?;
    check_id(parsed)
}

fn widen_id(value: u64) -> Result<i64, IdError> {
    i64::try_from(value)
        .map_err(|_| IdError::NotNumeric(value.to_string()))
        .and_then(check_id)
}

macro_rules! numeric_id {
    ($struct:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        pub struct $struct(pub i64);

        impl $struct {
            /// Wrap a raw value, rejecting anything that is not strictly positive
            pub fn new(value: i64) -> Result<Self, IdError> {
                check_id(value).map($struct)
            }
        }

        impl From<$struct> for i64 {
            fn from(value: $struct) -> Self {
                value.0
            }
        }

        impl Display for $struct {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $struct {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_id(s).map($struct)
            }
        }

        impl<'de> serde::Deserialize<'de> for $struct {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                serde_untagged::UntaggedEnumVisitor::new()
                    .expecting("a positive integer or a numeric string")
                    .i64(|value| {
                        check_id(value)
                            .map($struct)
                            .map_err(serde::de::Error::custom)
                    })
                    .u64(|value| {
                        widen_id(value)
                            .map($struct)
                            .map_err(serde::de::Error::custom)
                    })
                    .string(|value| {
                        parse_id(value)
                            .map($struct)
                            .map_err(serde::de::Error::custom)
                    })
                    .deserialize(deserializer)
            }
        }

        #[cfg(feature = "schemars")]
        impl schemars::JsonSchema for $struct {
            fn inline_schema() -> bool {
                true
            }

            fn schema_name() -> std::borrow::Cow<'static, str> {
                stringify!($struct).into()
            }

            fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
                schemars::json_schema!({
                    "oneOf": [
                        { "type": "integer", "minimum": 1 },
                        { "type": "string", "pattern": "^\\s*[0-9]+\\s*$" },
                    ]
                })
            }
        }
    };
}

numeric_id!(AuctionId, "Identifier of an auction row");
numeric_id!(BidId, "Identifier of a bid row in the relational store");
numeric_id!(DeveloperId, "Identifier of a developer (the bidder)");
numeric_id!(ProjectId, "Identifier of the project an auction is attached to");
numeric_id!(WinnerId, "Identifier of a winner record");

/// Idempotency key shared by every copy of a bid.
///
/// The key is generated once, when the bid is first written to the relational
/// store, and travels with the bid to the document store and the ledger.
/// Reconciliation pairs records by this key rather than by mutable fields.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct BidKey(pub uuid::Uuid);

impl BidKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl From<uuid::Uuid> for BidKey {
    fn from(value: uuid::Uuid) -> Self {
        Self(value)
    }
}

impl Display for BidKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BidKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
