use std::cmp::Ordering;

use indexmap::IndexMap;
use time::OffsetDateTime;

/// A document's fields, in insertion order
pub type Fields = IndexMap<String, Value>;

/// A point in time as document stores represent it: whole seconds since the
/// epoch plus nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Nanoseconds past `seconds`, always below one billion
    pub nanos: u32,
}

impl From<OffsetDateTime> for Timestamp {
    fn from(value: OffsetDateTime) -> Self {
        Self {
            seconds: value.unix_timestamp(),
            nanos: value.nanosecond(),
        }
    }
}

impl TryFrom<Timestamp> for OffsetDateTime {
    type Error = time::error::ComponentRange;

    fn try_from(value: Timestamp) -> Result<Self, Self::Error> {
        OffsetDateTime::from_unix_timestamp_nanos(
            i128::from(value.seconds) * 1_000_000_000 + i128::from(value.nanos),
        )
    }
}

/// A field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An explicit null
    Null,
    /// A 64-bit integer
    Integer(i64),
    /// A double
    Double(f64),
    /// A native timestamp
    Timestamp(Timestamp),
    /// A UTF-8 string
    String(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Integer(_) | Self::Double(_) => 1,
            Self::Timestamp(_) => 2,
            Self::String(_) => 3,
        }
    }

    /// Total order used for sorting: nulls, then numbers, then timestamps,
    /// then strings. Integers and doubles compare numerically.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Double(b)) => (*a as f64).total_cmp(b),
            (Self::Double(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// The string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// The integer, if this is one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

/// A document together with its store-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// The generated document id
    pub id: String,
    /// The document's fields
    pub fields: Fields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion() {
        let now = OffsetDateTime::now_utc();
        let stamp = Timestamp::from(now);
        assert_eq!(OffsetDateTime::try_from(stamp).unwrap(), now);
    }

    #[test]
    fn test_value_order() {
        assert_eq!(Value::Integer(2).compare(&Value::Double(2.5)), Ordering::Less);
        assert_eq!(Value::Null.compare(&Value::Integer(0)), Ordering::Less);
        assert_eq!(
            Value::String("a".into()).compare(&Value::Integer(9)),
            Ordering::Greater
        );
    }
}
