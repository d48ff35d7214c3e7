use std::{fmt::Display, str::FromStr};

/// The largest amount, in cents, that survives a round trip through `f64`.
const MAX_CENTS: i64 = 1 << 53;

/// A strictly positive bid amount with two decimal places.
///
/// Amounts are held as integer cents so that equality is exact. Stores that
/// only know floating point (the document store) or fixed-point strings get a
/// conversion at the edge, and comparisons across stores happen on the
/// normalized `f64` produced by [`Amount::as_f64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(i64);

/// The ways an amount can be rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// NaN or infinite
    #[error("amount must be a finite number")]
    NotFinite,

    /// Zero, negative, or rounds to zero cents
    #[error("amount must be greater than zero")]
    NotPositive,

    /// Beyond the exactly-representable range
    #[error("amount is too large")]
    TooLarge,

    /// A string that is not a decimal number
    #[error("amount is not a decimal number: {0}")]
    NotNumeric(String),
}

impl Amount {
    /// Build an amount from a floating point value, rounding to the nearest cent
    pub fn from_f64(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        if value <= 0.0 {
            return Err(AmountError::NotPositive);
        }
        let cents = (value * 100.0).round();
        if cents > MAX_CENTS as f64 {
            return Err(AmountError::TooLarge);
        }
        Self::from_cents(cents as i64)
    }

    /// Build an amount from integer cents
    pub fn from_cents(cents: i64) -> Result<Self, AmountError> {
        if cents <= 0 {
            Err(AmountError::NotPositive)
        } else if cents > MAX_CENTS {
            Err(AmountError::TooLarge)
        } else {
            Ok(Self(cents))
        }
    }

    /// The amount in cents
    pub fn cents(self) -> i64 {
        self.0
    }

    /// The amount as a float, for cross-store comparison and JSON output
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f64>()
            .map_err(|_| AmountError::NotNumeric(s.to_owned()))?;
        Self::from_f64(value)
    }
}

impl serde::Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_untagged::UntaggedEnumVisitor::new()
            .expecting("a positive number or decimal string")
            .f64(|value| Amount::from_f64(value).map_err(serde::de::Error::custom))
            .i64(|value| Amount::from_f64(value as f64).map_err(serde::de::Error::custom))
            .u64(|value| Amount::from_f64(value as f64).map_err(serde::de::Error::custom))
            .string(|value| value.parse::<Amount>().map_err(serde::de::Error::custom))
            .deserialize(deserializer)
    }
}

#[cfg(feature = "schemars")]
impl schemars::JsonSchema for Amount {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> std::borrow::Cow<'static, str> {
        "Amount".into()
    }

    fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "oneOf": [
                { "type": "number", "exclusiveMinimum": 0 },
                { "type": "string", "pattern": "^\\s*[0-9]+(\\.[0-9]+)?\\s*$" },
            ]
        })
    }
}
