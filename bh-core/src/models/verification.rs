use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The request body for issuing a code
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRequest {
    /// The address the code is for
    pub email: String,
}

/// A freshly issued code, handed to the caller for delivery
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCode {
    /// The address, trimmed and lowercased
    pub email: String,
    /// Six decimal digits
    pub code: String,
    /// When the code stops being accepted
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// The request body for checking a code
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCheck {
    /// The address the code was issued for
    pub email: String,
    /// The code as entered
    pub code: String,
}

/// The outcome of a code check
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeVerdict {
    /// The address, trimmed and lowercased
    pub email: String,
    /// Whether the code matched and was consumed
    pub verified: bool,
}
