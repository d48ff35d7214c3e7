use bh_core::models::DeveloperId;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

// To exercise the permission checks in the endpoints, permissions are written
// as plain text into the `Authorization: Bearer <...>` header, e.g.
// `developer=9` or `company=true`.
#[derive(Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub developer: Option<DeveloperId>,
    #[serde(default)]
    pub company: bool,
}

impl Permissions {
    pub fn developer(id: i64) -> Self {
        Self {
            developer: Some(DeveloperId(id)),
            company: false,
        }
    }

    pub fn company() -> Self {
        Self {
            developer: None,
            company: true,
        }
    }
}

impl Display for Permissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", serde_html_form::to_string(self).unwrap())
    }
}

impl FromStr for Permissions {
    type Err = serde_html_form::de::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let deserializer = serde_html_form::Deserializer::new(form_urlencoded::parse(s.as_bytes()));
        Self::deserialize(deserializer)
    }
}
