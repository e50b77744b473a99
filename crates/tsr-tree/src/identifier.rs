//! Identifier-typed setting values
//!
//! Some settings carry directory object ids (security groups, environment
//! groups). The all-zero id is a documented sentinel meaning "no restriction".

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use uuid::Uuid;

use crate::field::{Field, Value};

/// A UUID-valued setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// `00000000-0000-0000-0000-000000000000`
    pub const ZERO: Self = Self(Uuid::nil());

    #[inline]
    #[must_use]
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Fresh random identifier
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|source| IdentifierError::Invalid {
                value: s.to_string(),
                source,
            })
    }
}

impl From<Identifier> for Value {
    fn from(id: Identifier) -> Self {
        Value::String(id.to_string())
    }
}

impl From<Identifier> for Field {
    fn from(id: Identifier) -> Self {
        Field::Known(id.into())
    }
}

/// Errors produced when parsing identifiers
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid identifier '{value}': {source}")]
    Invalid {
        value: String,
        #[source]
        source: uuid::Error,
    },
}
