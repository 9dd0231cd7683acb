use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// A 16-byte globally unique identifier.
///
/// On the wire a `Guid` occupies 16 bytes in the platform-conventional GUID
/// byte order: the first three fields little-endian, the final eight bytes
/// verbatim. The all-zero GUID is the nil value and never names an object.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid(Uuid);

impl Guid {
    /// The nil GUID (all zeros).
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the nil GUID.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Construct from 16 wire bytes (little-endian field order).
    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes_le(bytes))
    }

    /// The 16 wire bytes (little-endian field order).
    pub fn to_bytes_le(&self) -> [u8; 16] {
        self.0.to_bytes_le()
    }

    /// Create a random `Guid` for tests and demos.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 16];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse from a string, with or without surrounding braces.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|e| TypeError::InvalidGuid(e.to_string()))
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<Guid> for Uuid {
    fn from(guid: Guid) -> Self {
        guid.0
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.as_hyphenated().to_string().to_uppercase())
    }
}
