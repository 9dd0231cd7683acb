use std::fmt;

use serde::{Deserialize, Serialize};

use crate::guid::Guid;

/// Wire form of an [`ExGuid`] payload.
///
/// The form is not self-describing: each node kind declares which form its
/// identifiers use, and the decoder passes it in explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExGuidForm {
    /// 32-bit counter payload (8 wire bytes total).
    Counter,
    /// Full 128-bit GUID payload (20 wire bytes total).
    Guid,
}

impl ExGuidForm {
    /// Total encoded size of an `ExGuid` in this form, including the space
    /// index.
    pub const fn encoded_len(&self) -> usize {
        match self {
            ExGuidForm::Counter => 8,
            ExGuidForm::Guid => 20,
        }
    }
}

/// Payload of an [`ExGuid`]: a counter within the space, or a full GUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExGuidPayload {
    Counter(u32),
    Guid(Guid),
}

/// An extended identifier: a 32-bit object-space index plus a payload.
///
/// Extended identifiers are self-contained — unlike [`CompactId`]
/// (crate::CompactId), resolving one never consults the global
/// identification table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExGuid {
    /// Object-space index.
    pub space: u32,
    /// Counter or GUID payload.
    pub payload: ExGuidPayload,
}

impl ExGuid {
    /// An identifier with a counter payload.
    pub const fn counter(space: u32, counter: u32) -> Self {
        Self {
            space,
            payload: ExGuidPayload::Counter(counter),
        }
    }

    /// An identifier with a GUID payload.
    pub const fn guid(space: u32, guid: Guid) -> Self {
        Self {
            space,
            payload: ExGuidPayload::Guid(guid),
        }
    }

    /// The wire form this identifier's payload requires.
    pub fn form(&self) -> ExGuidForm {
        match self.payload {
            ExGuidPayload::Counter(_) => ExGuidForm::Counter,
            ExGuidPayload::Guid(_) => ExGuidForm::Guid,
        }
    }
}

impl fmt::Debug for ExGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            ExGuidPayload::Counter(n) => write!(f, "ExGuid({}, n={})", self.space, n),
            ExGuidPayload::Guid(g) => write!(f, "ExGuid({}, {})", self.space, g),
        }
    }
}

impl fmt::Display for ExGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            ExGuidPayload::Counter(n) => write!(f, "{}/{}", self.space, n),
            ExGuidPayload::Guid(g) => write!(f, "{}/{}", self.space, g),
        }
    }
}
