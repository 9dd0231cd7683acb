//! Global-identification-table patch nodes.
//!
//! Replay semantics live in [`crate::idtable`]; these are only the wire
//! structures.

use serde::{Deserialize, Serialize};

use revstore_types::Guid;

use crate::error::FndResult;
use crate::reader::Reader;

/// Resets the table and opens a new build (tag 0x021).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalIdTableStartFnd {
    /// Reserved byte; writers emit zero.
    pub reserved: u8,
}

impl GlobalIdTableStartFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            reserved: r.read_u8()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        out.push(self.reserved);
        Ok(())
    }
}

/// Adds one index → GUID mapping (tag 0x024).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalIdTableEntryFnd {
    /// Slot being defined.
    pub index: u32,
    /// Identifier the slot maps to.
    pub guid: Guid,
}

impl GlobalIdTableEntryFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            index: r.read_u32()?,
            guid: r.read_guid()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(&self.guid.to_bytes_le());
        Ok(())
    }
}

/// Copies one slot of the previous table into the new one (tag 0x025).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalIdTableEntry2Fnd {
    /// Source slot in the table being replayed.
    pub index_from: u32,
    /// Destination slot.
    pub index_to: u32,
}

impl GlobalIdTableEntry2Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            index_from: r.read_u32()?,
            index_to: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        out.extend_from_slice(&self.index_from.to_le_bytes());
        out.extend_from_slice(&self.index_to.to_le_bytes());
        Ok(())
    }
}

/// Copies a contiguous range of slots (tag 0x026).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalIdTableEntry3Fnd {
    /// First source slot.
    pub index_copy_from_start: u32,
    /// Number of slots to copy; zero is a no-op.
    pub entries_to_copy: u32,
    /// First destination slot.
    pub index_copy_to_start: u32,
}

impl GlobalIdTableEntry3Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            index_copy_from_start: r.read_u32()?,
            entries_to_copy: r.read_u32()?,
            index_copy_to_start: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        out.extend_from_slice(&self.index_copy_from_start.to_le_bytes());
        out.extend_from_slice(&self.entries_to_copy.to_le_bytes());
        out.extend_from_slice(&self.index_copy_to_start.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_roundtrip() {
        let node = GlobalIdTableEntryFnd {
            index: 7,
            guid: Guid::ephemeral(),
        };
        let mut buf = Vec::new();
        node.encode_body(&mut buf).unwrap();
        assert_eq!(buf.len(), 20);
        let mut r = Reader::new_at(&buf, 0).unwrap();
        assert_eq!(GlobalIdTableEntryFnd::decode(&mut r).unwrap(), node);
    }

    #[test]
    fn entry3_roundtrip() {
        let node = GlobalIdTableEntry3Fnd {
            index_copy_from_start: 0,
            entries_to_copy: 4,
            index_copy_to_start: 10,
        };
        let mut buf = Vec::new();
        node.encode_body(&mut buf).unwrap();
        let mut r = Reader::new_at(&buf, 0).unwrap();
        assert_eq!(GlobalIdTableEntry3Fnd::decode(&mut r).unwrap(), node);
    }
}
