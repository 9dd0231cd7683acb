//! The packed 4-byte header shared by every file node.

use serde::{Deserialize, Serialize};

use crate::bitfield;
use crate::chunk::{CbFormat, ChunkFormat, StpFormat};
use crate::error::{FndError, FndResult};
use crate::reader::Reader;

/// Encoded size of a node header.
pub const HEADER_LEN: usize = 4;

/// Maximum node size representable in the header's 13-bit size field.
pub const MAX_NODE_SIZE: usize = (1 << 13) - 1;

/// Bit widths of the header fields, LSB-first: node type, size, stp format,
/// cb format, base type, reserved.
const HEADER_WIDTHS: [u32; 6] = [10, 13, 2, 2, 4, 1];

/// What a node's chunk reference, if any, points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseType {
    /// The node owns no chunk reference.
    None = 0,
    /// The node references opaque data (a property set or blob).
    DataReference = 1,
    /// The node references a nested file-node list.
    ListReference = 2,
}

impl BaseType {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(BaseType::None),
            1 => Some(BaseType::DataReference),
            2 => Some(BaseType::ListReference),
            _ => None,
        }
    }
}

/// Decoded node header.
///
/// `size` covers the whole node including the header itself; `format` fixes
/// the widths of every chunk reference the node body owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNodeHeader {
    pub node_type: u16,
    pub size: u16,
    pub format: ChunkFormat,
    pub base_type: BaseType,
}

impl FileNodeHeader {
    /// Decode the header at the reader's cursor.
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        let at = r.pos() as u64;
        let word = r.read_u32()?;
        let [node_type, size, stp, cb, base, reserved] =
            bitfield::unpack(u64::from(word), 32, HEADER_WIDTHS);
        if reserved != 1 {
            return Err(FndError::InvalidFormat {
                offset: at,
                reason: "header reserved bit must be set".into(),
            });
        }
        let base_type = BaseType::from_bits(base as u8).ok_or_else(|| FndError::InvalidFormat {
            offset: at,
            reason: format!("invalid base type {base}"),
        })?;
        if (size as usize) < HEADER_LEN {
            return Err(FndError::InvalidFormat {
                offset: at,
                reason: format!("node size {size} smaller than header"),
            });
        }
        Ok(Self {
            node_type: node_type as u16,
            size: size as u16,
            format: ChunkFormat {
                stp: StpFormat::from_bits(stp as u8),
                cb: CbFormat::from_bits(cb as u8),
            },
            base_type,
        })
    }

    /// The packed header word.
    pub(crate) fn encode(&self) -> u32 {
        bitfield::pack(
            [
                u64::from(self.node_type),
                u64::from(self.size),
                u64::from(self.format.stp.bits()),
                u64::from(self.format.cb.bits()),
                self.base_type as u64,
                1,
            ],
            32,
            HEADER_WIDTHS,
        ) as u32
    }

    /// Body length: declared size minus the header itself.
    pub fn body_len(&self) -> usize {
        self.size as usize - HEADER_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_word(word: u32) -> FndResult<FileNodeHeader> {
        let bytes = word.to_le_bytes();
        let mut r = Reader::new_at(&bytes, 0).unwrap();
        FileNodeHeader::decode(&mut r)
    }

    #[test]
    fn header_roundtrip() {
        let header = FileNodeHeader {
            node_type: 0x0A4,
            size: 30,
            format: ChunkFormat::COMPACT,
            base_type: BaseType::DataReference,
        };
        assert_eq!(decode_word(header.encode()).unwrap(), header);
    }

    #[test]
    fn field_positions_match_wire_layout() {
        let header = FileNodeHeader {
            node_type: 0x004,
            size: 24,
            format: ChunkFormat::LARGE,
            base_type: BaseType::None,
        };
        let word = header.encode();
        assert_eq!(word & 0x3FF, 0x004);
        assert_eq!((word >> 10) & 0x1FFF, 24);
        assert_eq!(word >> 31, 1);
    }

    #[test]
    fn clear_reserved_bit_is_rejected() {
        let header = FileNodeHeader {
            node_type: 0x01C,
            size: 4,
            format: ChunkFormat::STANDARD,
            base_type: BaseType::None,
        };
        let word = header.encode() & 0x7FFF_FFFF;
        assert!(matches!(
            decode_word(word),
            Err(FndError::InvalidFormat { offset: 0, .. })
        ));
    }

    #[test]
    fn undersized_node_is_rejected() {
        let word = bitfield::pack([0x01C, 2, 0, 0, 0, 1], 32, HEADER_WIDTHS) as u32;
        assert!(decode_word(word).is_err());
    }
}
