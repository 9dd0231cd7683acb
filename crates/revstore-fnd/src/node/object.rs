//! Object declaration and object revision nodes.
//!
//! These kinds attach a property-set blob (through a chunk reference) to an
//! object identity, plus a reference count and packed flag bits. The
//! property-set bytes themselves are decoded by the external resolver
//! boundary, never here.

use serde::{Deserialize, Serialize};

use revstore_types::CompactId;

use crate::bitfield;
use crate::chunk::ChunkReference;
use crate::error::{FndError, FndResult};
use crate::header::FileNodeHeader;
use crate::reader::Reader;

/// Object type descriptor: a 16-bit type index plus property flag bits,
/// packed into a u32 on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JcId(pub u32);

impl JcId {
    const BINARY: u32 = 1 << 16;
    const PROPERTY_SET: u32 = 1 << 17;
    const GRAPH_NODE: u32 = 1 << 18;
    const FILE_DATA: u32 = 1 << 19;
    const READ_ONLY: u32 = 1 << 20;

    /// A plain property-set object of the given type index.
    pub fn property_set(index: u16) -> Self {
        Self(u32::from(index) | Self::PROPERTY_SET)
    }

    /// A file-data object of the given type index.
    pub fn file_data(index: u16) -> Self {
        Self(u32::from(index) | Self::FILE_DATA)
    }

    /// The object type index.
    pub fn index(&self) -> u16 {
        self.0 as u16
    }

    /// The referenced data is an opaque binary blob.
    pub fn is_binary(&self) -> bool {
        self.0 & Self::BINARY != 0
    }

    /// The referenced data is a property set.
    pub fn is_property_set(&self) -> bool {
        self.0 & Self::PROPERTY_SET != 0
    }

    /// The object participates in the revision graph.
    pub fn is_graph_node(&self) -> bool {
        self.0 & Self::GRAPH_NODE != 0
    }

    /// The object carries file data stored outside the node stream.
    pub fn is_file_data(&self) -> bool {
        self.0 & Self::FILE_DATA != 0
    }

    /// The object must not be modified by writers.
    pub fn is_read_only(&self) -> bool {
        self.0 & Self::READ_ONLY != 0
    }
}

impl std::fmt::Debug for JcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JcId({:#06x}, flags={:#x})", self.index(), self.0 >> 16)
    }
}

/// Shared body of the original declaration kinds: object identity plus a
/// packed u32 of {jci:10, odcs:4, reserved:18}.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDeclarationBody {
    /// Declared object, resolvable through the global id table.
    pub oid: CompactId,
    /// Object type index (10 bits on the wire).
    pub jci: u16,
    /// Object-data-compatibility scheme (4 bits on the wire).
    pub odcs: u8,
}

impl ObjectDeclarationBody {
    const WIDTHS: [u32; 3] = [10, 4, 18];

    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        let oid = r.read_compact_id()?;
        let at = r.pos() as u64;
        let [jci, odcs, reserved] =
            bitfield::unpack(u64::from(r.read_u32()?), 32, Self::WIDTHS);
        if reserved != 0 {
            return Err(FndError::InvalidFormat {
                offset: at,
                reason: "object declaration reserved bits must be zero".into(),
            });
        }
        Ok(Self {
            oid,
            jci: jci as u16,
            odcs: odcs as u8,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        if self.jci >= 1 << 10 || self.odcs >= 1 << 4 {
            return Err(FndError::InvalidFormat {
                offset: 0,
                reason: format!("jci {:#x} or odcs {:#x} out of field range", self.jci, self.odcs),
            });
        }
        out.extend_from_slice(&self.oid.to_u64().to_le_bytes());
        let word =
            bitfield::pack([u64::from(self.jci), u64::from(self.odcs), 0], 32, Self::WIDTHS);
        out.extend_from_slice(&(word as u32).to_le_bytes());
        Ok(())
    }
}

/// Shared body of the second-generation declaration kinds: object identity,
/// full [`JcId`], and two reference-tracking flags in a packed byte.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDeclaration2Body {
    /// Declared object, resolvable through the global id table.
    pub oid: CompactId,
    /// Full object type descriptor.
    pub jcid: JcId,
    /// The property set contains object-id references.
    pub has_oid_references: bool,
    /// The property set contains object-space-id references.
    pub has_osid_references: bool,
}

impl ObjectDeclaration2Body {
    const WIDTHS: [u32; 3] = [1, 1, 6];

    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        let oid = r.read_compact_id()?;
        let jcid = JcId(r.read_u32()?);
        let [has_oid, has_osid, _reserved] =
            bitfield::unpack(u64::from(r.read_u8()?), 8, Self::WIDTHS);
        Ok(Self {
            oid,
            jcid,
            has_oid_references: has_oid != 0,
            has_osid_references: has_osid != 0,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        out.extend_from_slice(&self.oid.to_u64().to_le_bytes());
        out.extend_from_slice(&self.jcid.0.to_le_bytes());
        let byte = bitfield::pack(
            [
                u64::from(self.has_oid_references),
                u64::from(self.has_osid_references),
                0,
            ],
            8,
            Self::WIDTHS,
        );
        out.push(byte as u8);
        Ok(())
    }
}

macro_rules! declaration_with_ref_count {
    ($(#[$doc:meta])* $name:ident, $body:ty, $cref:ty) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Location of the object's property-set blob; may be nil for
            /// an object without data.
            pub reference: ChunkReference,
            /// Identity and type of the declared object.
            pub body: $body,
            /// Reference count of the object within its revision.
            pub cref: $cref,
        }

        impl $name {
            pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
                Ok(Self {
                    reference: ChunkReference::decode(r, header.format)?,
                    body: <$body>::decode(r)?,
                    cref: <$cref>::from_le_bytes(r.read_array()?),
                })
            }

            pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
                self.reference.encode(out)?;
                self.body.encode_body(out)?;
                out.extend_from_slice(&self.cref.to_le_bytes());
                Ok(())
            }
        }
    };
}

declaration_with_ref_count!(
    /// Declares an object with a 1-byte reference count (tag 0x02D).
    ObjectDeclarationWithRefCountFnd,
    ObjectDeclarationBody,
    u8
);

declaration_with_ref_count!(
    /// Declares an object with a 4-byte reference count (tag 0x02E).
    ObjectDeclarationWithRefCount2Fnd,
    ObjectDeclarationBody,
    u32
);

declaration_with_ref_count!(
    /// Declares a second-generation object with a 1-byte reference count
    /// (tag 0x0A4).
    ObjectDeclaration2RefCountFnd,
    ObjectDeclaration2Body,
    u8
);

declaration_with_ref_count!(
    /// Declares a second-generation object with a 4-byte reference count
    /// (tag 0x0A5).
    ObjectDeclaration2LargeRefCountFnd,
    ObjectDeclaration2Body,
    u32
);

macro_rules! read_only_declaration {
    ($(#[$doc:meta])* $name:ident, $cref:ty) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Location of the object's property-set blob.
            pub reference: ChunkReference,
            /// Identity and type of the declared object.
            pub body: ObjectDeclaration2Body,
            /// Reference count of the object within its revision.
            pub cref: $cref,
            /// Digest of the read-only data the declaration covers.
            pub data_hash: [u8; 16],
        }

        impl $name {
            pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
                Ok(Self {
                    reference: ChunkReference::decode(r, header.format)?,
                    body: ObjectDeclaration2Body::decode(r)?,
                    cref: <$cref>::from_le_bytes(r.read_array()?),
                    data_hash: r.read_array()?,
                })
            }

            pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
                self.reference.encode(out)?;
                self.body.encode_body(out)?;
                out.extend_from_slice(&self.cref.to_le_bytes());
                out.extend_from_slice(&self.data_hash);
                Ok(())
            }
        }
    };
}

read_only_declaration!(
    /// Read-only object declaration with a 1-byte reference count (tag 0x0C4).
    ReadOnlyObjectDeclaration2RefCountFnd,
    u8
);

read_only_declaration!(
    /// Read-only object declaration with a 4-byte reference count (tag 0x0C5).
    ReadOnlyObjectDeclaration2LargeRefCountFnd,
    u32
);

/// Revises an existing object, with the reference count packed into six
/// bits (tag 0x041).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRevisionWithRefCountFnd {
    /// Location of the revised property-set blob.
    pub reference: ChunkReference,
    /// Revised object.
    pub oid: CompactId,
    /// The property set contains object-id references.
    pub has_oid_references: bool,
    /// The property set contains object-space-id references.
    pub has_osid_references: bool,
    /// Reference count; at most 63 in this kind.
    pub cref: u8,
}

impl ObjectRevisionWithRefCountFnd {
    const WIDTHS: [u32; 3] = [1, 1, 6];

    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        let reference = ChunkReference::decode(r, header.format)?;
        let oid = r.read_compact_id()?;
        let [has_oid, has_osid, cref] =
            bitfield::unpack(u64::from(r.read_u8()?), 8, Self::WIDTHS);
        Ok(Self {
            reference,
            oid,
            has_oid_references: has_oid != 0,
            has_osid_references: has_osid != 0,
            cref: cref as u8,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        if self.cref >= 1 << 6 {
            return Err(FndError::InvalidFormat {
                offset: 0,
                reason: format!("cref {} exceeds the 6-bit field", self.cref),
            });
        }
        self.reference.encode(out)?;
        out.extend_from_slice(&self.oid.to_u64().to_le_bytes());
        let byte = bitfield::pack(
            [
                u64::from(self.has_oid_references),
                u64::from(self.has_osid_references),
                u64::from(self.cref),
            ],
            8,
            Self::WIDTHS,
        );
        out.push(byte as u8);
        Ok(())
    }
}

/// Revises an existing object with a full 4-byte reference count (tag 0x042).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRevisionWithRefCount2Fnd {
    /// Location of the revised property-set blob.
    pub reference: ChunkReference,
    /// Revised object.
    pub oid: CompactId,
    /// The property set contains object-id references.
    pub has_oid_references: bool,
    /// The property set contains object-space-id references.
    pub has_osid_references: bool,
    /// Reference count.
    pub cref: u32,
}

impl ObjectRevisionWithRefCount2Fnd {
    const WIDTHS: [u32; 3] = [1, 1, 30];

    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        let reference = ChunkReference::decode(r, header.format)?;
        let oid = r.read_compact_id()?;
        let at = r.pos() as u64;
        let [has_oid, has_osid, reserved] =
            bitfield::unpack(u64::from(r.read_u32()?), 32, Self::WIDTHS);
        if reserved != 0 {
            return Err(FndError::InvalidFormat {
                offset: at,
                reason: "object revision reserved bits must be zero".into(),
            });
        }
        Ok(Self {
            reference,
            oid,
            has_oid_references: has_oid != 0,
            has_osid_references: has_osid != 0,
            cref: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)?;
        out.extend_from_slice(&self.oid.to_u64().to_le_bytes());
        let word = bitfield::pack(
            [
                u64::from(self.has_oid_references),
                u64::from(self.has_osid_references),
                0,
            ],
            32,
            Self::WIDTHS,
        );
        out.extend_from_slice(&(word as u32).to_le_bytes());
        out.extend_from_slice(&self.cref.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkFormat;
    use crate::header::BaseType;

    fn header_with(format: ChunkFormat) -> FileNodeHeader {
        FileNodeHeader {
            node_type: 0,
            size: 4,
            format,
            base_type: BaseType::DataReference,
        }
    }

    #[test]
    fn jcid_flags() {
        let jcid = JcId::property_set(0x12);
        assert_eq!(jcid.index(), 0x12);
        assert!(jcid.is_property_set());
        assert!(!jcid.is_file_data());
        assert!(JcId::file_data(1).is_file_data());
    }

    #[test]
    fn declaration_body_rejects_nonzero_reserved() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&CompactId::new(1, 2).unwrap().to_u64().to_le_bytes());
        buf.extend_from_slice(&(1u32 << 20).to_le_bytes());
        let mut r = Reader::new_at(&buf, 0).unwrap();
        assert!(matches!(
            ObjectDeclarationBody::decode(&mut r),
            Err(FndError::InvalidFormat { offset: 8, .. })
        ));
    }

    #[test]
    fn declaration2_roundtrip_through_header_format() {
        let backing_len = 0x100;
        let node = ObjectDeclaration2RefCountFnd {
            reference: ChunkReference::new(0x20, 0x10, ChunkFormat::COMPACT).unwrap(),
            body: ObjectDeclaration2Body {
                oid: CompactId::new(2, 77).unwrap(),
                jcid: JcId::property_set(0x2C),
                has_oid_references: true,
                has_osid_references: false,
            },
            cref: 1,
        };
        let mut buf = Vec::new();
        node.encode_body(&mut buf).unwrap();
        buf.resize(backing_len, 0);
        let mut r = Reader::new_at(&buf, 0).unwrap();
        let back =
            ObjectDeclaration2RefCountFnd::decode(&mut r, &header_with(ChunkFormat::COMPACT))
                .unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn revision_cref_is_capped_at_six_bits() {
        let node = ObjectRevisionWithRefCountFnd {
            reference: ChunkReference::nil(ChunkFormat::STANDARD),
            oid: CompactId::new(0, 1).unwrap(),
            has_oid_references: false,
            has_osid_references: false,
            cref: 64,
        };
        assert!(node.encode_body(&mut Vec::new()).is_err());
    }

    #[test]
    fn revision_roundtrip_packs_flags_and_cref() {
        let node = ObjectRevisionWithRefCountFnd {
            reference: ChunkReference::nil(ChunkFormat::STANDARD),
            oid: CompactId::new(4, 9).unwrap(),
            has_oid_references: true,
            has_osid_references: true,
            cref: 63,
        };
        let mut buf = Vec::new();
        node.encode_body(&mut buf).unwrap();
        // ref (8) + oid (8) + packed byte.
        assert_eq!(buf.len(), 17);
        assert_eq!(*buf.last().unwrap(), 0b1111_1111);
        let mut r = Reader::new_at(&buf, 0).unwrap();
        let back =
            ObjectRevisionWithRefCountFnd::decode(&mut r, &header_with(ChunkFormat::STANDARD))
                .unwrap();
        assert_eq!(back, node);
    }
}
