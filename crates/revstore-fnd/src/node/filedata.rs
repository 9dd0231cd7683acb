//! File-data-store nodes and the fixed blob structure they reference.

use serde::{Deserialize, Serialize};

use revstore_types::{CompactId, Guid};

use crate::chunk::ChunkReference;
use crate::error::{FndError, FndResult};
use crate::header::FileNodeHeader;
use crate::node::object::JcId;
use crate::reader::Reader;

/// Read a length-prefixed UTF-16LE string (count is in code units).
fn read_wide_string(r: &mut Reader<'_>) -> FndResult<String> {
    let cch = r.read_u32()? as usize;
    let at = r.pos() as u64;
    let byte_len = cch.checked_mul(2).ok_or_else(|| FndError::InvalidFormat {
        offset: at,
        reason: "string length overflow".into(),
    })?;
    let raw = r.read_bytes(byte_len)?;
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| FndError::InvalidFormat {
        offset: at,
        reason: "invalid UTF-16 string".into(),
    })
}

/// Append a length-prefixed UTF-16LE string.
fn write_wide_string(out: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    out.extend_from_slice(&(units.len() as u32).to_le_bytes());
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

macro_rules! file_data_declaration {
    ($(#[$doc:meta])* $name:ident, $cref:ty) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Declared object, resolvable through the global id table.
            pub oid: CompactId,
            /// Object type descriptor; the file-data flag is expected set.
            pub jcid: JcId,
            /// Reference count of the object within its revision.
            pub cref: $cref,
            /// Locator for the payload: a file-data-store identifier or an
            /// external file name.
            pub file_data_reference: String,
            /// Extension hint for the payload.
            pub extension: String,
        }

        impl $name {
            pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
                Ok(Self {
                    oid: r.read_compact_id()?,
                    jcid: JcId(r.read_u32()?),
                    cref: <$cref>::from_le_bytes(r.read_array()?),
                    file_data_reference: read_wide_string(r)?,
                    extension: read_wide_string(r)?,
                })
            }

            pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
                out.extend_from_slice(&self.oid.to_u64().to_le_bytes());
                out.extend_from_slice(&self.jcid.0.to_le_bytes());
                out.extend_from_slice(&self.cref.to_le_bytes());
                write_wide_string(out, &self.file_data_reference);
                write_wide_string(out, &self.extension);
                Ok(())
            }
        }
    };
}

file_data_declaration!(
    /// Declares a file-data object with a 1-byte reference count (tag 0x072).
    ObjectDeclarationFileData3RefCountFnd,
    u8
);

file_data_declaration!(
    /// Declares a file-data object with a 4-byte reference count (tag 0x073).
    ObjectDeclarationFileData3LargeRefCountFnd,
    u32
);

/// References the file-data-store node list (tag 0x090).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileDataStoreListReferenceFnd {
    /// Location of the file-data-store list fragment.
    pub reference: ChunkReference,
}

impl FileDataStoreListReferenceFnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)
    }
}

/// References one stored file-data blob (tag 0x094).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileDataStoreObjectReferenceFnd {
    /// Location of the [`FileDataStoreObject`] structure.
    pub reference: ChunkReference,
    /// Identifier the file-data declarations use to name this blob.
    pub file_data_id: Guid,
}

impl FileDataStoreObjectReferenceFnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
            file_data_id: r.read_guid()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)?;
        out.extend_from_slice(&self.file_data_id.to_bytes_le());
        Ok(())
    }
}

/// References the encryption-key blob for encrypted object data (tag 0x07C).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDataEncryptionKeyV2Fnd {
    /// Location of the opaque key material.
    pub reference: ChunkReference,
}

impl ObjectDataEncryptionKeyV2Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)
    }
}

/// Carries dependency-override data for objects, either behind the
/// reference or inline when the reference is nil (tag 0x084).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfoDependencyOverridesFnd {
    /// Location of the override data; nil when the data rides inline.
    pub reference: ChunkReference,
    /// Inline override bytes, present exactly when `reference` is nil.
    pub inline_data: Option<Vec<u8>>,
}

impl ObjectInfoDependencyOverridesFnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        let reference = ChunkReference::decode(r, header.format)?;
        let inline_data = if reference.is_nil() {
            let len = r.read_u32()? as usize;
            Some(r.read_bytes(len)?.to_vec())
        } else {
            None
        };
        Ok(Self {
            reference,
            inline_data,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)?;
        match (&self.inline_data, self.reference.is_nil()) {
            (Some(data), true) => {
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                out.extend_from_slice(data);
                Ok(())
            }
            (None, false) => Ok(()),
            _ => Err(FndError::InvalidFormat {
                offset: 0,
                reason: "inline override data must be present exactly when the reference is nil"
                    .into(),
            }),
        }
    }
}

/// Describes a content-hashed chunk shared between revisions (tag 0x0C2).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HashedChunkDescriptor2Fnd {
    /// Location of the hashed chunk.
    pub reference: ChunkReference,
    /// Digest of the referenced bytes.
    pub content_hash: [u8; 16],
}

impl HashedChunkDescriptor2Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
            content_hash: r.read_array()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)?;
        out.extend_from_slice(&self.content_hash);
        Ok(())
    }
}

/// The fixed header+payload+footer structure a
/// [`FileDataStoreObjectReferenceFnd`] points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDataStoreObject {
    /// The stored payload bytes.
    pub data: Vec<u8>,
}

/// Leading sentinel GUID of a stored file-data blob.
const FILE_DATA_HEADER_GUID: [u8; 16] = [
    0xE7, 0x16, 0xE3, 0xBD, 0x65, 0x26, 0x11, 0x45, 0xA4, 0xC4, 0x8D, 0x4D, 0x0B, 0x7A, 0x9E,
    0xAC,
];

/// Trailing sentinel GUID of a stored file-data blob.
const FILE_DATA_FOOTER_GUID: [u8; 16] = [
    0x22, 0xA7, 0xFB, 0x71, 0x79, 0x0F, 0x0B, 0x4A, 0xBB, 0x13, 0x89, 0x92, 0x56, 0x42, 0x6B,
    0x24,
];

impl FileDataStoreObject {
    /// Fixed bytes around the payload: header GUID, length, reserved
    /// bytes, footer GUID.
    const OVERHEAD: u64 = 16 + 8 + 12 + 16;

    /// Decode the structure behind `reference`, validating both sentinel
    /// GUIDs and the declared length.
    pub fn decode(buffer: &[u8], reference: &ChunkReference) -> FndResult<Self> {
        reference.resolve(buffer)?;
        let mut r = Reader::new_at(buffer, reference.stp as usize)?;
        let header_at = r.pos() as u64;
        if r.read_array::<16>()? != FILE_DATA_HEADER_GUID {
            return Err(FndError::InvalidFormat {
                offset: header_at,
                reason: "bad file-data header GUID".into(),
            });
        }
        let length_at = r.pos() as u64;
        let cb_length = r.read_u64()?;
        r.read_bytes(12)?; // unused + reserved
        let padded = cb_length
            .checked_add(7)
            .map(|n| n & !7)
            .ok_or(FndError::InvalidFormat {
                offset: length_at,
                reason: "file-data length overflow".into(),
            })?;
        if padded.checked_add(Self::OVERHEAD).map_or(true, |total| total > reference.cb) {
            return Err(FndError::OutOfBounds {
                offset: length_at,
                reason: format!(
                    "file-data length {cb_length} exceeds referenced region of {} bytes",
                    reference.cb
                ),
            });
        }
        let data = r.read_bytes(cb_length as usize)?.to_vec();
        r.read_bytes((padded - cb_length) as usize)?;
        let footer_at = r.pos() as u64;
        if r.read_array::<16>()? != FILE_DATA_FOOTER_GUID {
            return Err(FndError::InvalidFormat {
                offset: footer_at,
                reason: "bad file-data footer GUID".into(),
            });
        }
        Ok(Self { data })
    }

    /// Encode the structure, padding the payload to 8-byte alignment.
    pub fn encode(&self) -> Vec<u8> {
        let padded = (self.data.len() + 7) & !7;
        let mut out = Vec::with_capacity(Self::OVERHEAD as usize + padded);
        out.extend_from_slice(&FILE_DATA_HEADER_GUID);
        out.extend_from_slice(&(self.data.len() as u64).to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(&self.data);
        out.resize(out.len() + padded - self.data.len(), 0);
        out.extend_from_slice(&FILE_DATA_FOOTER_GUID);
        out
    }
}

impl std::fmt::Display for FileDataStoreObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview = &self.data[..self.data.len().min(8)];
        write!(f, "FileDataStoreObject({} bytes, {}…)", self.data.len(), hex::encode(preview))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkFormat;

    #[test]
    fn wide_string_roundtrip() {
        let mut buf = Vec::new();
        write_wide_string(&mut buf, "<ifndf>{G}.png");
        let mut r = Reader::new_at(&buf, 0).unwrap();
        assert_eq!(read_wide_string(&mut r).unwrap(), "<ifndf>{G}.png");
        assert_eq!(r.pos(), buf.len());
    }

    #[test]
    fn file_data_declaration_roundtrip() {
        let node = ObjectDeclarationFileData3RefCountFnd {
            oid: CompactId::new(1, 12).unwrap(),
            jcid: JcId::file_data(0x30),
            cref: 1,
            file_data_reference: "<file>picture".into(),
            extension: ".png".into(),
        };
        let mut buf = Vec::new();
        node.encode_body(&mut buf).unwrap();
        let mut r = Reader::new_at(&buf, 0).unwrap();
        assert_eq!(
            ObjectDeclarationFileData3RefCountFnd::decode(&mut r).unwrap(),
            node
        );
    }

    #[test]
    fn dependency_overrides_inline_only_when_nil() {
        let with_ref = ObjectInfoDependencyOverridesFnd {
            reference: ChunkReference::new(8, 8, ChunkFormat::STANDARD).unwrap(),
            inline_data: Some(vec![1, 2, 3]),
        };
        assert!(with_ref.encode_body(&mut Vec::new()).is_err());

        let inline = ObjectInfoDependencyOverridesFnd {
            reference: ChunkReference::nil(ChunkFormat::STANDARD),
            inline_data: Some(vec![1, 2, 3]),
        };
        let mut buf = Vec::new();
        inline.encode_body(&mut buf).unwrap();
        buf.resize(64, 0);
        let header = FileNodeHeader {
            node_type: 0x084,
            size: 4,
            format: ChunkFormat::STANDARD,
            base_type: crate::header::BaseType::DataReference,
        };
        let mut r = Reader::new_at(&buf, 0).unwrap();
        let back = ObjectInfoDependencyOverridesFnd::decode(&mut r, &header).unwrap();
        assert_eq!(back, inline);
    }

    #[test]
    fn file_data_store_object_roundtrip() {
        let obj = FileDataStoreObject {
            data: b"hello, revision store".to_vec(),
        };
        let bytes = obj.encode();
        let reference =
            ChunkReference::new(0, bytes.len() as u64, ChunkFormat::LARGE).unwrap();
        assert_eq!(FileDataStoreObject::decode(&bytes, &reference).unwrap(), obj);
    }

    #[test]
    fn file_data_store_object_rejects_bad_header() {
        let obj = FileDataStoreObject { data: vec![0; 8] };
        let mut bytes = obj.encode();
        bytes[0] ^= 0xFF;
        let reference =
            ChunkReference::new(0, bytes.len() as u64, ChunkFormat::LARGE).unwrap();
        assert!(matches!(
            FileDataStoreObject::decode(&bytes, &reference),
            Err(FndError::InvalidFormat { offset: 0, .. })
        ));
    }

    #[test]
    fn file_data_length_cannot_escape_region() {
        let obj = FileDataStoreObject { data: vec![7; 16] };
        let mut bytes = obj.encode();
        // Inflate the declared length beyond the referenced region.
        bytes[16..24].copy_from_slice(&u64::MAX.to_le_bytes());
        let reference =
            ChunkReference::new(0, bytes.len() as u64, ChunkFormat::LARGE).unwrap();
        assert!(matches!(
            FileDataStoreObject::decode(&bytes, &reference),
            Err(FndError::InvalidFormat { .. }) | Err(FndError::OutOfBounds { .. })
        ));
    }
}
