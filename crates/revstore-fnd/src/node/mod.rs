//! The ~30 typed file-node structures and their decode/encode dispatch.
//!
//! Every node kind follows the same contract: `decode` consumes exactly the
//! node's declared inline size, chunk-referenced data elsewhere in the
//! buffer is left unread, and `decode(encode(x)) == x` for every kind.

pub mod filedata;
pub mod group;
pub mod manifest;
pub mod object;
pub mod table;

use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkFormat, ChunkReference};
use crate::error::{FndError, FndResult};
use crate::header::{BaseType, FileNodeHeader, HEADER_LEN, MAX_NODE_SIZE};
use crate::reader::Reader;

pub use filedata::{
    FileDataStoreListReferenceFnd, FileDataStoreObjectReferenceFnd, HashedChunkDescriptor2Fnd,
    ObjectDataEncryptionKeyV2Fnd, ObjectDeclarationFileData3LargeRefCountFnd,
    ObjectDeclarationFileData3RefCountFnd, ObjectInfoDependencyOverridesFnd,
};
pub use group::{
    DataSignatureGroupDefinitionFnd, ObjectGroupListReferenceFnd, ObjectGroupStartFnd,
    RootObjectReference2Fnd, RootObjectReference3Fnd,
};
pub use manifest::{
    ObjectSpaceManifestListReferenceFnd, ObjectSpaceManifestListStartFnd,
    ObjectSpaceManifestRootFnd, RevisionManifestListReferenceFnd, RevisionManifestListStartFnd,
    RevisionManifestStart4Fnd, RevisionManifestStart6Fnd, RevisionManifestStart7Fnd,
    RevisionRoleAndContextDeclarationFnd, RevisionRoleDeclarationFnd,
};
pub use object::{
    JcId, ObjectDeclaration2Body, ObjectDeclaration2LargeRefCountFnd,
    ObjectDeclaration2RefCountFnd, ObjectDeclarationBody, ObjectDeclarationWithRefCount2Fnd,
    ObjectDeclarationWithRefCountFnd, ObjectRevisionWithRefCount2Fnd,
    ObjectRevisionWithRefCountFnd, ReadOnlyObjectDeclaration2LargeRefCountFnd,
    ReadOnlyObjectDeclaration2RefCountFnd,
};
pub use table::{
    GlobalIdTableEntry2Fnd, GlobalIdTableEntry3Fnd, GlobalIdTableEntryFnd, GlobalIdTableStartFnd,
};

/// Type tag of every node kind this codec understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum FileNodeType {
    ObjectSpaceManifestRoot = 0x004,
    ObjectSpaceManifestListReference = 0x008,
    ObjectSpaceManifestListStart = 0x00C,
    RevisionManifestListReference = 0x010,
    RevisionManifestListStart = 0x014,
    RevisionManifestStart4 = 0x01B,
    RevisionManifestEnd = 0x01C,
    RevisionManifestStart6 = 0x01E,
    RevisionManifestStart7 = 0x01F,
    GlobalIdTableStart = 0x021,
    GlobalIdTableStart2 = 0x022,
    GlobalIdTableEntry = 0x024,
    GlobalIdTableEntry2 = 0x025,
    GlobalIdTableEntry3 = 0x026,
    GlobalIdTableEnd = 0x028,
    ObjectDeclarationWithRefCount = 0x02D,
    ObjectDeclarationWithRefCount2 = 0x02E,
    ObjectRevisionWithRefCount = 0x041,
    ObjectRevisionWithRefCount2 = 0x042,
    RootObjectReference2 = 0x059,
    RootObjectReference3 = 0x05A,
    RevisionRoleDeclaration = 0x05C,
    RevisionRoleAndContextDeclaration = 0x05D,
    ObjectDeclarationFileData3RefCount = 0x072,
    ObjectDeclarationFileData3LargeRefCount = 0x073,
    ObjectDataEncryptionKeyV2 = 0x07C,
    ObjectInfoDependencyOverrides = 0x084,
    DataSignatureGroupDefinition = 0x08C,
    FileDataStoreListReference = 0x090,
    FileDataStoreObjectReference = 0x094,
    ObjectDeclaration2RefCount = 0x0A4,
    ObjectDeclaration2LargeRefCount = 0x0A5,
    ObjectGroupListReference = 0x0B0,
    ObjectGroupStart = 0x0B4,
    ObjectGroupEnd = 0x0B8,
    HashedChunkDescriptor2 = 0x0C2,
    ReadOnlyObjectDeclaration2RefCount = 0x0C4,
    ReadOnlyObjectDeclaration2LargeRefCount = 0x0C5,
    ChunkTerminator = 0x0FF,
}

impl FileNodeType {
    /// Map a wire tag to a known node type.
    pub fn from_tag(tag: u16) -> Option<Self> {
        use FileNodeType::*;
        Some(match tag {
            0x004 => ObjectSpaceManifestRoot,
            0x008 => ObjectSpaceManifestListReference,
            0x00C => ObjectSpaceManifestListStart,
            0x010 => RevisionManifestListReference,
            0x014 => RevisionManifestListStart,
            0x01B => RevisionManifestStart4,
            0x01C => RevisionManifestEnd,
            0x01E => RevisionManifestStart6,
            0x01F => RevisionManifestStart7,
            0x021 => GlobalIdTableStart,
            0x022 => GlobalIdTableStart2,
            0x024 => GlobalIdTableEntry,
            0x025 => GlobalIdTableEntry2,
            0x026 => GlobalIdTableEntry3,
            0x028 => GlobalIdTableEnd,
            0x02D => ObjectDeclarationWithRefCount,
            0x02E => ObjectDeclarationWithRefCount2,
            0x041 => ObjectRevisionWithRefCount,
            0x042 => ObjectRevisionWithRefCount2,
            0x059 => RootObjectReference2,
            0x05A => RootObjectReference3,
            0x05C => RevisionRoleDeclaration,
            0x05D => RevisionRoleAndContextDeclaration,
            0x072 => ObjectDeclarationFileData3RefCount,
            0x073 => ObjectDeclarationFileData3LargeRefCount,
            0x07C => ObjectDataEncryptionKeyV2,
            0x084 => ObjectInfoDependencyOverrides,
            0x08C => DataSignatureGroupDefinition,
            0x090 => FileDataStoreListReference,
            0x094 => FileDataStoreObjectReference,
            0x0A4 => ObjectDeclaration2RefCount,
            0x0A5 => ObjectDeclaration2LargeRefCount,
            0x0B0 => ObjectGroupListReference,
            0x0B4 => ObjectGroupStart,
            0x0B8 => ObjectGroupEnd,
            0x0C2 => HashedChunkDescriptor2,
            0x0C4 => ReadOnlyObjectDeclaration2RefCount,
            0x0C5 => ReadOnlyObjectDeclaration2LargeRefCount,
            0x0FF => ChunkTerminator,
            _ => return None,
        })
    }

    /// The wire tag.
    pub fn tag(&self) -> u16 {
        *self as u16
    }

    /// The reference-ownership class a header of this kind must declare.
    /// Fixed per kind; the header bits are validated against it, never
    /// trusted.
    pub fn base_type(&self) -> BaseType {
        use FileNodeType::*;
        match self {
            ObjectSpaceManifestListReference
            | RevisionManifestListReference
            | FileDataStoreListReference
            | ObjectGroupListReference => BaseType::ListReference,
            ObjectDeclarationWithRefCount
            | ObjectDeclarationWithRefCount2
            | ObjectRevisionWithRefCount
            | ObjectRevisionWithRefCount2
            | ObjectDataEncryptionKeyV2
            | ObjectInfoDependencyOverrides
            | FileDataStoreObjectReference
            | ObjectDeclaration2RefCount
            | ObjectDeclaration2LargeRefCount
            | HashedChunkDescriptor2
            | ReadOnlyObjectDeclaration2RefCount
            | ReadOnlyObjectDeclaration2LargeRefCount => BaseType::DataReference,
            _ => BaseType::None,
        }
    }
}

/// One typed record in the node stream.
///
/// A flat tagged union: one variant per node kind, each owning its decoded
/// fields. Chunk-referenced data stays in the buffer and is fetched lazily
/// through the carried [`ChunkReference`]s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FileNode {
    ObjectSpaceManifestRoot(ObjectSpaceManifestRootFnd),
    ObjectSpaceManifestListReference(ObjectSpaceManifestListReferenceFnd),
    ObjectSpaceManifestListStart(ObjectSpaceManifestListStartFnd),
    RevisionManifestListReference(RevisionManifestListReferenceFnd),
    RevisionManifestListStart(RevisionManifestListStartFnd),
    RevisionManifestStart4(RevisionManifestStart4Fnd),
    RevisionManifestEnd,
    RevisionManifestStart6(RevisionManifestStart6Fnd),
    RevisionManifestStart7(RevisionManifestStart7Fnd),
    GlobalIdTableStart(GlobalIdTableStartFnd),
    GlobalIdTableStart2,
    GlobalIdTableEntry(GlobalIdTableEntryFnd),
    GlobalIdTableEntry2(GlobalIdTableEntry2Fnd),
    GlobalIdTableEntry3(GlobalIdTableEntry3Fnd),
    GlobalIdTableEnd,
    ObjectDeclarationWithRefCount(ObjectDeclarationWithRefCountFnd),
    ObjectDeclarationWithRefCount2(ObjectDeclarationWithRefCount2Fnd),
    ObjectRevisionWithRefCount(ObjectRevisionWithRefCountFnd),
    ObjectRevisionWithRefCount2(ObjectRevisionWithRefCount2Fnd),
    RootObjectReference2(RootObjectReference2Fnd),
    RootObjectReference3(RootObjectReference3Fnd),
    RevisionRoleDeclaration(RevisionRoleDeclarationFnd),
    RevisionRoleAndContextDeclaration(RevisionRoleAndContextDeclarationFnd),
    ObjectDeclarationFileData3RefCount(ObjectDeclarationFileData3RefCountFnd),
    ObjectDeclarationFileData3LargeRefCount(ObjectDeclarationFileData3LargeRefCountFnd),
    ObjectDataEncryptionKeyV2(ObjectDataEncryptionKeyV2Fnd),
    ObjectInfoDependencyOverrides(ObjectInfoDependencyOverridesFnd),
    DataSignatureGroupDefinition(DataSignatureGroupDefinitionFnd),
    FileDataStoreListReference(FileDataStoreListReferenceFnd),
    FileDataStoreObjectReference(FileDataStoreObjectReferenceFnd),
    ObjectDeclaration2RefCount(ObjectDeclaration2RefCountFnd),
    ObjectDeclaration2LargeRefCount(ObjectDeclaration2LargeRefCountFnd),
    ObjectGroupListReference(ObjectGroupListReferenceFnd),
    ObjectGroupStart(ObjectGroupStartFnd),
    ObjectGroupEnd,
    HashedChunkDescriptor2(HashedChunkDescriptor2Fnd),
    ReadOnlyObjectDeclaration2RefCount(ReadOnlyObjectDeclaration2RefCountFnd),
    ReadOnlyObjectDeclaration2LargeRefCount(ReadOnlyObjectDeclaration2LargeRefCountFnd),
    ChunkTerminator,
}

impl FileNode {
    /// The node's type tag.
    pub fn node_type(&self) -> FileNodeType {
        use FileNode::*;
        match self {
            ObjectSpaceManifestRoot(_) => FileNodeType::ObjectSpaceManifestRoot,
            ObjectSpaceManifestListReference(_) => FileNodeType::ObjectSpaceManifestListReference,
            ObjectSpaceManifestListStart(_) => FileNodeType::ObjectSpaceManifestListStart,
            RevisionManifestListReference(_) => FileNodeType::RevisionManifestListReference,
            RevisionManifestListStart(_) => FileNodeType::RevisionManifestListStart,
            RevisionManifestStart4(_) => FileNodeType::RevisionManifestStart4,
            RevisionManifestEnd => FileNodeType::RevisionManifestEnd,
            RevisionManifestStart6(_) => FileNodeType::RevisionManifestStart6,
            RevisionManifestStart7(_) => FileNodeType::RevisionManifestStart7,
            GlobalIdTableStart(_) => FileNodeType::GlobalIdTableStart,
            GlobalIdTableStart2 => FileNodeType::GlobalIdTableStart2,
            GlobalIdTableEntry(_) => FileNodeType::GlobalIdTableEntry,
            GlobalIdTableEntry2(_) => FileNodeType::GlobalIdTableEntry2,
            GlobalIdTableEntry3(_) => FileNodeType::GlobalIdTableEntry3,
            GlobalIdTableEnd => FileNodeType::GlobalIdTableEnd,
            ObjectDeclarationWithRefCount(_) => FileNodeType::ObjectDeclarationWithRefCount,
            ObjectDeclarationWithRefCount2(_) => FileNodeType::ObjectDeclarationWithRefCount2,
            ObjectRevisionWithRefCount(_) => FileNodeType::ObjectRevisionWithRefCount,
            ObjectRevisionWithRefCount2(_) => FileNodeType::ObjectRevisionWithRefCount2,
            RootObjectReference2(_) => FileNodeType::RootObjectReference2,
            RootObjectReference3(_) => FileNodeType::RootObjectReference3,
            RevisionRoleDeclaration(_) => FileNodeType::RevisionRoleDeclaration,
            RevisionRoleAndContextDeclaration(_) => {
                FileNodeType::RevisionRoleAndContextDeclaration
            }
            ObjectDeclarationFileData3RefCount(_) => {
                FileNodeType::ObjectDeclarationFileData3RefCount
            }
            ObjectDeclarationFileData3LargeRefCount(_) => {
                FileNodeType::ObjectDeclarationFileData3LargeRefCount
            }
            ObjectDataEncryptionKeyV2(_) => FileNodeType::ObjectDataEncryptionKeyV2,
            ObjectInfoDependencyOverrides(_) => FileNodeType::ObjectInfoDependencyOverrides,
            DataSignatureGroupDefinition(_) => FileNodeType::DataSignatureGroupDefinition,
            FileDataStoreListReference(_) => FileNodeType::FileDataStoreListReference,
            FileDataStoreObjectReference(_) => FileNodeType::FileDataStoreObjectReference,
            ObjectDeclaration2RefCount(_) => FileNodeType::ObjectDeclaration2RefCount,
            ObjectDeclaration2LargeRefCount(_) => FileNodeType::ObjectDeclaration2LargeRefCount,
            ObjectGroupListReference(_) => FileNodeType::ObjectGroupListReference,
            ObjectGroupStart(_) => FileNodeType::ObjectGroupStart,
            ObjectGroupEnd => FileNodeType::ObjectGroupEnd,
            HashedChunkDescriptor2(_) => FileNodeType::HashedChunkDescriptor2,
            ReadOnlyObjectDeclaration2RefCount(_) => {
                FileNodeType::ReadOnlyObjectDeclaration2RefCount
            }
            ReadOnlyObjectDeclaration2LargeRefCount(_) => {
                FileNodeType::ReadOnlyObjectDeclaration2LargeRefCount
            }
            ChunkTerminator => FileNodeType::ChunkTerminator,
        }
    }

    /// What this node's chunk reference, if any, points at.
    pub fn base_type(&self) -> BaseType {
        self.node_type().base_type()
    }

    /// The reference to a nested file-node list, for the four kinds that
    /// own one. The tree decoder recurses through these.
    pub fn list_reference(&self) -> Option<&ChunkReference> {
        use FileNode::*;
        match self {
            ObjectSpaceManifestListReference(n) => Some(&n.reference),
            RevisionManifestListReference(n) => Some(&n.reference),
            FileDataStoreListReference(n) => Some(&n.reference),
            ObjectGroupListReference(n) => Some(&n.reference),
            _ => None,
        }
    }

    /// The reference to opaque data (property set, blob, key material), for
    /// the kinds that own one.
    pub fn data_reference(&self) -> Option<&ChunkReference> {
        use FileNode::*;
        match self {
            ObjectDeclarationWithRefCount(n) => Some(&n.reference),
            ObjectDeclarationWithRefCount2(n) => Some(&n.reference),
            ObjectRevisionWithRefCount(n) => Some(&n.reference),
            ObjectRevisionWithRefCount2(n) => Some(&n.reference),
            ObjectDataEncryptionKeyV2(n) => Some(&n.reference),
            ObjectInfoDependencyOverrides(n) => Some(&n.reference),
            FileDataStoreObjectReference(n) => Some(&n.reference),
            ObjectDeclaration2RefCount(n) => Some(&n.reference),
            ObjectDeclaration2LargeRefCount(n) => Some(&n.reference),
            HashedChunkDescriptor2(n) => Some(&n.reference),
            ReadOnlyObjectDeclaration2RefCount(n) => Some(&n.reference),
            ReadOnlyObjectDeclaration2LargeRefCount(n) => Some(&n.reference),
            _ => None,
        }
    }

    /// The property-set reference of an object declaration or revision, if
    /// this node is one. Used by eager property-set resolution.
    pub fn propset_reference(&self) -> Option<&ChunkReference> {
        use FileNode::*;
        match self {
            ObjectDeclarationWithRefCount(_)
            | ObjectDeclarationWithRefCount2(_)
            | ObjectRevisionWithRefCount(_)
            | ObjectRevisionWithRefCount2(_)
            | ObjectDeclaration2RefCount(_)
            | ObjectDeclaration2LargeRefCount(_)
            | ReadOnlyObjectDeclaration2RefCount(_)
            | ReadOnlyObjectDeclaration2LargeRefCount(_) => self.data_reference(),
            _ => None,
        }
    }

    /// Wire format of the node's chunk references. Kinds without references
    /// encode the default format bits.
    fn format(&self) -> ChunkFormat {
        self.list_reference()
            .or_else(|| self.data_reference())
            .map(|r| r.format)
            .unwrap_or(ChunkFormat::STANDARD)
    }

    /// Decode a node body. `header` has already been decoded and its tag
    /// recognized; `node_offset` is the header's position, used for error
    /// context and the consumed-size cross-check.
    pub(crate) fn decode_body(
        r: &mut Reader<'_>,
        header: &FileNodeHeader,
        node_offset: u64,
        node_type: FileNodeType,
    ) -> FndResult<FileNode> {
        use FileNodeType as T;
        let expected_base = node_type.base_type();
        if expected_base != BaseType::None && !header.format.sanctioned() {
            return Err(FndError::InvalidFormat {
                offset: node_offset,
                reason: format!(
                    "unsanctioned reference width pair {:?}/{:?}",
                    header.format.stp, header.format.cb
                ),
            });
        }
        if header.base_type != expected_base {
            return Err(FndError::InvalidFormat {
                offset: node_offset,
                reason: format!(
                    "declared base type {:?} does not match {:?}",
                    header.base_type, node_type
                ),
            });
        }
        let body_start = r.pos();
        let node = match node_type {
            T::ObjectSpaceManifestRoot => {
                FileNode::ObjectSpaceManifestRoot(ObjectSpaceManifestRootFnd::decode(r)?)
            }
            T::ObjectSpaceManifestListReference => FileNode::ObjectSpaceManifestListReference(
                ObjectSpaceManifestListReferenceFnd::decode(r, header)?,
            ),
            T::ObjectSpaceManifestListStart => {
                FileNode::ObjectSpaceManifestListStart(ObjectSpaceManifestListStartFnd::decode(r)?)
            }
            T::RevisionManifestListReference => FileNode::RevisionManifestListReference(
                RevisionManifestListReferenceFnd::decode(r, header)?,
            ),
            T::RevisionManifestListStart => {
                FileNode::RevisionManifestListStart(RevisionManifestListStartFnd::decode(r)?)
            }
            T::RevisionManifestStart4 => {
                FileNode::RevisionManifestStart4(RevisionManifestStart4Fnd::decode(r)?)
            }
            T::RevisionManifestEnd => FileNode::RevisionManifestEnd,
            T::RevisionManifestStart6 => {
                FileNode::RevisionManifestStart6(RevisionManifestStart6Fnd::decode(r)?)
            }
            T::RevisionManifestStart7 => {
                FileNode::RevisionManifestStart7(RevisionManifestStart7Fnd::decode(r)?)
            }
            T::GlobalIdTableStart => {
                FileNode::GlobalIdTableStart(GlobalIdTableStartFnd::decode(r)?)
            }
            T::GlobalIdTableStart2 => FileNode::GlobalIdTableStart2,
            T::GlobalIdTableEntry => {
                FileNode::GlobalIdTableEntry(GlobalIdTableEntryFnd::decode(r)?)
            }
            T::GlobalIdTableEntry2 => {
                FileNode::GlobalIdTableEntry2(GlobalIdTableEntry2Fnd::decode(r)?)
            }
            T::GlobalIdTableEntry3 => {
                FileNode::GlobalIdTableEntry3(GlobalIdTableEntry3Fnd::decode(r)?)
            }
            T::GlobalIdTableEnd => FileNode::GlobalIdTableEnd,
            T::ObjectDeclarationWithRefCount => FileNode::ObjectDeclarationWithRefCount(
                ObjectDeclarationWithRefCountFnd::decode(r, header)?,
            ),
            T::ObjectDeclarationWithRefCount2 => FileNode::ObjectDeclarationWithRefCount2(
                ObjectDeclarationWithRefCount2Fnd::decode(r, header)?,
            ),
            T::ObjectRevisionWithRefCount => FileNode::ObjectRevisionWithRefCount(
                ObjectRevisionWithRefCountFnd::decode(r, header)?,
            ),
            T::ObjectRevisionWithRefCount2 => FileNode::ObjectRevisionWithRefCount2(
                ObjectRevisionWithRefCount2Fnd::decode(r, header)?,
            ),
            T::RootObjectReference2 => {
                FileNode::RootObjectReference2(RootObjectReference2Fnd::decode(r)?)
            }
            T::RootObjectReference3 => {
                FileNode::RootObjectReference3(RootObjectReference3Fnd::decode(r)?)
            }
            T::RevisionRoleDeclaration => {
                FileNode::RevisionRoleDeclaration(RevisionRoleDeclarationFnd::decode(r)?)
            }
            T::RevisionRoleAndContextDeclaration => FileNode::RevisionRoleAndContextDeclaration(
                RevisionRoleAndContextDeclarationFnd::decode(r)?,
            ),
            T::ObjectDeclarationFileData3RefCount => FileNode::ObjectDeclarationFileData3RefCount(
                ObjectDeclarationFileData3RefCountFnd::decode(r)?,
            ),
            T::ObjectDeclarationFileData3LargeRefCount => {
                FileNode::ObjectDeclarationFileData3LargeRefCount(
                    ObjectDeclarationFileData3LargeRefCountFnd::decode(r)?,
                )
            }
            T::ObjectDataEncryptionKeyV2 => FileNode::ObjectDataEncryptionKeyV2(
                ObjectDataEncryptionKeyV2Fnd::decode(r, header)?,
            ),
            T::ObjectInfoDependencyOverrides => FileNode::ObjectInfoDependencyOverrides(
                ObjectInfoDependencyOverridesFnd::decode(r, header)?,
            ),
            T::DataSignatureGroupDefinition => FileNode::DataSignatureGroupDefinition(
                DataSignatureGroupDefinitionFnd::decode(r)?,
            ),
            T::FileDataStoreListReference => FileNode::FileDataStoreListReference(
                FileDataStoreListReferenceFnd::decode(r, header)?,
            ),
            T::FileDataStoreObjectReference => FileNode::FileDataStoreObjectReference(
                FileDataStoreObjectReferenceFnd::decode(r, header)?,
            ),
            T::ObjectDeclaration2RefCount => FileNode::ObjectDeclaration2RefCount(
                ObjectDeclaration2RefCountFnd::decode(r, header)?,
            ),
            T::ObjectDeclaration2LargeRefCount => FileNode::ObjectDeclaration2LargeRefCount(
                ObjectDeclaration2LargeRefCountFnd::decode(r, header)?,
            ),
            T::ObjectGroupListReference => {
                FileNode::ObjectGroupListReference(ObjectGroupListReferenceFnd::decode(r, header)?)
            }
            T::ObjectGroupStart => FileNode::ObjectGroupStart(ObjectGroupStartFnd::decode(r)?),
            T::ObjectGroupEnd => FileNode::ObjectGroupEnd,
            T::HashedChunkDescriptor2 => {
                FileNode::HashedChunkDescriptor2(HashedChunkDescriptor2Fnd::decode(r, header)?)
            }
            T::ReadOnlyObjectDeclaration2RefCount => FileNode::ReadOnlyObjectDeclaration2RefCount(
                ReadOnlyObjectDeclaration2RefCountFnd::decode(r, header)?,
            ),
            T::ReadOnlyObjectDeclaration2LargeRefCount => {
                FileNode::ReadOnlyObjectDeclaration2LargeRefCount(
                    ReadOnlyObjectDeclaration2LargeRefCountFnd::decode(r, header)?,
                )
            }
            T::ChunkTerminator => FileNode::ChunkTerminator,
        };
        let consumed = r.pos() - body_start;
        if consumed != header.body_len() {
            return Err(FndError::InvalidFormat {
                offset: node_offset,
                reason: format!(
                    "node body consumed {consumed} bytes, header declares {}",
                    header.body_len()
                ),
            });
        }
        Ok(node)
    }

    /// Encode the whole node, header included.
    pub fn encode(&self) -> FndResult<Vec<u8>> {
        use FileNode::*;
        let mut body = Vec::new();
        match self {
            ObjectSpaceManifestRoot(n) => n.encode_body(&mut body)?,
            ObjectSpaceManifestListReference(n) => n.encode_body(&mut body)?,
            ObjectSpaceManifestListStart(n) => n.encode_body(&mut body)?,
            RevisionManifestListReference(n) => n.encode_body(&mut body)?,
            RevisionManifestListStart(n) => n.encode_body(&mut body)?,
            RevisionManifestStart4(n) => n.encode_body(&mut body)?,
            RevisionManifestEnd => {}
            RevisionManifestStart6(n) => n.encode_body(&mut body)?,
            RevisionManifestStart7(n) => n.encode_body(&mut body)?,
            GlobalIdTableStart(n) => n.encode_body(&mut body)?,
            GlobalIdTableStart2 => {}
            GlobalIdTableEntry(n) => n.encode_body(&mut body)?,
            GlobalIdTableEntry2(n) => n.encode_body(&mut body)?,
            GlobalIdTableEntry3(n) => n.encode_body(&mut body)?,
            GlobalIdTableEnd => {}
            ObjectDeclarationWithRefCount(n) => n.encode_body(&mut body)?,
            ObjectDeclarationWithRefCount2(n) => n.encode_body(&mut body)?,
            ObjectRevisionWithRefCount(n) => n.encode_body(&mut body)?,
            ObjectRevisionWithRefCount2(n) => n.encode_body(&mut body)?,
            RootObjectReference2(n) => n.encode_body(&mut body)?,
            RootObjectReference3(n) => n.encode_body(&mut body)?,
            RevisionRoleDeclaration(n) => n.encode_body(&mut body)?,
            RevisionRoleAndContextDeclaration(n) => n.encode_body(&mut body)?,
            ObjectDeclarationFileData3RefCount(n) => n.encode_body(&mut body)?,
            ObjectDeclarationFileData3LargeRefCount(n) => n.encode_body(&mut body)?,
            ObjectDataEncryptionKeyV2(n) => n.encode_body(&mut body)?,
            ObjectInfoDependencyOverrides(n) => n.encode_body(&mut body)?,
            DataSignatureGroupDefinition(n) => n.encode_body(&mut body)?,
            FileDataStoreListReference(n) => n.encode_body(&mut body)?,
            FileDataStoreObjectReference(n) => n.encode_body(&mut body)?,
            ObjectDeclaration2RefCount(n) => n.encode_body(&mut body)?,
            ObjectDeclaration2LargeRefCount(n) => n.encode_body(&mut body)?,
            ObjectGroupListReference(n) => n.encode_body(&mut body)?,
            ObjectGroupStart(n) => n.encode_body(&mut body)?,
            ObjectGroupEnd => {}
            HashedChunkDescriptor2(n) => n.encode_body(&mut body)?,
            ReadOnlyObjectDeclaration2RefCount(n) => n.encode_body(&mut body)?,
            ReadOnlyObjectDeclaration2LargeRefCount(n) => n.encode_body(&mut body)?,
            ChunkTerminator => {}
        }
        let size = HEADER_LEN + body.len();
        if size > MAX_NODE_SIZE {
            return Err(FndError::InvalidFormat {
                offset: 0,
                reason: format!("node size {size} exceeds the 13-bit size field"),
            });
        }
        let format = self.format();
        if self.base_type() != BaseType::None && !format.sanctioned() {
            return Err(FndError::InvalidFormat {
                offset: 0,
                reason: format!(
                    "unsanctioned reference width pair {:?}/{:?}",
                    format.stp, format.cb
                ),
            });
        }
        let header = FileNodeHeader {
            node_type: self.node_type().tag(),
            size: size as u16,
            format,
            base_type: self.base_type(),
        };
        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&header.encode().to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }
}
