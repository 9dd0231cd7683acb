//! Object-group framing, root references, and data-signature definitions.

use serde::{Deserialize, Serialize};

use revstore_types::{CompactId, ExGuid, ExGuidForm};

use crate::chunk::ChunkReference;
use crate::error::FndResult;
use crate::header::FileNodeHeader;
use crate::reader::{write_exguid, Reader};

/// References the nested fragment holding an object group (tag 0x0B0).
///
/// The walker never follows this itself; the tree decoder enters the nested
/// list through its arena, bounded by the nesting-depth limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectGroupListReferenceFnd {
    /// Location of the object group's node-list fragment.
    pub reference: ChunkReference,
    /// Identity of the object group (GUID form).
    pub object_group_id: ExGuid,
}

impl ObjectGroupListReferenceFnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
            object_group_id: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)?;
        write_exguid(out, &self.object_group_id);
        Ok(())
    }
}

/// Opens an object group (tag 0x0B4).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectGroupStartFnd {
    /// Identity of the group's first object (counter form).
    pub oid: ExGuid,
}

impl ObjectGroupStartFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            oid: r.read_exguid(ExGuidForm::Counter)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.oid);
        Ok(())
    }
}

/// Declares the data signature shared by the following group (tag 0x08C).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSignatureGroupDefinitionFnd {
    /// Signature identifier (GUID form).
    pub signature: ExGuid,
}

impl DataSignatureGroupDefinitionFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            signature: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.signature);
        Ok(())
    }
}

/// Declares an object space's root object by compact identifier (tag 0x059).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootObjectReference2Fnd {
    /// Root object, resolvable through the global id table.
    pub oid_root: CompactId,
    /// Role of the root within the object space.
    pub root_role: u32,
}

impl RootObjectReference2Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            oid_root: r.read_compact_id()?,
            root_role: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        out.extend_from_slice(&self.oid_root.to_u64().to_le_bytes());
        out.extend_from_slice(&self.root_role.to_le_bytes());
        Ok(())
    }
}

/// Declares an object space's root object by extended identifier (tag 0x05A).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootObjectReference3Fnd {
    /// Root object (counter form), independent of the global id table.
    pub oid_root: ExGuid,
    /// Role of the root within the object space.
    pub root_role: u32,
}

impl RootObjectReference3Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            oid_root: r.read_exguid(ExGuidForm::Counter)?,
            root_role: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.oid_root);
        out.extend_from_slice(&self.root_role.to_le_bytes());
        Ok(())
    }
}
