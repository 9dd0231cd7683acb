//! Manifest nodes: object-space and revision lineage declarations.
//!
//! These kinds carry identifiers and scalars only; the list-reference kinds
//! additionally own the chunk reference the tree decoder recurses through.

use serde::{Deserialize, Serialize};

use revstore_types::{ExGuid, ExGuidForm};

use crate::chunk::ChunkReference;
use crate::error::FndResult;
use crate::header::FileNodeHeader;
use crate::reader::{write_exguid, Reader};

/// Declares the identity of the root object space (tag 0x004).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpaceManifestRootFnd {
    /// Identity of the root object space (GUID form).
    pub gosid_root: ExGuid,
}

impl ObjectSpaceManifestRootFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            gosid_root: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        debug_assert_eq!(self.gosid_root.form(), ExGuidForm::Guid);
        write_exguid(out, &self.gosid_root);
        Ok(())
    }
}

/// References the manifest list of one object space (tag 0x008).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpaceManifestListReferenceFnd {
    /// Location of the object space's manifest list fragment.
    pub reference: ChunkReference,
    /// Identity of the referenced object space (GUID form).
    pub gosid: ExGuid,
}

impl ObjectSpaceManifestListReferenceFnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
            gosid: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)?;
        write_exguid(out, &self.gosid);
        Ok(())
    }
}

/// First node of an object space's manifest list (tag 0x00C).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpaceManifestListStartFnd {
    /// Identity of the object space this list belongs to (GUID form).
    pub gosid: ExGuid,
}

impl ObjectSpaceManifestListStartFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            gosid: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.gosid);
        Ok(())
    }
}

/// References a revision-manifest list (tag 0x010).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionManifestListReferenceFnd {
    /// Location of the revision-manifest list fragment.
    pub reference: ChunkReference,
}

impl RevisionManifestListReferenceFnd {
    pub(crate) fn decode(r: &mut Reader<'_>, header: &FileNodeHeader) -> FndResult<Self> {
        Ok(Self {
            reference: ChunkReference::decode(r, header.format)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        self.reference.encode(out)
    }
}

/// First node of a revision-manifest list (tag 0x014).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionManifestListStartFnd {
    /// Identity of the owning object space (GUID form).
    pub gosid: ExGuid,
    /// Count of revision-manifest instances the writer recorded. Readers
    /// must not rely on it.
    pub instance_count: u32,
}

impl RevisionManifestListStartFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            gosid: r.read_exguid(ExGuidForm::Guid)?,
            instance_count: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.gosid);
        out.extend_from_slice(&self.instance_count.to_le_bytes());
        Ok(())
    }
}

/// Opens a revision manifest with a creation timestamp (tag 0x01B).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionManifestStart4Fnd {
    /// Identity of this revision (counter form).
    pub rid: ExGuid,
    /// Revision this one depends on; nil space/counter if none.
    pub rid_dependent: ExGuid,
    /// Creation time recorded by the writer. Readers must not rely on it.
    pub time_creation: u64,
    /// Role of the revision within its object space.
    pub revision_role: u32,
    /// Default object-data-compatibility scheme for the revision.
    pub odcs_default: u16,
}

impl RevisionManifestStart4Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            rid: r.read_exguid(ExGuidForm::Counter)?,
            rid_dependent: r.read_exguid(ExGuidForm::Counter)?,
            time_creation: r.read_u64()?,
            revision_role: r.read_u32()?,
            odcs_default: r.read_u16()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.rid);
        write_exguid(out, &self.rid_dependent);
        out.extend_from_slice(&self.time_creation.to_le_bytes());
        out.extend_from_slice(&self.revision_role.to_le_bytes());
        out.extend_from_slice(&self.odcs_default.to_le_bytes());
        Ok(())
    }
}

/// Opens a revision manifest (tag 0x01E).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionManifestStart6Fnd {
    /// Identity of this revision (counter form).
    pub rid: ExGuid,
    /// Revision this one depends on.
    pub rid_dependent: ExGuid,
    /// Role of the revision within its object space.
    pub revision_role: u32,
    /// Default object-data-compatibility scheme for the revision.
    pub odcs_default: u16,
}

impl RevisionManifestStart6Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            rid: r.read_exguid(ExGuidForm::Counter)?,
            rid_dependent: r.read_exguid(ExGuidForm::Counter)?,
            revision_role: r.read_u32()?,
            odcs_default: r.read_u16()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.rid);
        write_exguid(out, &self.rid_dependent);
        out.extend_from_slice(&self.revision_role.to_le_bytes());
        out.extend_from_slice(&self.odcs_default.to_le_bytes());
        Ok(())
    }
}

/// Opens a revision manifest tied to a context (tag 0x01F).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionManifestStart7Fnd {
    /// Identity of this revision (counter form).
    pub rid: ExGuid,
    /// Revision this one depends on.
    pub rid_dependent: ExGuid,
    /// Role of the revision within its object space.
    pub revision_role: u32,
    /// Default object-data-compatibility scheme for the revision.
    pub odcs_default: u16,
    /// Identity of the context the revision belongs to (GUID form).
    pub gctxid: ExGuid,
}

impl RevisionManifestStart7Fnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            rid: r.read_exguid(ExGuidForm::Counter)?,
            rid_dependent: r.read_exguid(ExGuidForm::Counter)?,
            revision_role: r.read_u32()?,
            odcs_default: r.read_u16()?,
            gctxid: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.rid);
        write_exguid(out, &self.rid_dependent);
        out.extend_from_slice(&self.revision_role.to_le_bytes());
        out.extend_from_slice(&self.odcs_default.to_le_bytes());
        write_exguid(out, &self.gctxid);
        Ok(())
    }
}

/// Assigns a role to a revision (tag 0x05C).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionRoleDeclarationFnd {
    /// Revision being assigned (counter form).
    pub rid: ExGuid,
    /// Role value.
    pub revision_role: u32,
}

impl RevisionRoleDeclarationFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            rid: r.read_exguid(ExGuidForm::Counter)?,
            revision_role: r.read_u32()?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.rid);
        out.extend_from_slice(&self.revision_role.to_le_bytes());
        Ok(())
    }
}

/// Assigns a role to a revision within a context (tag 0x05D).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionRoleAndContextDeclarationFnd {
    /// Revision being assigned (counter form).
    pub rid: ExGuid,
    /// Role value.
    pub revision_role: u32,
    /// Context the assignment applies to (GUID form).
    pub gctxid: ExGuid,
}

impl RevisionRoleAndContextDeclarationFnd {
    pub(crate) fn decode(r: &mut Reader<'_>) -> FndResult<Self> {
        Ok(Self {
            rid: r.read_exguid(ExGuidForm::Counter)?,
            revision_role: r.read_u32()?,
            gctxid: r.read_exguid(ExGuidForm::Guid)?,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) -> FndResult<()> {
        write_exguid(out, &self.rid);
        out.extend_from_slice(&self.revision_role.to_le_bytes());
        write_exguid(out, &self.gctxid);
        Ok(())
    }
}
