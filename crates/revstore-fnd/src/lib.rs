//! File-node codec for the revision store container format.
//!
//! Decodes and encodes the node layer of a chunk-referenced revision
//! store: fragmented node lists stitched by continuation references,
//! typed node structures with bit-packed headers, and the replayed
//! global identification table that maps compact indices to GUIDs.
//!
//! # Architecture
//!
//! - **ChunkReference**: offset+length pair in one of the sanctioned
//!   width formats, with the all-zero nil sentinel
//! - **FileNodeListWalker**: lazy iterator over a fragment chain
//! - **NodeTree**: arena decoder for nested list ownership
//! - **GlobalIdTable**: in-order replay of table patch nodes
//! - **FileNodeListWriter**: encode inverse building fragment chains
//!
//! Everything operates on an immutable byte buffer; a walk is pure and
//! restartable, and hostile inputs fail with an offset-carrying
//! [`FndError`] rather than panicking or reading out of bounds.

pub(crate) mod bitfield;
pub mod chunk;
pub mod error;
pub mod header;
pub mod idtable;
pub mod node;
pub mod propset;
pub(crate) mod reader;
pub mod tree;
pub mod walker;
pub mod writer;

pub use chunk::{CbFormat, ChunkFormat, ChunkReference, StpFormat};
pub use error::{FndError, FndResult};
pub use header::{BaseType, FileNodeHeader, MAX_NODE_SIZE};
pub use idtable::GlobalIdTable;
pub use node::{FileNode, FileNodeType};
pub use propset::{ObjectSpaceObjectPropSet, PropertySetResolver, RawPropsetResolver};
pub use tree::{
    DecodeOptions, ListEntry, ListId, NodeTree, PropsetResolution, ResolvedPropset,
    MAX_LIST_DEPTH,
};
pub use walker::{
    walk, FileNodeListWalker, SkipPolicy, WalkOptions, WalkedNode, FRAGMENT_FOOTER_MAGIC,
    FRAGMENT_HEADER_MAGIC, MIN_FRAGMENT_LEN,
};
pub use writer::FileNodeListWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        GlobalIdTableEntry3Fnd, GlobalIdTableEntryFnd, GlobalIdTableStartFnd,
        ObjectDeclarationBody, ObjectDeclarationWithRefCountFnd,
    };
    use revstore_types::{CompactId, Guid};

    #[test]
    fn table_patch_list_replays_through_the_walker() {
        let g1 = Guid::ephemeral();
        let g2 = Guid::ephemeral();
        let mut writer = FileNodeListWriter::new(1);
        writer.push(FileNode::GlobalIdTableStart(GlobalIdTableStartFnd {
            reserved: 0,
        }));
        writer.push(FileNode::GlobalIdTableEntry(GlobalIdTableEntryFnd {
            index: 0,
            guid: g1,
        }));
        writer.push(FileNode::GlobalIdTableEntry(GlobalIdTableEntryFnd {
            index: 1,
            guid: g2,
        }));
        writer.push(FileNode::GlobalIdTableEntry3(GlobalIdTableEntry3Fnd {
            index_copy_from_start: 0,
            entries_to_copy: 1,
            index_copy_to_start: 2,
        }));
        writer.push(FileNode::GlobalIdTableEnd);
        let (buf, start) = writer.finish().unwrap();

        let mut table = GlobalIdTable::default();
        for walked in walk(&buf, &start).unwrap() {
            let walked = walked.unwrap();
            table.apply(&walked.node, walked.offset).unwrap();
        }
        assert_eq!(table.resolve(0, 0).unwrap(), g1);
        assert_eq!(table.resolve(1, 0).unwrap(), g2);
        assert_eq!(table.resolve(2, 0).unwrap(), g1);
        assert!(table.resolve(3, 0).is_err());
    }

    #[test]
    fn declared_blob_reference_past_the_buffer_fails_at_its_offset() {
        // The node itself is well-formed; the chunk reference it carries
        // points past the end of the buffer.
        let bogus = ChunkReference::new(0x5000, 8, ChunkFormat::STANDARD).unwrap();
        let mut writer = FileNodeListWriter::new(1);
        writer.push(FileNode::ObjectDeclarationWithRefCount(
            ObjectDeclarationWithRefCountFnd {
                reference: bogus,
                body: ObjectDeclarationBody {
                    oid: CompactId::new(1, 1).unwrap(),
                    jci: 1,
                    odcs: 0,
                },
                cref: 1,
            },
        ));
        let (buf, start) = writer.finish().unwrap();
        let err = walk(&buf, &start)
            .unwrap()
            .collect::<FndResult<Vec<_>>>()
            .unwrap_err();
        assert!(matches!(err, FndError::OutOfBounds { offset: 0x5000, .. }));
    }

    #[test]
    fn every_node_kind_survives_a_writer_walk_cycle() {
        use crate::node::*;
        use revstore_types::ExGuid;

        let g = Guid::ephemeral();
        let nil = ChunkReference::nil(ChunkFormat::STANDARD);
        let oid = CompactId::new(3, 17).unwrap();
        let decl_body = ObjectDeclarationBody { oid, jci: 2, odcs: 0 };
        let decl2_body = ObjectDeclaration2Body {
            oid,
            jcid: JcId::property_set(0x2C),
            has_oid_references: true,
            has_osid_references: false,
        };

        // One instance of each kind a list can carry. The terminator is
        // structural; the writer emits it itself.
        let nodes: Vec<FileNode> = vec![
            FileNode::ObjectSpaceManifestRoot(ObjectSpaceManifestRootFnd {
                gosid_root: ExGuid::guid(1, g),
            }),
            FileNode::ObjectSpaceManifestListReference(ObjectSpaceManifestListReferenceFnd {
                reference: nil,
                gosid: ExGuid::guid(1, g),
            }),
            FileNode::ObjectSpaceManifestListStart(ObjectSpaceManifestListStartFnd {
                gosid: ExGuid::guid(1, g),
            }),
            FileNode::RevisionManifestListReference(RevisionManifestListReferenceFnd {
                reference: nil,
            }),
            FileNode::RevisionManifestListStart(RevisionManifestListStartFnd {
                gosid: ExGuid::guid(1, g),
                instance_count: 4,
            }),
            FileNode::RevisionManifestStart4(RevisionManifestStart4Fnd {
                rid: ExGuid::counter(1, 2),
                rid_dependent: ExGuid::counter(1, 1),
                time_creation: 7,
                revision_role: 1,
                odcs_default: 0,
            }),
            FileNode::RevisionManifestEnd,
            FileNode::RevisionManifestStart6(RevisionManifestStart6Fnd {
                rid: ExGuid::counter(1, 3),
                rid_dependent: ExGuid::counter(0, 0),
                revision_role: 1,
                odcs_default: 0,
            }),
            FileNode::RevisionManifestStart7(RevisionManifestStart7Fnd {
                rid: ExGuid::counter(1, 4),
                rid_dependent: ExGuid::counter(1, 3),
                revision_role: 2,
                odcs_default: 0,
                gctxid: ExGuid::guid(2, g),
            }),
            FileNode::GlobalIdTableStart(GlobalIdTableStartFnd { reserved: 0 }),
            FileNode::GlobalIdTableStart2,
            FileNode::GlobalIdTableEntry(GlobalIdTableEntryFnd { index: 0, guid: g }),
            FileNode::GlobalIdTableEntry2(GlobalIdTableEntry2Fnd {
                index_from: 0,
                index_to: 1,
            }),
            FileNode::GlobalIdTableEntry3(GlobalIdTableEntry3Fnd {
                index_copy_from_start: 0,
                entries_to_copy: 2,
                index_copy_to_start: 4,
            }),
            FileNode::GlobalIdTableEnd,
            FileNode::ObjectDeclarationWithRefCount(ObjectDeclarationWithRefCountFnd {
                reference: nil,
                body: decl_body.clone(),
                cref: 1,
            }),
            FileNode::ObjectDeclarationWithRefCount2(ObjectDeclarationWithRefCount2Fnd {
                reference: nil,
                body: decl_body,
                cref: 0x1_0000,
            }),
            FileNode::ObjectRevisionWithRefCount(ObjectRevisionWithRefCountFnd {
                reference: nil,
                oid,
                has_oid_references: true,
                has_osid_references: false,
                cref: 63,
            }),
            FileNode::ObjectRevisionWithRefCount2(ObjectRevisionWithRefCount2Fnd {
                reference: nil,
                oid,
                has_oid_references: false,
                has_osid_references: true,
                cref: 9000,
            }),
            FileNode::RootObjectReference2(RootObjectReference2Fnd {
                oid_root: oid,
                root_role: 1,
            }),
            FileNode::RootObjectReference3(RootObjectReference3Fnd {
                oid_root: ExGuid::counter(1, 5),
                root_role: 1,
            }),
            FileNode::RevisionRoleDeclaration(RevisionRoleDeclarationFnd {
                rid: ExGuid::counter(1, 2),
                revision_role: 1,
            }),
            FileNode::RevisionRoleAndContextDeclaration(RevisionRoleAndContextDeclarationFnd {
                rid: ExGuid::counter(1, 2),
                revision_role: 1,
                gctxid: ExGuid::guid(2, g),
            }),
            FileNode::ObjectDeclarationFileData3RefCount(ObjectDeclarationFileData3RefCountFnd {
                oid,
                jcid: JcId::file_data(0x30),
                cref: 1,
                file_data_reference: format!("<ifndf>{}", g),
                extension: ".png".into(),
            }),
            FileNode::ObjectDeclarationFileData3LargeRefCount(
                ObjectDeclarationFileData3LargeRefCountFnd {
                    oid,
                    jcid: JcId::file_data(0x30),
                    cref: 70_000,
                    file_data_reference: "<invfdo>0".into(),
                    extension: String::new(),
                },
            ),
            FileNode::ObjectDataEncryptionKeyV2(ObjectDataEncryptionKeyV2Fnd {
                reference: nil,
            }),
            FileNode::ObjectInfoDependencyOverrides(ObjectInfoDependencyOverridesFnd {
                reference: nil,
                inline_data: Some(vec![1, 2, 3]),
            }),
            FileNode::DataSignatureGroupDefinition(DataSignatureGroupDefinitionFnd {
                signature: ExGuid::guid(0, g),
            }),
            FileNode::FileDataStoreListReference(FileDataStoreListReferenceFnd {
                reference: nil,
            }),
            FileNode::FileDataStoreObjectReference(FileDataStoreObjectReferenceFnd {
                reference: nil,
                file_data_id: g,
            }),
            FileNode::ObjectDeclaration2RefCount(ObjectDeclaration2RefCountFnd {
                reference: nil,
                body: decl2_body.clone(),
                cref: 2,
            }),
            FileNode::ObjectDeclaration2LargeRefCount(ObjectDeclaration2LargeRefCountFnd {
                reference: nil,
                body: decl2_body.clone(),
                cref: 300,
            }),
            FileNode::ObjectGroupListReference(ObjectGroupListReferenceFnd {
                reference: nil,
                object_group_id: ExGuid::guid(1, g),
            }),
            FileNode::ObjectGroupStart(ObjectGroupStartFnd {
                oid: ExGuid::counter(1, 6),
            }),
            FileNode::ObjectGroupEnd,
            FileNode::HashedChunkDescriptor2(HashedChunkDescriptor2Fnd {
                reference: nil,
                content_hash: [0xAB; 16],
            }),
            FileNode::ReadOnlyObjectDeclaration2RefCount(ReadOnlyObjectDeclaration2RefCountFnd {
                reference: nil,
                body: decl2_body.clone(),
                cref: 1,
                data_hash: [0xCD; 16],
            }),
            FileNode::ReadOnlyObjectDeclaration2LargeRefCount(
                ReadOnlyObjectDeclaration2LargeRefCountFnd {
                    reference: nil,
                    body: decl2_body,
                    cref: 5,
                    data_hash: [0xEF; 16],
                },
            ),
        ];
        assert_eq!(nodes.len(), 38);

        let mut writer = FileNodeListWriter::new(0x77);
        for node in &nodes {
            writer.push(node.clone());
        }
        let (buf, start) = writer.finish_fragmented(3).unwrap();
        let back: Vec<FileNode> = walk(&buf, &start)
            .unwrap()
            .map(|walked| walked.map(|w| w.node))
            .collect::<FndResult<_>>()
            .unwrap();
        assert_eq!(back, nodes);
    }
}
