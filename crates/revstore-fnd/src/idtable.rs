//! The per-object-space global identification table.
//!
//! Compact identifiers name objects by a small table index instead of a
//! full GUID. The table is built incrementally by patch nodes replayed in
//! stream order, so a lookup is only meaningful against the state at that
//! point of the walk. One table instance is scoped to exactly one walk;
//! concurrent walks use independent instances.

use std::collections::BTreeMap;

use revstore_types::{CompactId, Guid};

use crate::error::{FndError, FndResult};
use crate::node::FileNode;

/// Index → GUID table, mutated only by [`GlobalIdTable::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalIdTable {
    entries: BTreeMap<u32, Guid>,
}

impl GlobalIdTable {
    /// An empty table, the state before any patch node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one node if it is a table patch, in stream order. Returns
    /// whether the node was a patch. `offset` is the node's position, used
    /// for error context.
    pub fn apply(&mut self, node: &FileNode, offset: u64) -> FndResult<bool> {
        match node {
            FileNode::GlobalIdTableStart(_) | FileNode::GlobalIdTableStart2 => {
                self.entries.clear();
            }
            FileNode::GlobalIdTableEntry(entry) => {
                if self.entries.contains_key(&entry.index) {
                    return Err(FndError::MalformedTable {
                        offset,
                        index: entry.index,
                    });
                }
                self.entries.insert(entry.index, entry.guid);
            }
            FileNode::GlobalIdTableEntry2(entry) => {
                let guid = *self.entries.get(&entry.index_from).ok_or(
                    FndError::DanglingIndex {
                        offset,
                        index: entry.index_from,
                    },
                )?;
                self.entries.insert(entry.index_to, guid);
            }
            FileNode::GlobalIdTableEntry3(entry) => {
                // Reject a wrapping destination range before touching the
                // table so a failed patch leaves it unchanged.
                if entry.entries_to_copy > 0
                    && entry
                        .index_copy_to_start
                        .checked_add(entry.entries_to_copy - 1)
                        .is_none()
                {
                    return Err(FndError::RangeOutOfBounds {
                        offset,
                        from: entry.index_copy_from_start,
                        count: entry.entries_to_copy,
                    });
                }
                // Snapshot the sources first so overlapping ranges copy the
                // pre-patch state.
                let mut copied = Vec::with_capacity(entry.entries_to_copy as usize);
                for i in 0..entry.entries_to_copy {
                    let from = entry.index_copy_from_start.checked_add(i).ok_or(
                        FndError::RangeOutOfBounds {
                            offset,
                            from: entry.index_copy_from_start,
                            count: entry.entries_to_copy,
                        },
                    )?;
                    let guid =
                        *self
                            .entries
                            .get(&from)
                            .ok_or(FndError::RangeOutOfBounds {
                                offset,
                                from: entry.index_copy_from_start,
                                count: entry.entries_to_copy,
                            })?;
                    copied.push(guid);
                }
                for (i, guid) in copied.into_iter().enumerate() {
                    self.entries
                        .insert(entry.index_copy_to_start + i as u32, guid);
                }
            }
            FileNode::GlobalIdTableEnd => {}
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Resolve a table index to its GUID. `at` is the byte offset of the
    /// node that referenced the index, carried into the error on failure.
    pub fn resolve(&self, index: u32, at: u64) -> FndResult<Guid> {
        self.entries
            .get(&index)
            .copied()
            .ok_or(FndError::UnknownIndex { offset: at, index })
    }

    /// Resolve a compact identifier's index component.
    pub fn resolve_compact(&self, id: &CompactId, at: u64) -> FndResult<Guid> {
        self.resolve(u32::from(id.index()), at)
    }

    /// Slot count of the current table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` before any entry patch has been applied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the current slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Guid)> {
        self.entries.iter().map(|(index, guid)| (*index, guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        GlobalIdTableEntry2Fnd, GlobalIdTableEntry3Fnd, GlobalIdTableEntryFnd,
        GlobalIdTableStartFnd,
    };

    fn start() -> FileNode {
        FileNode::GlobalIdTableStart(GlobalIdTableStartFnd { reserved: 0 })
    }

    fn entry(index: u32, guid: Guid) -> FileNode {
        FileNode::GlobalIdTableEntry(GlobalIdTableEntryFnd { index, guid })
    }

    fn copy(from: u32, to: u32) -> FileNode {
        FileNode::GlobalIdTableEntry2(GlobalIdTableEntry2Fnd {
            index_from: from,
            index_to: to,
        })
    }

    fn copy_range(from: u32, count: u32, to: u32) -> FileNode {
        FileNode::GlobalIdTableEntry3(GlobalIdTableEntry3Fnd {
            index_copy_from_start: from,
            entries_to_copy: count,
            index_copy_to_start: to,
        })
    }

    fn replay(table: &mut GlobalIdTable, nodes: &[FileNode]) -> FndResult<()> {
        for (i, node) in nodes.iter().enumerate() {
            assert!(table.apply(node, i as u64)?);
        }
        Ok(())
    }

    #[test]
    fn patch_sequence_builds_expected_state() {
        let (g1, g2) = (Guid::ephemeral(), Guid::ephemeral());
        let mut table = GlobalIdTable::new();
        replay(
            &mut table,
            &[start(), entry(0, g1), entry(1, g2), copy(0, 2)],
        )
        .unwrap();
        assert_eq!(table.resolve(0, 0).unwrap(), g1);
        assert_eq!(table.resolve(1, 0).unwrap(), g2);
        assert_eq!(table.resolve(2, 0).unwrap(), g1);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn replay_is_deterministic() {
        let guids: Vec<Guid> = (0..4).map(|_| Guid::ephemeral()).collect();
        let nodes: Vec<FileNode> = std::iter::once(start())
            .chain(guids.iter().enumerate().map(|(i, g)| entry(i as u32, *g)))
            .chain([copy_range(0, 4, 8)])
            .collect();
        let mut first = GlobalIdTable::new();
        let mut second = GlobalIdTable::new();
        replay(&mut first, &nodes).unwrap();
        replay(&mut second, &nodes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn copy_range_of_zero_is_a_noop() {
        let mut table = GlobalIdTable::new();
        replay(&mut table, &[start(), copy_range(5, 0, 9)]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_entry_is_malformed() {
        let mut table = GlobalIdTable::new();
        let err = replay(
            &mut table,
            &[start(), entry(0, Guid::ephemeral()), entry(0, Guid::ephemeral())],
        )
        .unwrap_err();
        assert_eq!(err, FndError::MalformedTable { offset: 2, index: 0 });
    }

    #[test]
    fn table_start_permits_redefining_an_index() {
        let (g1, g2) = (Guid::ephemeral(), Guid::ephemeral());
        let mut table = GlobalIdTable::new();
        replay(&mut table, &[start(), entry(0, g1), start(), entry(0, g2)]).unwrap();
        assert_eq!(table.resolve(0, 0).unwrap(), g2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn copy_from_absent_slot_dangles() {
        let mut table = GlobalIdTable::new();
        let err = replay(&mut table, &[start(), copy(3, 0)]).unwrap_err();
        assert_eq!(err, FndError::DanglingIndex { offset: 1, index: 3 });
    }

    #[test]
    fn range_copy_with_hole_fails() {
        let mut table = GlobalIdTable::new();
        let err = replay(
            &mut table,
            &[start(), entry(0, Guid::ephemeral()), copy_range(0, 2, 4)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FndError::RangeOutOfBounds {
                offset: 2,
                from: 0,
                count: 2
            }
        );
    }

    #[test]
    fn range_copy_destination_cannot_wrap() {
        let (g1, g2) = (Guid::ephemeral(), Guid::ephemeral());
        let mut table = GlobalIdTable::new();
        let err = replay(
            &mut table,
            &[
                start(),
                entry(0, g1),
                entry(1, g2),
                copy_range(0, 2, u32::MAX),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FndError::RangeOutOfBounds {
                offset: 3,
                from: 0,
                count: 2
            }
        );
        // The failed patch left the table as it was.
        assert_eq!(table.resolve(0, 0), Ok(g1));
        assert_eq!(table.resolve(1, 0), Ok(g2));
    }

    #[test]
    fn overlapping_range_copies_pre_patch_state() {
        let (g1, g2) = (Guid::ephemeral(), Guid::ephemeral());
        let mut table = GlobalIdTable::new();
        replay(
            &mut table,
            &[start(), entry(0, g1), entry(1, g2), copy_range(0, 2, 1)],
        )
        .unwrap();
        assert_eq!(table.resolve(1, 0).unwrap(), g1);
        assert_eq!(table.resolve(2, 0).unwrap(), g2);
    }

    #[test]
    fn unresolved_index_reports_referencing_offset() {
        let table = GlobalIdTable::new();
        assert_eq!(
            table.resolve(9, 0x40).unwrap_err(),
            FndError::UnknownIndex {
                offset: 0x40,
                index: 9
            }
        );
    }
}
