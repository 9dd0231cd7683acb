//! Arena decoding of nested node lists.
//!
//! List-reference nodes (base type 2) hand ownership of a whole child
//! list to one node of the parent. Rather than recursing through child
//! lists on the stack, the decoder keeps every list in a flat arena and
//! works through pending child references iteratively, so hostile
//! nesting depth cannot exhaust the call stack.

use std::collections::VecDeque;

use crate::chunk::ChunkReference;
use crate::error::{FndError, FndResult};
use crate::node::FileNode;
use crate::propset::{ObjectSpaceObjectPropSet, PropertySetResolver};
use crate::walker::{FileNodeListWalker, WalkOptions};

/// Maximum allowed depth of list nesting.
pub const MAX_LIST_DEPTH: usize = 32;

/// Index of a list in the arena. The root list is always `ListId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub u32);

/// One decoded list: its nodes, their header offsets, and the parent
/// node that referenced it (`None` for the root).
#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    pub parent: Option<(ListId, usize)>,
    pub nodes: Vec<FileNode>,
    pub offsets: Vec<u64>,
}

/// When property-set references of object declarations are materialized.
#[derive(Clone, Copy, Default)]
pub enum PropsetResolution<'r> {
    /// Leave the raw references in place; callers resolve on demand.
    #[default]
    Lazy,
    /// Resolve during the decode pass into [`NodeTree::propsets`].
    Eager(&'r dyn PropertySetResolver),
}

/// Tree decode configuration. One policy applies uniformly to every
/// declaration kind.
#[derive(Clone, Copy, Default)]
pub struct DecodeOptions<'r> {
    pub walk: WalkOptions,
    pub propsets: PropsetResolution<'r>,
}

/// A property set resolved eagerly for the node at `(list, node)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPropset {
    pub list: ListId,
    pub node: usize,
    pub propset: ObjectSpaceObjectPropSet,
}

/// All lists reachable from a starting reference, in encounter order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeTree {
    pub lists: Vec<ListEntry>,
    pub propsets: Vec<ResolvedPropset>,
}

impl NodeTree {
    /// Decode the list at `start` and every list it transitively
    /// references.
    pub fn decode(buf: &[u8], start: &ChunkReference, options: DecodeOptions<'_>) -> FndResult<Self> {
        let mut tree = Self::default();
        let mut pending: VecDeque<(ChunkReference, Option<(ListId, usize)>, usize)> =
            VecDeque::new();
        pending.push_back((*start, None, 0));
        while let Some((reference, parent, depth)) = pending.pop_front() {
            if depth >= MAX_LIST_DEPTH {
                return Err(FndError::InvalidFormat {
                    offset: reference.stp,
                    reason: format!("list nesting exceeds {MAX_LIST_DEPTH} levels"),
                });
            }
            let id = ListId(tree.lists.len() as u32);
            let mut entry = ListEntry {
                parent,
                nodes: Vec::new(),
                offsets: Vec::new(),
            };
            let walker = FileNodeListWalker::new(buf, &reference, options.walk)?;
            for walked in walker {
                let walked = walked?;
                let index = entry.nodes.len();
                if let Some(child) = walked.node.list_reference() {
                    if !child.is_nil() {
                        pending.push_back((*child, Some((id, index)), depth + 1));
                    }
                }
                if let PropsetResolution::Eager(resolver) = options.propsets {
                    if let Some(propset_ref) = walked.node.propset_reference() {
                        if !propset_ref.is_nil() {
                            propset_ref.resolve(buf)?;
                            let propset = resolver.resolve(buf, propset_ref)?;
                            tree.propsets.push(ResolvedPropset {
                                list: id,
                                node: index,
                                propset,
                            });
                        }
                    }
                }
                entry.nodes.push(walked.node);
                entry.offsets.push(walked.offset);
            }
            tree.lists.push(entry);
        }
        Ok(tree)
    }

    /// The list the decode started from.
    pub fn root(&self) -> &ListEntry {
        &self.lists[0]
    }

    pub fn list(&self, id: ListId) -> Option<&ListEntry> {
        self.lists.get(id.0 as usize)
    }
}
