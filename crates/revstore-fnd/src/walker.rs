//! Lazy iteration over a (possibly fragmented) file-node list.
//!
//! A logical node list is physically split across disjoint byte ranges.
//! Each fragment carries a sentinel header, a run of nodes, and a trailer
//! whose continuation reference points at the next fragment (nil in the
//! last one). The walker stitches fragments back together; structure
//! decoders never see fragment boundaries.

use std::collections::HashSet;

use crate::chunk::{ChunkFormat, ChunkReference};
use crate::error::{FndError, FndResult};
use crate::header::{FileNodeHeader, HEADER_LEN};
use crate::node::{FileNode, FileNodeType};
use crate::reader::Reader;

/// Sentinel opening every fragment.
pub const FRAGMENT_HEADER_MAGIC: u64 = 0xA456_7AB1_F5F7_F4C4;

/// Sentinel closing every fragment, directly after the continuation
/// reference.
pub const FRAGMENT_FOOTER_MAGIC: u64 = 0x8BC2_15C3_8233_BA4B;

/// Magic (8) + list id (4) + fragment sequence (4).
pub(crate) const FRAGMENT_HEADER_LEN: u64 = 16;

/// Continuation reference (8 + 4) + footer magic (8).
pub(crate) const FRAGMENT_TRAILER_LEN: u64 = 20;

/// Smallest well-formed fragment: header and trailer with an empty node
/// run.
pub const MIN_FRAGMENT_LEN: u64 = FRAGMENT_HEADER_LEN + FRAGMENT_TRAILER_LEN;

/// What the walker does with a type tag it does not recognize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Fail the walk with `UnknownNodeType` at the header's offset.
    #[default]
    Strict,
    /// Skip the node by its declared size. Reserved for list kinds that
    /// explicitly tolerate forward-compatible extensions.
    SkipUnknown,
}

/// Walk configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkOptions {
    pub skip_unknown: SkipPolicy,
}

/// One yielded node together with the offset of its header.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkedNode {
    pub node: FileNode,
    pub offset: u64,
}

/// Iterator over the logical node sequence of one list.
///
/// Deterministic and restartable: two walkers built from the same buffer
/// and start reference yield identical sequences. Dropping the walker
/// cancels the walk; no side effects have escaped.
pub struct FileNodeListWalker<'a> {
    buf: &'a [u8],
    options: WalkOptions,
    cursor: u64,
    nodes_end: u64,
    trailer_at: u64,
    list_id: Option<u32>,
    next_sequence: u32,
    visited: HashSet<u64>,
    done: bool,
}

impl<'a> FileNodeListWalker<'a> {
    /// Start a walk at `start`, which must reference a whole fragment.
    pub fn new(buf: &'a [u8], start: &ChunkReference, options: WalkOptions) -> FndResult<Self> {
        let mut walker = Self {
            buf,
            options,
            cursor: 0,
            nodes_end: 0,
            trailer_at: 0,
            list_id: None,
            next_sequence: 0,
            visited: HashSet::new(),
            done: false,
        };
        walker.enter_fragment(start)?;
        Ok(walker)
    }

    /// The list identifier from the first fragment header.
    pub fn list_id(&self) -> Option<u32> {
        self.list_id
    }

    fn enter_fragment(&mut self, reference: &ChunkReference) -> FndResult<()> {
        reference.resolve(self.buf)?;
        if reference.cb < MIN_FRAGMENT_LEN {
            return Err(FndError::InvalidFormat {
                offset: reference.stp,
                reason: format!(
                    "fragment of {} bytes is smaller than the minimum {MIN_FRAGMENT_LEN}",
                    reference.cb
                ),
            });
        }
        if !self.visited.insert(reference.stp) {
            return Err(FndError::InvalidFormat {
                offset: reference.stp,
                reason: "fragment continuation cycle".into(),
            });
        }
        let mut r = Reader::new_at(self.buf, reference.stp as usize)?;
        if r.read_u64()? != FRAGMENT_HEADER_MAGIC {
            return Err(FndError::InvalidFormat {
                offset: reference.stp,
                reason: "bad fragment header magic".into(),
            });
        }
        let list_id = r.read_u32()?;
        let sequence = r.read_u32()?;
        match self.list_id {
            None => self.list_id = Some(list_id),
            Some(expected) if expected != list_id => {
                return Err(FndError::InvalidFormat {
                    offset: reference.stp + 8,
                    reason: format!("fragment belongs to list {list_id}, expected {expected}"),
                });
            }
            Some(_) => {}
        }
        if sequence != self.next_sequence {
            return Err(FndError::InvalidFormat {
                offset: reference.stp + 12,
                reason: format!(
                    "fragment sequence {sequence}, expected {}",
                    self.next_sequence
                ),
            });
        }
        self.next_sequence = sequence.wrapping_add(1);
        self.cursor = reference.stp + FRAGMENT_HEADER_LEN;
        self.trailer_at = reference.stp + reference.cb - FRAGMENT_TRAILER_LEN;
        self.nodes_end = self.trailer_at;
        Ok(())
    }

    /// Read the trailer of the current fragment and chain to the next one.
    /// Returns `false` when the continuation is nil.
    fn chase_continuation(&mut self) -> FndResult<bool> {
        let mut r = Reader::new_at(self.buf, self.trailer_at as usize)?;
        let next = ChunkReference::decode(&mut r, ChunkFormat::LARGE)?;
        let footer_at = r.pos() as u64;
        if r.read_u64()? != FRAGMENT_FOOTER_MAGIC {
            return Err(FndError::InvalidFormat {
                offset: footer_at,
                reason: "bad fragment footer magic".into(),
            });
        }
        if next.is_nil() {
            return Ok(false);
        }
        tracing::debug!(
            stp = next.stp,
            cb = next.cb,
            "following fragment continuation"
        );
        self.enter_fragment(&next)?;
        Ok(true)
    }

    fn advance(&mut self) -> FndResult<Option<WalkedNode>> {
        loop {
            while self.cursor + HEADER_LEN as u64 <= self.nodes_end {
                let node_offset = self.cursor;
                let mut r = Reader::new_at(self.buf, node_offset as usize)?;
                if r.peek_u32()? == 0 {
                    // Zero word: the node run has ended, the rest is padding.
                    break;
                }
                let header = FileNodeHeader::decode(&mut r)?;
                let node_end = node_offset + u64::from(header.size);
                if node_end > self.nodes_end {
                    return Err(FndError::OutOfBounds {
                        offset: node_offset,
                        reason: format!(
                            "node of {} bytes extends beyond the fragment's node run",
                            header.size
                        ),
                    });
                }
                let Some(node_type) = FileNodeType::from_tag(header.node_type) else {
                    match self.options.skip_unknown {
                        SkipPolicy::Strict => {
                            return Err(FndError::UnknownNodeType {
                                offset: node_offset,
                                node_type: header.node_type,
                            });
                        }
                        SkipPolicy::SkipUnknown => {
                            tracing::warn!(
                                node_type = header.node_type,
                                offset = node_offset,
                                "skipping unknown node by declared size"
                            );
                            self.cursor = node_end;
                            continue;
                        }
                    }
                };
                if node_type == FileNodeType::ChunkTerminator {
                    // End of this fragment's node run; continuation follows
                    // in the trailer.
                    break;
                }
                let node = FileNode::decode_body(&mut r, &header, node_offset, node_type)?;
                self.cursor = node_end;
                return Ok(Some(WalkedNode {
                    node,
                    offset: node_offset,
                }));
            }
            self.cursor = self.nodes_end;
            if !self.chase_continuation()? {
                return Ok(None);
            }
        }
    }
}

impl Iterator for FileNodeListWalker<'_> {
    type Item = FndResult<WalkedNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(walked)) => Some(Ok(walked)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Walk a list with default options.
pub fn walk<'a>(
    buf: &'a [u8],
    start: &ChunkReference,
) -> FndResult<FileNodeListWalker<'a>> {
    FileNodeListWalker::new(buf, start, WalkOptions::default())
}
