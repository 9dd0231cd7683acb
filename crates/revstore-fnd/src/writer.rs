//! Serialization of node lists into fragment chains.

use crate::chunk::{ChunkFormat, ChunkReference};
use crate::error::{FndError, FndResult};
use crate::node::FileNode;
use crate::walker::{
    FRAGMENT_FOOTER_MAGIC, FRAGMENT_HEADER_LEN, FRAGMENT_HEADER_MAGIC, FRAGMENT_TRAILER_LEN,
};

/// Accumulates nodes and emits them as one fragment or as a chain.
///
/// Fragments are laid out back to back in the returned buffer; each
/// trailer's continuation reference is backpatched once the following
/// fragment's extent is known. The last trailer carries the nil
/// reference.
pub struct FileNodeListWriter {
    list_id: u32,
    nodes: Vec<FileNode>,
}

impl FileNodeListWriter {
    pub fn new(list_id: u32) -> Self {
        Self {
            list_id,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: FileNode) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Emit every node into a single fragment.
    pub fn finish(self) -> FndResult<(Vec<u8>, ChunkReference)> {
        self.finish_fragmented(1)
    }

    /// Emit the nodes split across `fragments` fragments of roughly equal
    /// node counts. Trailing fragments may hold an empty node run when
    /// there are fewer nodes than fragments.
    pub fn finish_fragmented(self, fragments: usize) -> FndResult<(Vec<u8>, ChunkReference)> {
        let mut buf = Vec::new();
        let start = self.write_into(&mut buf, fragments)?;
        Ok((buf, start))
    }

    /// Append the fragment chain to `buf`, which may already hold other
    /// lists or blobs. Returns the reference to the chain's first
    /// fragment.
    pub fn write_into(self, buf: &mut Vec<u8>, fragments: usize) -> FndResult<ChunkReference> {
        if fragments == 0 {
            return Err(FndError::InvalidFormat {
                offset: 0,
                reason: "a fragment chain needs at least one fragment".into(),
            });
        }
        let encoded: Vec<Vec<u8>> = self
            .nodes
            .iter()
            .map(FileNode::encode)
            .collect::<FndResult<_>>()?;
        let per_fragment = encoded.len().div_ceil(fragments).max(1);
        let terminator = FileNode::ChunkTerminator.encode()?;

        let mut prev_trailer: Option<usize> = None;
        let mut first: Option<ChunkReference> = None;
        let mut runs = encoded.chunks(per_fragment);
        for sequence in 0..fragments as u32 {
            let stp = buf.len() as u64;
            buf.extend_from_slice(&FRAGMENT_HEADER_MAGIC.to_le_bytes());
            buf.extend_from_slice(&self.list_id.to_le_bytes());
            buf.extend_from_slice(&sequence.to_le_bytes());
            for node in runs.next().unwrap_or_default() {
                buf.extend_from_slice(node);
            }
            buf.extend_from_slice(&terminator);
            let trailer_at = buf.len();
            // Nil continuation, backpatched if another fragment follows.
            buf.extend_from_slice(&[0u8; 12]);
            buf.extend_from_slice(&FRAGMENT_FOOTER_MAGIC.to_le_bytes());
            let cb = buf.len() as u64 - stp;
            debug_assert!(cb >= FRAGMENT_HEADER_LEN + FRAGMENT_TRAILER_LEN);
            let reference = ChunkReference::new(stp, cb, ChunkFormat::LARGE)?;
            if let Some(at) = prev_trailer {
                buf[at..at + 8].copy_from_slice(&stp.to_le_bytes());
                buf[at + 8..at + 12].copy_from_slice(&(cb as u32).to_le_bytes());
            }
            prev_trailer = Some(trailer_at);
            first.get_or_insert(reference);
        }
        tracing::debug!(
            list_id = self.list_id,
            fragments,
            bytes = buf.len(),
            "wrote fragment chain"
        );
        // `fragments >= 1`, so the first reference exists.
        first.ok_or_else(|| FndError::InvalidFormat {
            offset: 0,
            reason: "empty fragment chain".into(),
        })
    }
}
