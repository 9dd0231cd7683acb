use thiserror::Error;

/// Errors produced while decoding or encoding a file-node stream.
///
/// Every variant carries the byte offset at which the problem was detected,
/// relative to the start of the backing buffer. All of these are fatal to
/// the current walk: the buffer is an immutable snapshot, so nothing here
/// retries internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FndError {
    #[error("out of bounds at offset {offset:#x}: {reason}")]
    OutOfBounds { offset: u64, reason: String },

    #[error("invalid format at offset {offset:#x}: {reason}")]
    InvalidFormat { offset: u64, reason: String },

    #[error("unknown node type {node_type:#05x} at offset {offset:#x}")]
    UnknownNodeType { offset: u64, node_type: u16 },

    #[error("malformed global id table at offset {offset:#x}: duplicate index {index}")]
    MalformedTable { offset: u64, index: u32 },

    #[error("dangling global id table index {index} at offset {offset:#x}")]
    DanglingIndex { offset: u64, index: u32 },

    #[error("global id table copy range [{from}, {from}+{count}) out of bounds at offset {offset:#x}")]
    RangeOutOfBounds { offset: u64, from: u32, count: u32 },

    #[error("unresolved global id table index {index} referenced at offset {offset:#x}")]
    UnknownIndex { offset: u64, index: u32 },
}

pub type FndResult<T> = Result<T, FndError>;
