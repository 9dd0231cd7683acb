//! Property-set payloads referenced by object declaration nodes.
//!
//! Declarations carry a chunk reference to an out-of-line property-set
//! blob rather than the blob itself. Resolution is pluggable: callers
//! choose when the referenced bytes are materialized and how far they
//! are parsed.

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkReference;
use crate::error::FndResult;

/// The raw bytes of one property set, exactly as referenced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpaceObjectPropSet {
    pub data: Vec<u8>,
}

impl ObjectSpaceObjectPropSet {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Materializes the property set behind a declaration's reference.
///
/// Implementations may copy the bytes verbatim, decompress them, or
/// consult a cache. A resolver is only handed non-nil references that
/// have already passed the bounds check.
pub trait PropertySetResolver {
    fn resolve(
        &self,
        buffer: &[u8],
        reference: &ChunkReference,
    ) -> FndResult<ObjectSpaceObjectPropSet>;
}

/// Copies the referenced bytes without interpreting them.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawPropsetResolver;

impl PropertySetResolver for RawPropsetResolver {
    fn resolve(
        &self,
        buffer: &[u8],
        reference: &ChunkReference,
    ) -> FndResult<ObjectSpaceObjectPropSet> {
        let bytes = reference.resolve(buffer)?;
        Ok(ObjectSpaceObjectPropSet {
            data: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkFormat;
    use crate::error::FndError;

    #[test]
    fn raw_resolver_copies_the_referenced_range() {
        let buffer: Vec<u8> = (0u8..32).collect();
        let reference = ChunkReference::new(8, 4, ChunkFormat::STANDARD).unwrap();
        let propset = RawPropsetResolver.resolve(&buffer, &reference).unwrap();
        assert_eq!(propset.data, vec![8, 9, 10, 11]);
    }

    #[test]
    fn out_of_bounds_reference_fails_at_declared_offset() {
        let buffer = vec![0u8; 16];
        let reference = ChunkReference::new(12, 8, ChunkFormat::STANDARD).unwrap();
        let err = RawPropsetResolver.resolve(&buffer, &reference).unwrap_err();
        assert!(matches!(err, FndError::OutOfBounds { offset: 12, .. }));
    }
}
