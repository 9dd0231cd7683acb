use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Mask for the 48-bit counter component.
const COUNTER_MASK: u64 = (1 << 48) - 1;

/// A compact, table-indexed object identifier.
///
/// A `CompactId` names an object as a pair of a 16-bit index into the
/// global identification table and a 48-bit counter, packed into a single
/// little-endian u64 on the wire (index in the low 16 bits).
///
/// Resolving the index to a stable [`Guid`](crate::Guid) depends on the
/// table state at the point in the node stream where the identifier was
/// read; the codec's global table performs that lookup.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompactId {
    index: u16,
    counter: u64,
}

impl CompactId {
    /// Construct from an index and a counter.
    ///
    /// Fails with [`TypeError::CounterOverflow`] if the counter does not fit
    /// in 48 bits.
    pub fn new(index: u16, counter: u64) -> Result<Self, TypeError> {
        if counter > COUNTER_MASK {
            return Err(TypeError::CounterOverflow(counter));
        }
        Ok(Self { index, counter })
    }

    /// The global-table index.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// The 48-bit counter.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Unpack from the wire u64 (index in bits 0..16, counter in bits 16..64).
    pub fn from_u64(raw: u64) -> Self {
        Self {
            index: (raw & 0xFFFF) as u16,
            counter: raw >> 16,
        }
    }

    /// Pack into the wire u64.
    pub fn to_u64(&self) -> u64 {
        u64::from(self.index) | (self.counter << 16)
    }
}

impl fmt::Debug for CompactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactId({}, {:#x})", self.index, self.counter)
    }
}

impl fmt::Display for CompactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.counter)
    }
}
