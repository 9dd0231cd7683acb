//! Chunk references: offset/length pairs into the backing buffer.
//!
//! A chunk reference is not a single pointer type. The byte width of its
//! stp (offset) and cb (length) components is selected per node by the
//! header's format bits, and the 2-byte forms store page-granularity counts
//! (value divided by 8). The all-zero reference is the nil sentinel and
//! must never be dereferenced.

use serde::{Deserialize, Serialize};

use crate::error::{FndError, FndResult};
use crate::reader::Reader;

/// Page granularity of the compressed reference forms.
const PAGE_UNIT: u64 = 8;

/// Wire encoding of the stp (offset) component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StpFormat {
    /// 8 bytes, byte-granular.
    Uncompressed8 = 0,
    /// 4 bytes, byte-granular.
    Uncompressed4 = 1,
    /// 2 bytes, page-granular (value × 8).
    Compressed2 = 2,
    /// 4 bytes, page-granular (value × 8).
    Compressed4 = 3,
}

impl StpFormat {
    /// Decode from the header's 2-bit field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => StpFormat::Uncompressed8,
            1 => StpFormat::Uncompressed4,
            2 => StpFormat::Compressed2,
            _ => StpFormat::Compressed4,
        }
    }

    /// The header's 2-bit field value.
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// Encoded width in bytes.
    pub fn width(&self) -> usize {
        match self {
            StpFormat::Uncompressed8 => 8,
            StpFormat::Uncompressed4 | StpFormat::Compressed4 => 4,
            StpFormat::Compressed2 => 2,
        }
    }

    fn is_compressed(&self) -> bool {
        matches!(self, StpFormat::Compressed2 | StpFormat::Compressed4)
    }
}

/// Wire encoding of the cb (length) component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CbFormat {
    /// 4 bytes, byte-granular.
    Uncompressed4 = 0,
    /// 8 bytes, byte-granular.
    Uncompressed8 = 1,
    /// 1 byte, page-granular (value × 8).
    Compressed1 = 2,
    /// 2 bytes, page-granular (value × 8).
    Compressed2 = 3,
}

impl CbFormat {
    /// Decode from the header's 2-bit field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => CbFormat::Uncompressed4,
            1 => CbFormat::Uncompressed8,
            2 => CbFormat::Compressed1,
            _ => CbFormat::Compressed2,
        }
    }

    /// The header's 2-bit field value.
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// Encoded width in bytes.
    pub fn width(&self) -> usize {
        match self {
            CbFormat::Uncompressed4 => 4,
            CbFormat::Uncompressed8 => 8,
            CbFormat::Compressed1 => 1,
            CbFormat::Compressed2 => 2,
        }
    }

    fn is_compressed(&self) -> bool {
        matches!(self, CbFormat::Compressed1 | CbFormat::Compressed2)
    }
}

/// The (stp, cb) width pair a reference is encoded with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkFormat {
    pub stp: StpFormat,
    pub cb: CbFormat,
}

impl ChunkFormat {
    /// 8-byte offset, 4-byte length. Used by fragment trailer references.
    pub const LARGE: Self = Self {
        stp: StpFormat::Uncompressed8,
        cb: CbFormat::Uncompressed4,
    };

    /// 4-byte offset, 4-byte length.
    pub const STANDARD: Self = Self {
        stp: StpFormat::Uncompressed4,
        cb: CbFormat::Uncompressed4,
    };

    /// 2-byte page-granular offset and length.
    pub const COMPACT: Self = Self {
        stp: StpFormat::Compressed2,
        cb: CbFormat::Compressed2,
    };

    /// Whether this pair is one of the three encodings sanctioned for
    /// node-owned references. Any other pair in a node header is rejected
    /// as `InvalidFormat`.
    pub fn sanctioned(&self) -> bool {
        *self == Self::LARGE || *self == Self::STANDARD || *self == Self::COMPACT
    }

    /// Total encoded width in bytes.
    pub fn encoded_len(&self) -> usize {
        self.stp.width() + self.cb.width()
    }
}

/// A bounds-checked (offset, length) reference into the backing buffer.
///
/// The format is retained so a decoded reference re-encodes to identical
/// bytes. `stp` and `cb` are always byte-granular here; page multiplication
/// happens at the wire boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkReference {
    pub stp: u64,
    pub cb: u64,
    pub format: ChunkFormat,
}

impl ChunkReference {
    /// The nil sentinel in the given format.
    pub fn nil(format: ChunkFormat) -> Self {
        Self {
            stp: 0,
            cb: 0,
            format,
        }
    }

    /// Construct a reference, validating that the values are representable
    /// in the chosen format (page alignment for compressed forms, width
    /// limits for the narrow forms).
    pub fn new(stp: u64, cb: u64, format: ChunkFormat) -> FndResult<Self> {
        let reference = Self { stp, cb, format };
        reference.raw_stp()?;
        reference.raw_cb()?;
        Ok(reference)
    }

    /// Returns `true` for the all-zero sentinel, which must never be
    /// dereferenced.
    pub fn is_nil(&self) -> bool {
        self.stp == 0 && self.cb == 0
    }

    /// One past the last byte this reference covers.
    pub fn end(&self) -> Option<u64> {
        self.stp.checked_add(self.cb)
    }

    /// Decode a reference at the reader's cursor, consuming exactly the
    /// format's width and bounds-checking the result against the backing
    /// buffer.
    pub(crate) fn decode(r: &mut Reader<'_>, format: ChunkFormat) -> FndResult<Self> {
        let raw_stp = match format.stp {
            StpFormat::Uncompressed8 => r.read_u64()?,
            StpFormat::Uncompressed4 | StpFormat::Compressed4 => u64::from(r.read_u32()?),
            StpFormat::Compressed2 => u64::from(r.read_u16()?),
        };
        let raw_cb = match format.cb {
            CbFormat::Uncompressed4 => u64::from(r.read_u32()?),
            CbFormat::Uncompressed8 => r.read_u64()?,
            CbFormat::Compressed1 => u64::from(r.read_u8()?),
            CbFormat::Compressed2 => u64::from(r.read_u16()?),
        };
        let stp = if format.stp.is_compressed() {
            raw_stp * PAGE_UNIT
        } else {
            raw_stp
        };
        let cb = if format.cb.is_compressed() {
            raw_cb * PAGE_UNIT
        } else {
            raw_cb
        };
        let reference = Self { stp, cb, format };
        if !reference.is_nil() {
            reference.check_bounds(r.buf_len() as u64)?;
        }
        Ok(reference)
    }

    /// Append the wire bytes of this reference.
    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> FndResult<()> {
        let raw_stp = self.raw_stp()?;
        let raw_cb = self.raw_cb()?;
        match self.format.stp {
            StpFormat::Uncompressed8 => out.extend_from_slice(&raw_stp.to_le_bytes()),
            StpFormat::Uncompressed4 | StpFormat::Compressed4 => {
                out.extend_from_slice(&(raw_stp as u32).to_le_bytes())
            }
            StpFormat::Compressed2 => out.extend_from_slice(&(raw_stp as u16).to_le_bytes()),
        }
        match self.format.cb {
            CbFormat::Uncompressed4 => out.extend_from_slice(&(raw_cb as u32).to_le_bytes()),
            CbFormat::Uncompressed8 => out.extend_from_slice(&raw_cb.to_le_bytes()),
            CbFormat::Compressed1 => out.push(raw_cb as u8),
            CbFormat::Compressed2 => out.extend_from_slice(&(raw_cb as u16).to_le_bytes()),
        }
        Ok(())
    }

    /// The byte region this reference covers.
    ///
    /// Fails `InvalidFormat` on the nil sentinel and `OutOfBounds` if the
    /// region exceeds the buffer; the carried offset is the declared stp.
    pub fn resolve<'a>(&self, buffer: &'a [u8]) -> FndResult<&'a [u8]> {
        if self.is_nil() {
            return Err(FndError::InvalidFormat {
                offset: 0,
                reason: "nil chunk reference dereferenced".into(),
            });
        }
        self.check_bounds(buffer.len() as u64)?;
        Ok(&buffer[self.stp as usize..(self.stp + self.cb) as usize])
    }

    fn check_bounds(&self, buf_len: u64) -> FndResult<()> {
        match self.end() {
            Some(end) if end <= buf_len => Ok(()),
            _ => Err(FndError::OutOfBounds {
                offset: self.stp,
                reason: format!(
                    "chunk reference stp {:#x} + cb {:#x} exceeds buffer of {buf_len} bytes",
                    self.stp, self.cb
                ),
            }),
        }
    }

    fn raw_stp(&self) -> FndResult<u64> {
        raw_component(self.stp, self.format.stp.is_compressed(), self.format.stp.width())
            .ok_or_else(|| FndError::InvalidFormat {
                offset: self.stp,
                reason: format!("stp {:#x} not representable in {:?}", self.stp, self.format.stp),
            })
    }

    fn raw_cb(&self) -> FndResult<u64> {
        raw_component(self.cb, self.format.cb.is_compressed(), self.format.cb.width())
            .ok_or_else(|| FndError::InvalidFormat {
                offset: self.stp,
                reason: format!("cb {:#x} not representable in {:?}", self.cb, self.format.cb),
            })
    }
}

/// The raw wire value for a byte-granular component, or `None` if the value
/// is not representable (unaligned for compressed forms, too wide for the
/// narrow forms).
fn raw_component(value: u64, compressed: bool, width: usize) -> Option<u64> {
    let raw = if compressed {
        if value % PAGE_UNIT != 0 {
            return None;
        }
        value / PAGE_UNIT
    } else {
        value
    };
    let max = match width {
        1 => u64::from(u8::MAX),
        2 => u64::from(u16::MAX),
        4 => u64::from(u32::MAX),
        _ => u64::MAX,
    };
    (raw <= max).then_some(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(bytes: &[u8], format: ChunkFormat) -> FndResult<ChunkReference> {
        let mut r = Reader::new_at(bytes, 0).unwrap();
        ChunkReference::decode(&mut r, format)
    }

    #[test]
    fn nil_is_all_zero_at_every_width() {
        for format in [ChunkFormat::LARGE, ChunkFormat::STANDARD, ChunkFormat::COMPACT] {
            let bytes = vec![0u8; format.encoded_len()];
            let reference = decode_one(&bytes, format).unwrap();
            assert!(reference.is_nil());
        }
    }

    #[test]
    fn nil_never_dereferences() {
        let nil = ChunkReference::nil(ChunkFormat::STANDARD);
        assert!(matches!(
            nil.resolve(&[0u8; 64]),
            Err(FndError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn compact_form_is_page_granular() {
        // stp raw 2 => 16, cb raw 3 => 24.
        let reference = decode_one(&[0x02, 0x00, 0x03, 0x00], ChunkFormat::COMPACT);
        // Bounds check runs against the 4-byte input; 16+24 > 4.
        assert!(matches!(reference, Err(FndError::OutOfBounds { offset: 16, .. })));
    }

    #[test]
    fn out_of_bounds_reports_declared_stp() {
        let mut bytes = Vec::new();
        ChunkReference::new(0x40, 0x100, ChunkFormat::LARGE)
            .unwrap()
            .encode(&mut bytes)
            .unwrap();
        let err = decode_one(&bytes, ChunkFormat::LARGE).unwrap_err();
        assert!(matches!(err, FndError::OutOfBounds { offset: 0x40, .. }));
    }

    #[test]
    fn encode_decode_roundtrip_all_sanctioned() {
        let backing = vec![0u8; 0x200];
        for format in [ChunkFormat::LARGE, ChunkFormat::STANDARD, ChunkFormat::COMPACT] {
            let original = ChunkReference::new(0x40, 0x18, format).unwrap();
            let mut bytes = Vec::new();
            original.encode(&mut bytes).unwrap();
            assert_eq!(bytes.len(), format.encoded_len());
            // Decode against a buffer large enough to pass the bounds check.
            let mut padded = bytes.clone();
            padded.resize(backing.len(), 0);
            let mut r = Reader::new_at(&padded, 0).unwrap();
            assert_eq!(ChunkReference::decode(&mut r, format).unwrap(), original);
        }
    }

    #[test]
    fn unaligned_value_rejected_by_compact_form() {
        assert!(ChunkReference::new(0x41, 0x18, ChunkFormat::COMPACT).is_err());
    }

    #[test]
    fn sanctioned_pairs() {
        assert!(ChunkFormat::LARGE.sanctioned());
        assert!(ChunkFormat::STANDARD.sanctioned());
        assert!(ChunkFormat::COMPACT.sanctioned());
        assert!(!ChunkFormat {
            stp: StpFormat::Compressed4,
            cb: CbFormat::Uncompressed4
        }
        .sanctioned());
    }

    proptest::proptest! {
        #[test]
        fn standard_reference_wire_identity(stp in 1u64..=u64::from(u32::MAX), cb in 1u64..=u64::from(u32::MAX)) {
            let original = ChunkReference::new(stp, cb, ChunkFormat::STANDARD).unwrap();
            let mut bytes = Vec::new();
            original.encode(&mut bytes).unwrap();
            // Skip the bounds check by decoding the nil-or-valid way only
            // when the target fits; otherwise expect the bounds error.
            let mut r = Reader::new_at(&bytes, 0).unwrap();
            match ChunkReference::decode(&mut r, ChunkFormat::STANDARD) {
                Ok(back) => proptest::prop_assert_eq!(back, original),
                Err(FndError::OutOfBounds { offset, .. }) => {
                    proptest::prop_assert_eq!(offset, stp)
                }
                Err(other) => return Err(proptest::test_runner::TestCaseError::fail(other.to_string())),
            }
        }

        #[test]
        fn compact_reference_wire_identity(stp in 0u64..=u64::from(u16::MAX), cb in 1u64..=u64::from(u16::MAX)) {
            let original =
                ChunkReference::new(stp * PAGE_UNIT, cb * PAGE_UNIT, ChunkFormat::COMPACT).unwrap();
            let mut bytes = Vec::new();
            original.encode(&mut bytes).unwrap();
            proptest::prop_assert_eq!(bytes.len(), ChunkFormat::COMPACT.encoded_len());
        }
    }
}
