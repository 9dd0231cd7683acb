//! Packing and unpacking of sub-byte fields within a fixed-width word.
//!
//! Several node bodies cluster boolean flags and small integers inside an
//! 8-, 16-, or 32-bit container. Fields are packed LSB-first within the
//! little-endian container word. A width list that does not sum to the
//! container width is a programming error, not a wire error, and is
//! asserted.

/// Unpack `N` fields from `word`, LSB-first.
///
/// # Panics
///
/// Panics if the widths do not sum to `container_bits`.
pub fn unpack<const N: usize>(word: u64, container_bits: u32, widths: [u32; N]) -> [u64; N] {
    assert_eq!(
        widths.iter().sum::<u32>(),
        container_bits,
        "bit-field widths must cover the container exactly"
    );
    let mut out = [0u64; N];
    let mut shift = 0u32;
    for (slot, width) in out.iter_mut().zip(widths) {
        *slot = (word >> shift) & mask(width);
        shift += width;
    }
    out
}

/// Pack `N` fields into a word, LSB-first. Inverse of [`unpack`].
///
/// # Panics
///
/// Panics if the widths do not sum to `container_bits`, or if a value does
/// not fit its declared width.
pub fn pack<const N: usize>(fields: [u64; N], container_bits: u32, widths: [u32; N]) -> u64 {
    assert_eq!(
        widths.iter().sum::<u32>(),
        container_bits,
        "bit-field widths must cover the container exactly"
    );
    let mut word = 0u64;
    let mut shift = 0u32;
    for (value, width) in fields.iter().zip(widths) {
        assert!(
            *value <= mask(width),
            "bit-field value {value:#x} exceeds {width} bits"
        );
        word |= value << shift;
        shift += width;
    }
    word
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_lsb_first() {
        // 0b110_01_101 split as 3|2|3 from the LSB.
        let fields = unpack(0b110_01_101, 8, [3, 2, 3]);
        assert_eq!(fields, [0b101, 0b01, 0b110]);
    }

    #[test]
    fn pack_is_inverse_of_unpack() {
        let widths = [10, 13, 2, 2, 4, 1];
        let word = 0x8765_4321u64;
        assert_eq!(pack(unpack(word, 32, widths), 32, widths), word);
    }

    #[test]
    #[should_panic(expected = "cover the container exactly")]
    fn width_mismatch_panics() {
        unpack(0, 16, [8, 4]);
    }

    #[test]
    #[should_panic(expected = "exceeds 2 bits")]
    fn oversized_value_panics() {
        pack([5, 0], 8, [2, 6]);
    }
}
