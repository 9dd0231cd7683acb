//! Bounds-checked cursor over the backing buffer.
//!
//! All wire reads in this crate go through [`Reader`] so that every
//! truncation error carries the exact byte offset at which it was detected.

use revstore_types::{CompactId, ExGuid, ExGuidForm, ExGuidPayload, Guid};

use crate::error::{FndError, FndResult};

/// A read cursor over an immutable byte buffer.
///
/// The reader never copies the buffer and never reads past its end; a short
/// read fails with [`FndError::OutOfBounds`] at the cursor position.
#[derive(Clone, Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at `pos`.
    pub fn new_at(buf: &'a [u8], pos: usize) -> FndResult<Self> {
        if pos > buf.len() {
            return Err(FndError::OutOfBounds {
                offset: pos as u64,
                reason: format!("cursor beyond buffer of {} bytes", buf.len()),
            });
        }
        Ok(Self { buf, pos })
    }

    /// Current absolute position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Length of the whole backing buffer.
    pub fn buf_len(&self) -> usize {
        self.buf.len()
    }

    fn short_read(&self, need: usize) -> FndError {
        FndError::OutOfBounds {
            offset: self.pos as u64,
            reason: format!(
                "need {need} bytes, {} available",
                self.buf.len() - self.pos
            ),
        }
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> FndResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.short_read(n))?;
        if end > self.buf.len() {
            return Err(self.short_read(n));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> FndResult<[u8; N]> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> FndResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> FndResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> FndResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> FndResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Peek the next u32 without advancing.
    pub fn peek_u32(&self) -> FndResult<u32> {
        let mut copy = self.clone();
        copy.read_u32()
    }

    /// Read a 16-byte GUID in wire (little-endian field) order.
    pub fn read_guid(&mut self) -> FndResult<Guid> {
        Ok(Guid::from_bytes_le(self.read_array()?))
    }

    /// Read a packed compact identifier.
    pub fn read_compact_id(&mut self) -> FndResult<CompactId> {
        Ok(CompactId::from_u64(self.read_u64()?))
    }

    /// Read an extended identifier in the declared form.
    pub fn read_exguid(&mut self, form: ExGuidForm) -> FndResult<ExGuid> {
        let space = self.read_u32()?;
        let payload = match form {
            ExGuidForm::Counter => ExGuidPayload::Counter(self.read_u32()?),
            ExGuidForm::Guid => ExGuidPayload::Guid(self.read_guid()?),
        };
        Ok(ExGuid { space, payload })
    }
}

/// Append an extended identifier in its own form.
pub(crate) fn write_exguid(out: &mut Vec<u8>, id: &ExGuid) {
    out.extend_from_slice(&id.space.to_le_bytes());
    match id.payload {
        ExGuidPayload::Counter(n) => out.extend_from_slice(&n.to_le_bytes()),
        ExGuidPayload::Guid(g) => out.extend_from_slice(&g.to_bytes_le()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_in_order() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut r = Reader::new_at(&buf, 0).unwrap();
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0302);
        assert_eq!(r.pos(), 3);
    }

    #[test]
    fn short_read_reports_cursor_offset() {
        let buf = [0u8; 6];
        let mut r = Reader::new_at(&buf, 4).unwrap();
        let err = r.read_u32().unwrap_err();
        assert_eq!(
            err,
            FndError::OutOfBounds {
                offset: 4,
                reason: "need 4 bytes, 2 available".into()
            }
        );
    }

    #[test]
    fn cursor_beyond_buffer_is_rejected() {
        assert!(Reader::new_at(&[0u8; 3], 4).is_err());
    }

    #[test]
    fn exguid_roundtrip_both_forms() {
        for id in [
            ExGuid::counter(3, 99),
            ExGuid::guid(7, Guid::ephemeral()),
        ] {
            let mut buf = Vec::new();
            write_exguid(&mut buf, &id);
            assert_eq!(buf.len(), id.form().encoded_len());
            let mut r = Reader::new_at(&buf, 0).unwrap();
            assert_eq!(r.read_exguid(id.form()).unwrap(), id);
        }
    }

    #[test]
    fn peek_does_not_advance() {
        let buf = 0xDEADBEEFu32.to_le_bytes();
        let r = Reader::new_at(&buf, 0).unwrap();
        assert_eq!(r.peek_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.pos(), 0);
    }
}
