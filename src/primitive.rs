//! Cursor-based primitive decoders over an in-memory byte slice.

use crate::error::GgufError;

/// GGUF string encoding depends on the container version: v2 prefixes a
/// byte-string with a u32 length, v3 with a u64 length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringWidth {
    U32Length,
    U64Length,
}

/// A simple cursor over a byte slice for sequential little-endian reads.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn truncated(&self, context: &str, need: usize) -> GgufError {
        GgufError::Truncated {
            context: context.to_string(),
            need_bytes: need,
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], GgufError> {
        if self.pos.checked_add(n).map_or(true, |end| end > self.data.len()) {
            return Err(self.truncated("byte slice", n));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, GgufError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, GgufError> {
        Ok(u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, GgufError> {
        Ok(u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, GgufError> {
        Ok(u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_i8(&mut self) -> Result<i8, GgufError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, GgufError> {
        Ok(i16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, GgufError> {
        Ok(i32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64, GgufError> {
        Ok(i64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, GgufError> {
        Ok(f32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64, GgufError> {
        Ok(f64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_bool(&mut self) -> Result<bool, GgufError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a length-prefixed UTF-8 byte string. The prefix width depends on
    /// the container version (v2: u32, v3: u64). The bytes are never
    /// NUL-terminated on disk.
    pub fn read_string(&mut self, width: StringWidth) -> Result<String, GgufError> {
        let len = match width {
            StringWidth::U32Length => self.read_u32()? as usize,
            StringWidth::U64Length => self.read_u64()? as usize,
        };
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| GgufError::Truncated {
            context: "string (invalid UTF-8)".to_string(),
            need_bytes: len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0403);
        assert_eq!(r.read_u32().unwrap(), 0x0807_0605);
    }

    #[test]
    fn reads_u32_and_u64_little_endian() {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert_eq!(r.read_u64().unwrap(), 2);
    }

    #[test]
    fn read_bytes_past_end_is_truncated() {
        let data = [0u8; 2];
        let mut r = Reader::new(&data);
        let err = r.read_bytes(4).unwrap_err();
        assert!(matches!(err, GgufError::Truncated { .. }));
    }

    #[test]
    fn v2_string_uses_u32_length_prefix() {
        let mut data = vec![3, 0, 0, 0];
        data.extend_from_slice(b"abc");
        let mut r = Reader::new(&data);
        assert_eq!(r.read_string(StringWidth::U32Length).unwrap(), "abc");
    }

    #[test]
    fn v3_string_uses_u64_length_prefix() {
        let mut data = vec![3, 0, 0, 0, 0, 0, 0, 0];
        data.extend_from_slice(b"xyz");
        let mut r = Reader::new(&data);
        assert_eq!(r.read_string(StringWidth::U64Length).unwrap(), "xyz");
    }

    #[test]
    fn bool_is_nonzero_byte() {
        let data = [0u8, 1u8, 42u8];
        let mut r = Reader::new(&data);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }
}
