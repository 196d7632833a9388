//! Bounds-checked big-endian reads over a byte buffer
//!
//! The feed has no length prefixes, so every read must be checked against
//! the end of the buffer. `ByteReader` owns the cursor; a failed read
//! reports the field being read and the offset, and never advances.

/// A read that would pass the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRead {
    /// Wire name of the field being read
    pub field: &'static str,
    /// Cursor position when the read was attempted
    pub offset: usize,
}

/// Cursor over an immutable byte buffer with fixed-width big-endian reads.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor position.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Unread bytes left in the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True when the cursor has reached the end of the buffer.
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, width: usize, field: &'static str) -> Result<&'a [u8], ShortRead> {
        if self.remaining() < width {
            return Err(ShortRead {
                field,
                offset: self.pos,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + width];
        self.pos += width;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, ShortRead> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, ShortRead> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, ShortRead> {
        let bytes = self.take(4, field)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16, ShortRead> {
        let bytes = self.take(2, field)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, ShortRead> {
        let bytes = self.take(4, field)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read the next two bytes as a big-endian u16 without advancing.
    pub fn peek_u16(&self, field: &'static str) -> Result<u16, ShortRead> {
        if self.remaining() < 2 {
            return Err(ShortRead {
                field,
                offset: self.pos,
            });
        }
        Ok(u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_big_endian() {
        let buf = [0x12, 0x34, 0x56, 0x78, 0xFF, 0xFE];
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_u32("a").unwrap(), 0x12345678);
        assert_eq!(r.read_i16("b").unwrap(), -2);
        assert!(r.is_empty());
    }

    #[test]
    fn test_signed_reads() {
        let buf = (-12345i16).to_be_bytes();
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_i16("d").unwrap(), -12345);

        let buf = (-7_654_321i32).to_be_bytes();
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_i32("d").unwrap(), -7_654_321);
    }

    #[test]
    fn test_cursor_advances_per_read() {
        let buf = [1u8, 0, 2, 0, 0, 0, 3];
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_u8("a").unwrap(), 1);
        assert_eq!(r.offset(), 1);
        assert_eq!(r.read_u16("b").unwrap(), 2);
        assert_eq!(r.offset(), 3);
        assert_eq!(r.read_u32("c").unwrap(), 3);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_short_read_reports_field_and_offset() {
        let buf = [0u8, 1, 2];
        let mut r = ByteReader::new(&buf);
        r.read_u16("head").unwrap();
        let err = r.read_u32("tail").unwrap_err();
        assert_eq!(err.field, "tail");
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let buf = [0u8, 9];
        let mut r = ByteReader::new(&buf);
        assert!(r.read_u32("wide").is_err());
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_u16("narrow").unwrap(), 9);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let buf = [0x80, 0x0A, 0x00];
        let r = ByteReader::new(&buf);
        assert_eq!(r.peek_u16("head").unwrap(), 0x800A);
        assert_eq!(r.offset(), 0);

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.peek_u16("head").unwrap(), r.read_u16("head").unwrap());
    }

    #[test]
    fn test_peek_short() {
        let buf = [0x80];
        let r = ByteReader::new(&buf);
        let err = r.peek_u16("head").unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_empty_buffer() {
        let r = ByteReader::new(&[]);
        assert!(r.is_empty());
        assert_eq!(r.remaining(), 0);
    }
}
