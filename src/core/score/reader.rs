use thiserror::Error;

/// Longest variable-length quantity accepted (28 bits of payload)
pub const MAX_VLQ_BYTES: usize = 4;

/// Reasons a score stream stops parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of data at offset {0}")]
    UnexpectedEof(usize),

    #[error("variable-length quantity longer than {MAX_VLQ_BYTES} bytes at offset {0}")]
    VlqTooLong(usize),

    #[error("expected a status byte at offset {offset}, found data byte {byte:#04x}")]
    MissingStatus { offset: usize, byte: u8 },

    #[error("unsupported status byte {byte:#04x} at offset {offset}")]
    UnsupportedStatus { offset: usize, byte: u8 },

    #[error("bad chunk tag {tag:?} at offset {offset}")]
    BadTag { offset: usize, tag: [u8; 4] },
}

/// Big-endian cursor over a byte slice. Offsets reported in errors are
/// absolute positions in the whole file.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at_offset(data, 0)
    }

    /// A reader over `data`, which starts `base` bytes into the file.
    pub fn at_offset(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn u8(&mut self) -> Result<u8, ParseError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(ParseError::UnexpectedEof(self.position()))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn u16_be(&mut self) -> Result<u16, ParseError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn u32_be(&mut self) -> Result<u32, ParseError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn tag(&mut self) -> Result<[u8; 4], ParseError> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if len > self.remaining() {
            return Err(ParseError::UnexpectedEof(self.base + self.data.len()));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        self.take(len).map(|_| ())
    }

    /// Decode a variable-length quantity: 7 bits per byte, high bit set on
    /// every byte except the last.
    pub fn vlq(&mut self) -> Result<u32, ParseError> {
        let start = self.position();
        let mut value = u32::from(self.u8()?);

        if value & 0x80 != 0 {
            value &= 0x7F;
            let mut count = 1;
            loop {
                let byte = self.u8()?;
                count += 1;
                if count > MAX_VLQ_BYTES {
                    return Err(ParseError::VlqTooLong(start));
                }
                value = (value << 7) + u32::from(byte & 0x7F);
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }

        Ok(value)
    }
}

/// Encode `value` as a variable-length quantity. Values above `0x0FFF_FFFF`
/// need five bytes, which the decoder rejects.
pub fn encode_vlq(value: u32) -> Vec<u8> {
    let mut groups = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        groups.push(((rest & 0x7F) as u8) | 0x80);
        rest >>= 7;
    }
    groups.reverse();
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<u32, ParseError> {
        ByteReader::new(bytes).vlq()
    }

    #[test]
    fn known_encodings() {
        assert_eq!(decode(&[0x00]), Ok(0));
        assert_eq!(decode(&[0x7F]), Ok(0x7F));
        assert_eq!(decode(&[0x81, 0x00]), Ok(0x80));
        assert_eq!(decode(&[0xC0, 0x00]), Ok(0x2000));
        assert_eq!(decode(&[0xFF, 0x7F]), Ok(0x3FFF));
        assert_eq!(decode(&[0x81, 0x80, 0x00]), Ok(0x4000));
        assert_eq!(decode(&[0xFF, 0xFF, 0x7F]), Ok(0x1F_FFFF));
        assert_eq!(decode(&[0x81, 0x80, 0x80, 0x00]), Ok(0x20_0000));
        assert_eq!(decode(&[0xFF, 0xFF, 0xFF, 0x7F]), Ok(0x0FFF_FFFF));
    }

    #[test]
    fn round_trips_one_to_four_bytes() {
        for (value, len) in [(0x40, 1), (0x1234, 2), (0x10_0000, 3), (0x0ABC_DEF0, 4)] {
            let encoded = encode_vlq(value);
            assert_eq!(encoded.len(), len, "length for {value:#x}");
            let mut reader = ByteReader::new(&encoded);
            assert_eq!(reader.vlq(), Ok(value));
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn truncated_vlq_is_eof() {
        assert_eq!(decode(&[0x81]), Err(ParseError::UnexpectedEof(1)));
    }

    #[test]
    fn five_byte_vlq_is_rejected() {
        assert_eq!(decode(&[0x81, 0x80, 0x80, 0x80, 0x00]), Err(ParseError::VlqTooLong(0)));
    }

    #[test]
    fn big_endian_fields() {
        let mut reader = ByteReader::at_offset(&[0x12, 0x34, 0x00, 0x00, 0x01, 0x00, b'M'], 10);
        assert_eq!(reader.u16_be(), Ok(0x1234));
        assert_eq!(reader.u32_be(), Ok(0x100));
        assert_eq!(reader.position(), 16);
        assert_eq!(reader.take(2), Err(ParseError::UnexpectedEof(17)));
        assert_eq!(reader.u8(), Ok(b'M'));
        assert_eq!(reader.u8(), Err(ParseError::UnexpectedEof(17)));
    }
}
