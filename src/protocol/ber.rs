//! Minimal BER (X.690) reader and writer.
//!
//! LDAP only needs single-byte tags, definite lengths and a handful of
//! universal types, so this module supports exactly that subset.

use std::io;

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_ENUMERATED: u8 = 0x0a;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

/// Errors produced while framing or decoding LDAP messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Truncated BER element")]
    Truncated,

    #[error("Unexpected tag 0x{found:02x}, expected 0x{expected:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    #[error("Unsupported BER length encoding")]
    InvalidLength,

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Integer value out of range")]
    IntegerOverflow,

    #[error("Invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("Malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    pub fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            detail: detail.into(),
        }
    }
}

/// Parse the tag and length octets at the start of `buf`.
///
/// Returns `(header_len, content_len)`, or `None` when more bytes are needed.
pub fn parse_header(buf: &[u8]) -> Result<Option<(usize, usize)>, ProtocolError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    if buf[0] & 0x1f == 0x1f {
        return Err(ProtocolError::malformed("tag", "high tag numbers are not used by LDAP"));
    }

    let first = buf[1];
    if first & 0x80 == 0 {
        return Ok(Some((2, first as usize)));
    }

    // 0x80 alone is the indefinite form, which LDAP forbids.
    let count = (first & 0x7f) as usize;
    if count == 0 || count > 4 {
        return Err(ProtocolError::InvalidLength);
    }
    if buf.len() < 2 + count {
        return Ok(None);
    }

    let length = buf[2..2 + count]
        .iter()
        .fold(0usize, |acc, byte| (acc << 8) | *byte as usize);
    Ok(Some((2 + count, length)))
}

/// Cursor over a buffer holding zero or more complete BER elements.
#[derive(Debug, Clone)]
pub struct BerReader<'a> {
    data: &'a [u8],
}

impl<'a> BerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Read the next element, returning its tag and content octets.
    pub fn read_element(&mut self) -> Result<(u8, &'a [u8]), ProtocolError> {
        let (header, length) = parse_header(self.data)?.ok_or(ProtocolError::Truncated)?;
        let end = header
            .checked_add(length)
            .ok_or(ProtocolError::InvalidLength)?;
        if self.data.len() < end {
            return Err(ProtocolError::Truncated);
        }

        let tag = self.data[0];
        let content = &self.data[header..end];
        self.data = &self.data[end..];
        Ok((tag, content))
    }

    pub fn expect(&mut self, tag: u8) -> Result<&'a [u8], ProtocolError> {
        let (found, content) = self.read_element()?;
        if found != tag {
            return Err(ProtocolError::UnexpectedTag {
                expected: tag,
                found,
            });
        }
        Ok(content)
    }

    /// Read a constructed element and return a reader over its content.
    pub fn read_constructed(&mut self, tag: u8) -> Result<BerReader<'a>, ProtocolError> {
        self.expect(tag).map(BerReader::new)
    }

    /// Read the element only if the next tag matches.
    pub fn read_optional(&mut self, tag: u8) -> Result<Option<&'a [u8]>, ProtocolError> {
        if self.peek_tag() == Some(tag) {
            self.expect(tag).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_integer(&mut self, tag: u8) -> Result<i64, ProtocolError> {
        decode_integer(self.expect(tag)?)
    }

    pub fn read_bool(&mut self, tag: u8) -> Result<bool, ProtocolError> {
        match self.expect(tag)? {
            [value] => Ok(*value != 0),
            other => Err(ProtocolError::malformed(
                "boolean",
                format!("expected 1 content octet, found {}", other.len()),
            )),
        }
    }

    pub fn read_octets(&mut self, tag: u8) -> Result<&'a [u8], ProtocolError> {
        self.expect(tag)
    }

    pub fn read_string(&mut self, tag: u8, field: &'static str) -> Result<String, ProtocolError> {
        decode_string(self.expect(tag)?, field)
    }
}

pub fn decode_string(bytes: &[u8], field: &'static str) -> Result<String, ProtocolError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { field })
}

pub fn decode_integer(bytes: &[u8]) -> Result<i64, ProtocolError> {
    if bytes.is_empty() {
        return Err(ProtocolError::malformed("integer", "no content octets"));
    }
    if bytes.len() > 8 {
        return Err(ProtocolError::IntegerOverflow);
    }

    let seed: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(bytes
        .iter()
        .fold(seed, |acc, byte| (acc << 8) | *byte as i64))
}

fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // Drop leading octets that only repeat the sign bit.
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn write_length(buf: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        buf.push(length as u8);
        return;
    }
    let bytes = (length as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    buf.push(0x80 | (bytes.len() - skip) as u8);
    buf.extend_from_slice(&bytes[skip..]);
}

/// Growable buffer of BER elements.
#[derive(Debug, Default, Clone)]
pub struct BerWriter {
    buf: Vec<u8>,
}

impl BerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_element(&mut self, tag: u8, content: &[u8]) {
        self.buf.push(tag);
        write_length(&mut self.buf, content.len());
        self.buf.extend_from_slice(content);
    }

    pub fn write_integer(&mut self, tag: u8, value: i64) {
        self.write_element(tag, &encode_integer(value));
    }

    pub fn write_bool(&mut self, tag: u8, value: bool) {
        self.write_element(tag, &[if value { 0xff } else { 0x00 }]);
    }

    pub fn write_octets(&mut self, tag: u8, value: &[u8]) {
        self.write_element(tag, value);
    }

    /// Write a constructed element whose content is produced by `build`.
    pub fn write_constructed(&mut self, tag: u8, build: impl FnOnce(&mut BerWriter)) {
        let mut inner = BerWriter::new();
        build(&mut inner);
        self.write_element(tag, &inner.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding_is_minimal() {
        assert_eq!(encode_integer(0), vec![0x00]);
        assert_eq!(encode_integer(127), vec![0x7f]);
        assert_eq!(encode_integer(128), vec![0x00, 0x80]);
        assert_eq!(encode_integer(256), vec![0x01, 0x00]);
        assert_eq!(encode_integer(-1), vec![0xff]);
        assert_eq!(encode_integer(-129), vec![0xff, 0x7f]);
    }

    #[test]
    fn test_integer_decoding_sign_extends() {
        assert_eq!(decode_integer(&[0xff]).unwrap(), -1);
        assert_eq!(decode_integer(&[0x00, 0x80]).unwrap(), 128);
        assert_eq!(decode_integer(&[0x7f, 0xff, 0xff, 0xff]).unwrap(), i32::MAX as i64);
        assert!(matches!(
            decode_integer(&[0; 9]),
            Err(ProtocolError::IntegerOverflow)
        ));
    }

    #[test]
    fn test_long_form_length() {
        let mut writer = BerWriter::new();
        writer.write_octets(TAG_OCTET_STRING, &[0x41; 300]);
        let bytes = writer.into_bytes();

        assert_eq!(&bytes[..4], &[TAG_OCTET_STRING, 0x82, 0x01, 0x2c]);
        assert_eq!(parse_header(&bytes).unwrap(), Some((4, 300)));
        assert_eq!(parse_header(&bytes[..3]).unwrap(), None);
    }

    #[test]
    fn test_indefinite_length_rejected() {
        assert!(matches!(
            parse_header(&[TAG_SEQUENCE, 0x80]),
            Err(ProtocolError::InvalidLength)
        ));
    }

    #[test]
    fn test_reader_walks_nested_elements() {
        let mut writer = BerWriter::new();
        writer.write_constructed(TAG_SEQUENCE, |w| {
            w.write_integer(TAG_INTEGER, 7);
            w.write_bool(TAG_BOOLEAN, true);
            w.write_octets(TAG_OCTET_STRING, b"uid=admin,ou=system");
        });
        let bytes = writer.into_bytes();

        let mut reader = BerReader::new(&bytes);
        let mut sequence = reader.read_constructed(TAG_SEQUENCE).unwrap();
        assert!(reader.is_empty());
        assert_eq!(sequence.read_integer(TAG_INTEGER).unwrap(), 7);
        assert!(sequence.read_bool(TAG_BOOLEAN).unwrap());
        assert_eq!(
            sequence.read_string(TAG_OCTET_STRING, "dn").unwrap(),
            "uid=admin,ou=system"
        );
        assert!(sequence.is_empty());
    }

    #[test]
    fn test_unexpected_tag_reports_both_tags() {
        let mut writer = BerWriter::new();
        writer.write_integer(TAG_INTEGER, 1);
        let bytes = writer.into_bytes();

        let err = BerReader::new(&bytes)
            .read_octets(TAG_OCTET_STRING)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedTag {
                expected: TAG_OCTET_STRING,
                found: TAG_INTEGER
            }
        ));
    }
}
