//! TLV (Type-Length-Value) codec for the NDN packet format
//!
//! Wire format:
//! - Type: VAR-NUMBER (1, 3, 5 or 9 bytes)
//! - Length: VAR-NUMBER (1, 3, 5 or 9 bytes)
//! - Value: `Length` bytes
//!
//! A VAR-NUMBER below 253 is stored in a single byte. Larger numbers are
//! prefixed by a marker byte: 253 for a 2-byte, 254 for a 4-byte and 255 for
//! an 8-byte big-endian payload.

use bytes::BufMut;
use std::ops::Range;

/// TLV-TYPE numbers used by the packet format
pub mod tlv_types {
    pub const IMPLICIT_SHA256_DIGEST_COMPONENT: u32 = 0x01;
    pub const PARAMETERS_SHA256_DIGEST_COMPONENT: u32 = 0x02;
    pub const INTEREST: u32 = 0x05;
    pub const DATA: u32 = 0x06;
    pub const NAME: u32 = 0x07;
    pub const GENERIC_NAME_COMPONENT: u32 = 0x08;
    pub const SELECTORS: u32 = 0x09;
    pub const NONCE: u32 = 0x0A;
    pub const INTEREST_LIFETIME: u32 = 0x0C;
    pub const MIN_SUFFIX_COMPONENTS: u32 = 0x0D;
    pub const MAX_SUFFIX_COMPONENTS: u32 = 0x0E;
    pub const PUBLISHER_PUBLIC_KEY_LOCATOR: u32 = 0x0F;
    pub const EXCLUDE: u32 = 0x10;
    pub const CHILD_SELECTOR: u32 = 0x11;
    pub const MUST_BE_FRESH: u32 = 0x12;
    pub const ANY: u32 = 0x13;
    pub const META_INFO: u32 = 0x14;
    pub const CONTENT: u32 = 0x15;
    pub const SIGNATURE_INFO: u32 = 0x16;
    pub const SIGNATURE_VALUE: u32 = 0x17;
    pub const CONTENT_TYPE: u32 = 0x18;
    pub const FRESHNESS_PERIOD: u32 = 0x19;
    pub const FINAL_BLOCK_ID: u32 = 0x1A;
    pub const SIGNATURE_TYPE: u32 = 0x1B;
    pub const KEY_LOCATOR: u32 = 0x1C;
    pub const KEY_DIGEST: u32 = 0x1D;
    pub const FORWARDING_HINT: u32 = 0x1E;
    pub const LINK_PREFERENCE: u32 = 0x1E;
    pub const LINK_DELEGATION: u32 = 0x1F;

    /// Range reserved for application-defined MetaInfo elements
    pub const APP_META_INFO_MIN: u32 = 128;
    pub const APP_META_INFO_MAX: u32 = 252;
}

/// Errors that can occur during TLV decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    #[error("Buffer too short")]
    BufferTooShort,
    #[error("Invalid length: {0}")]
    InvalidLength(u64),
    #[error("Unexpected TLV type: expected {expected}, got {actual}")]
    UnexpectedType { expected: u32, actual: u32 },
    #[error("TLV type out of range: {0}")]
    TypeOutOfRange(u64),
    #[error("Invalid non-negative integer of {0} bytes")]
    InvalidNonNegativeInteger(usize),
    #[error("Trailing bytes after TLV element: {0}")]
    TrailingBytes(usize),
    #[error("Malformed element: {0}")]
    Malformed(String),
}

/// Read a VAR-NUMBER starting at `offset`.
///
/// Returns the value and the number of bytes consumed. All four encodings
/// are accepted, minimal or not.
pub fn read_var_number(buf: &[u8], offset: usize) -> Result<(u64, usize), TlvError> {
    let first = *buf.get(offset).ok_or(TlvError::BufferTooShort)?;
    let width = match first {
        0..=252 => return Ok((first as u64, 1)),
        253 => 2,
        254 => 4,
        255 => 8,
    };

    let start = offset + 1;
    let bytes = buf
        .get(start..start + width)
        .ok_or(TlvError::BufferTooShort)?;
    let value = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    Ok((value, 1 + width))
}

/// Number of bytes `write_var_number` produces for `n`
pub fn var_number_size(n: u64) -> usize {
    if n < 253 {
        1
    } else if n <= 0xFFFF {
        3
    } else if n <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Write `n` in its minimal VAR-NUMBER form, returning the bytes written
pub fn write_var_number<B: BufMut>(sink: &mut B, n: u64) -> usize {
    if n < 253 {
        sink.put_u8(n as u8);
    } else if n <= 0xFFFF {
        sink.put_u8(253);
        sink.put_u16(n as u16);
    } else if n <= 0xFFFF_FFFF {
        sink.put_u8(254);
        sink.put_u32(n as u32);
    } else {
        sink.put_u8(255);
        sink.put_u64(n);
    }
    var_number_size(n)
}

/// Read a TLV-TYPE, which must fit in 32 bits
pub fn read_type(buf: &[u8], offset: usize) -> Result<(u32, usize), TlvError> {
    let (value, consumed) = read_var_number(buf, offset)?;
    let tlv_type = u32::try_from(value).map_err(|_| TlvError::TypeOutOfRange(value))?;
    Ok((tlv_type, consumed))
}

/// Read the header of the TLV element at `offset`.
///
/// Returns the TLV-TYPE, the absolute range of the value inside `buf` and
/// the total size of the element. Fails if the declared length runs past the
/// end of the buffer.
pub fn read_block(buf: &[u8], offset: usize) -> Result<(u32, Range<usize>, usize), TlvError> {
    let (tlv_type, type_size) = read_type(buf, offset)?;
    let (length, length_size) = read_var_number(buf, offset + type_size)?;

    let value_start = offset + type_size + length_size;
    let remaining = (buf.len() - value_start) as u64;
    if length > remaining {
        return Err(TlvError::InvalidLength(length));
    }

    let value_end = value_start + length as usize;
    Ok((tlv_type, value_start..value_end, value_end - offset))
}

/// Write a complete TLV element, returning the bytes written
pub fn write_tlv<B: BufMut>(sink: &mut B, tlv_type: u32, value: &[u8]) -> usize {
    let mut written = write_var_number(sink, tlv_type as u64);
    written += write_var_number(sink, value.len() as u64);
    sink.put_slice(value);
    written + value.len()
}

/// Size of a complete TLV element holding `value_len` bytes
pub fn tlv_size(tlv_type: u32, value_len: usize) -> usize {
    var_number_size(tlv_type as u64) + var_number_size(value_len as u64) + value_len
}

/// Number of bytes used to store `n` as a non-negative integer
pub fn non_negative_integer_size(n: u64) -> usize {
    if n <= 0xFF {
        1
    } else if n <= 0xFFFF {
        2
    } else if n <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

/// Write `n` as a 1, 2, 4 or 8-byte big-endian integer, smallest first
pub fn write_non_negative_integer<B: BufMut>(sink: &mut B, n: u64) -> usize {
    match non_negative_integer_size(n) {
        1 => sink.put_u8(n as u8),
        2 => sink.put_u16(n as u16),
        4 => sink.put_u32(n as u32),
        _ => sink.put_u64(n),
    }
    non_negative_integer_size(n)
}

/// Write a TLV element whose value is the non-negative integer `n`
pub fn write_non_negative_integer_tlv<B: BufMut>(sink: &mut B, tlv_type: u32, n: u64) -> usize {
    let size = non_negative_integer_size(n);
    let mut written = write_var_number(sink, tlv_type as u64);
    written += write_var_number(sink, size as u64);
    written + write_non_negative_integer(sink, n)
}

/// Size of the TLV element produced by `write_non_negative_integer_tlv`
pub fn non_negative_integer_tlv_size(tlv_type: u32, n: u64) -> usize {
    tlv_size(tlv_type, non_negative_integer_size(n))
}

/// Read a non-negative integer occupying the whole of `value`
pub fn read_non_negative_integer(value: &[u8]) -> Result<u64, TlvError> {
    match value.len() {
        1 | 2 | 4 | 8 => Ok(value.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)),
        other => Err(TlvError::InvalidNonNegativeInteger(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_number_encoding_variants() {
        let test_cases: Vec<(u64, Vec<u8>)> = vec![
            (0, vec![0]),
            (252, vec![252]),
            (253, vec![0xFD, 0x00, 0xFD]),
            (0xFFFF, vec![0xFD, 0xFF, 0xFF]),
            (0x1_0000, vec![0xFE, 0x00, 0x01, 0x00, 0x00]),
            (0xFFFF_FFFF, vec![0xFE, 0xFF, 0xFF, 0xFF, 0xFF]),
            (0x1_0000_0000, vec![0xFF, 0, 0, 0, 1, 0, 0, 0, 0]),
        ];

        for (value, expected) in test_cases {
            let mut buf = Vec::new();
            let written = write_var_number(&mut buf, value);
            assert_eq!(buf, expected);
            assert_eq!(written, expected.len());
            assert_eq!(var_number_size(value), expected.len());
            assert_eq!(read_var_number(&buf, 0).unwrap(), (value, expected.len()));
        }
    }

    #[test]
    fn test_non_minimal_var_number_accepted() {
        let buf = [0xFD, 0x00, 0x05];
        assert_eq!(read_var_number(&buf, 0).unwrap(), (5, 3));

        let buf = [0xFF, 0, 0, 0, 0, 0, 0, 0, 7];
        assert_eq!(read_var_number(&buf, 0).unwrap(), (7, 9));
    }

    #[test]
    fn test_var_number_truncated() {
        assert_eq!(read_var_number(&[], 0), Err(TlvError::BufferTooShort));
        assert_eq!(read_var_number(&[0xFD, 0x01], 0), Err(TlvError::BufferTooShort));
        assert_eq!(read_var_number(&[0xFE, 0, 0, 0], 0), Err(TlvError::BufferTooShort));
        assert_eq!(read_var_number(&[0x01], 1), Err(TlvError::BufferTooShort));
    }

    #[test]
    fn test_read_type_out_of_range() {
        let mut buf = Vec::new();
        write_var_number(&mut buf, 0x1_0000_0000);
        assert!(matches!(read_type(&buf, 0), Err(TlvError::TypeOutOfRange(_))));
    }

    #[test]
    fn test_read_block() {
        let buf = [0x00, 0x08, 0x03, b'a', b'b', b'c', 0xFF];
        let (tlv_type, value, total) = read_block(&buf, 1).unwrap();
        assert_eq!(tlv_type, 8);
        assert_eq!(value, 3..6);
        assert_eq!(total, 5);
    }

    #[test]
    fn test_read_block_length_past_end() {
        let data = vec![8, 5, 0x01, 0x02];
        assert_eq!(read_block(&data, 0), Err(TlvError::InvalidLength(5)));
    }

    #[test]
    fn test_write_tlv_large_value() {
        let large_value = vec![0xAA; 300];
        let mut encoded = Vec::new();
        let written = write_tlv(&mut encoded, 21, &large_value);

        assert_eq!(written, tlv_size(21, 300));
        assert_eq!(encoded[0], 21);
        assert_eq!(encoded[1], 0xFD);
        assert_eq!(u16::from_be_bytes([encoded[2], encoded[3]]), 300);
        assert_eq!(encoded[4..], large_value);
    }

    #[test]
    fn test_non_negative_integer_widths() {
        let test_cases: Vec<(u64, usize)> = vec![
            (0, 1),
            (0xFF, 1),
            (0x100, 2),
            (0xFFFF, 2),
            (0x1_0000, 4),
            (0x1_0000_0000, 8),
            (u64::MAX, 8),
        ];

        for (value, width) in test_cases {
            let mut buf = Vec::new();
            assert_eq!(write_non_negative_integer(&mut buf, value), width);
            assert_eq!(buf.len(), width);
            assert_eq!(read_non_negative_integer(&buf).unwrap(), value);
        }
    }

    #[test]
    fn test_non_negative_integer_tlv() {
        let mut buf = Vec::new();
        let written = write_non_negative_integer_tlv(&mut buf, 12, 4000);
        assert_eq!(buf, vec![12, 2, 0x0F, 0xA0]);
        assert_eq!(written, non_negative_integer_tlv_size(12, 4000));
    }

    #[test]
    fn test_non_negative_integer_bad_width() {
        assert_eq!(
            read_non_negative_integer(&[1, 2, 3]),
            Err(TlvError::InvalidNonNegativeInteger(3))
        );
        assert!(read_non_negative_integer(&[]).is_err());
    }
}
