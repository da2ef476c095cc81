//! Name components: canonical ordering, URI escaping and the numeric
//! naming conventions (segment, version, timestamp, sequence number).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::tlv::{self, tlv_types};

pub const SEGMENT_MARKER: u8 = 0x00;
pub const SEGMENT_OFFSET_MARKER: u8 = 0xFB;
pub const TIMESTAMP_MARKER: u8 = 0xFC;
pub const VERSION_MARKER: u8 = 0xFD;
pub const SEQUENCE_NUMBER_MARKER: u8 = 0xFE;

pub const SHA256_DIGEST_SIZE: usize = 32;

const MAX_COMPONENT_TYPE: u32 = 0xFFFF;
const IMPLICIT_DIGEST_URI_PREFIX: &str = "sha256digest=";
const PARAMS_DIGEST_URI_PREFIX: &str = "params-sha256=";

/// One element of a [`Name`](crate::name::Name): a TLV-TYPE plus an opaque
/// byte value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Component {
    tlv_type: u32,
    value: Bytes,
}

impl Component {
    /// Create a generic name component
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type: tlv_types::GENERIC_NAME_COMPONENT,
            value: value.into(),
        }
    }

    /// Create a component of an arbitrary type.
    ///
    /// The type must be in `1..=65535`; digest components must hold exactly
    /// 32 bytes.
    pub fn with_type(tlv_type: u32, value: impl Into<Bytes>) -> Result<Self> {
        let value = value.into();
        if tlv_type == 0 || tlv_type > MAX_COMPONENT_TYPE {
            return Err(Error::InvalidComponent(format!(
                "component type {} outside 1..={}",
                tlv_type, MAX_COMPONENT_TYPE
            )));
        }
        if is_digest_type(tlv_type) && value.len() != SHA256_DIGEST_SIZE {
            return Err(Error::InvalidComponent(format!(
                "digest component must be {} bytes, got {}",
                SHA256_DIGEST_SIZE,
                value.len()
            )));
        }
        Ok(Self { tlv_type, value })
    }

    pub fn implicit_sha256_digest(digest: impl Into<Bytes>) -> Result<Self> {
        Self::with_type(tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT, digest)
    }

    /// Implicit digest component from a computed SHA-256 hash
    pub fn from_sha256_digest(digest: [u8; SHA256_DIGEST_SIZE]) -> Self {
        Self {
            tlv_type: tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT,
            value: Bytes::copy_from_slice(&digest),
        }
    }

    pub fn params_sha256_digest(digest: impl Into<Bytes>) -> Result<Self> {
        Self::with_type(tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT, digest)
    }

    /// Generic component holding `n` as a non-negative integer
    pub fn from_number(n: u64) -> Self {
        let mut value = BytesMut::with_capacity(8);
        tlv::write_non_negative_integer(&mut value, n);
        Self::new(value.freeze())
    }

    /// Generic component `marker ++ n`, with `n` in big-endian and leading
    /// zero bytes dropped; zero is the marker alone.
    pub fn from_number_with_marker(marker: u8, n: u64) -> Self {
        let bytes = n.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let mut value = BytesMut::with_capacity(1 + bytes.len() - skip);
        value.put_u8(marker);
        value.put_slice(&bytes[skip..]);
        Self::new(value.freeze())
    }

    pub fn from_segment(segment: u64) -> Self {
        Self::from_number_with_marker(SEGMENT_MARKER, segment)
    }

    pub fn from_segment_offset(offset: u64) -> Self {
        Self::from_number_with_marker(SEGMENT_OFFSET_MARKER, offset)
    }

    pub fn from_version(version: u64) -> Self {
        Self::from_number_with_marker(VERSION_MARKER, version)
    }

    pub fn from_sequence_number(seq: u64) -> Self {
        Self::from_number_with_marker(SEQUENCE_NUMBER_MARKER, seq)
    }

    /// Timestamp component carrying microseconds since the UNIX epoch
    pub fn from_timestamp(time: DateTime<Utc>) -> Result<Self> {
        let micros = u64::try_from(time.timestamp_micros()).map_err(|_| {
            Error::InvalidComponent(format!("timestamp {} is before the UNIX epoch", time))
        })?;
        Ok(Self::from_number_with_marker(TIMESTAMP_MARKER, micros))
    }

    /// Parse the URI form of a single component.
    ///
    /// Fails for `""`, `"."` and `".."`, which have no component
    /// representation.
    pub fn from_escaped_str(s: &str) -> Result<Self> {
        parse_uri_component(s)?
            .ok_or_else(|| Error::InvalidUri(format!("'{}' is not a name component", s)))
    }

    pub fn tlv_type(&self) -> u32 {
        self.tlv_type
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Length of the value
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_generic(&self) -> bool {
        self.tlv_type == tlv_types::GENERIC_NAME_COMPONENT
    }

    pub fn is_implicit_sha256_digest(&self) -> bool {
        self.tlv_type == tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT
            && self.value.len() == SHA256_DIGEST_SIZE
    }

    pub fn is_params_sha256_digest(&self) -> bool {
        self.tlv_type == tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT
            && self.value.len() == SHA256_DIGEST_SIZE
    }

    /// Interpret the value as a non-negative integer
    pub fn to_number(&self) -> Result<u64> {
        Ok(tlv::read_non_negative_integer(&self.value)?)
    }

    pub fn is_number_with_marker(&self, marker: u8) -> bool {
        matches!(self.value.first(), Some(first) if *first == marker) && self.value.len() <= 9
    }

    pub fn to_number_with_marker(&self, marker: u8) -> Result<u64> {
        if !self.is_number_with_marker(marker) {
            return Err(Error::InvalidComponent(format!(
                "{} is not a number with marker {:#04x}",
                self, marker
            )));
        }
        Ok(self.value[1..]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    pub fn is_segment(&self) -> bool {
        self.is_number_with_marker(SEGMENT_MARKER)
    }

    pub fn is_segment_offset(&self) -> bool {
        self.is_number_with_marker(SEGMENT_OFFSET_MARKER)
    }

    pub fn is_version(&self) -> bool {
        self.is_number_with_marker(VERSION_MARKER)
    }

    pub fn is_timestamp(&self) -> bool {
        self.is_number_with_marker(TIMESTAMP_MARKER)
    }

    pub fn is_sequence_number(&self) -> bool {
        self.is_number_with_marker(SEQUENCE_NUMBER_MARKER)
    }

    pub fn to_segment(&self) -> Result<u64> {
        self.to_number_with_marker(SEGMENT_MARKER)
    }

    pub fn to_segment_offset(&self) -> Result<u64> {
        self.to_number_with_marker(SEGMENT_OFFSET_MARKER)
    }

    pub fn to_version(&self) -> Result<u64> {
        self.to_number_with_marker(VERSION_MARKER)
    }

    pub fn to_sequence_number(&self) -> Result<u64> {
        self.to_number_with_marker(SEQUENCE_NUMBER_MARKER)
    }

    pub fn to_timestamp(&self) -> Result<DateTime<Utc>> {
        let micros = self.to_number_with_marker(TIMESTAMP_MARKER)?;
        i64::try_from(micros)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_micros)
            .ok_or_else(|| Error::InvalidComponent(format!("timestamp {} out of range", micros)))
    }

    /// The smallest component of the same type that sorts after this one.
    ///
    /// The value is incremented as a big-endian number; when every byte
    /// overflows the result is all zeros and one byte longer.
    pub fn successor(&self) -> Component {
        let mut value = self.value.to_vec();
        let mut carry = true;
        for byte in value.iter_mut().rev() {
            if *byte == 0xFF {
                *byte = 0;
            } else {
                *byte += 1;
                carry = false;
                break;
            }
        }
        if carry {
            value = vec![0; self.value.len() + 1];
        }

        Component {
            tlv_type: self.tlv_type,
            value: value.into(),
        }
    }

    /// Size of the TLV encoding
    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(self.tlv_type, self.value.len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        tlv::write_tlv(sink, self.tlv_type, &self.value)
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::with_value(self.tlv_type, self.value.clone());
        block.encode();
        block
    }

    /// Decode a component from a name sub-element, sharing its buffer
    pub fn from_block(block: &Block) -> Result<Self> {
        Self::with_type(block.tlv_type(), block.value()?.clone())
    }

    /// URI representation
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

fn is_digest_type(tlv_type: u32) -> bool {
    tlv_type == tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT
        || tlv_type == tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tlv_type
            .cmp(&other.tlv_type)
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tlv_type {
            tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT => {
                write!(f, "{}{}", IMPLICIT_DIGEST_URI_PREFIX, hex::encode(&self.value))
            }
            tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT => {
                write!(f, "{}{}", PARAMS_DIGEST_URI_PREFIX, hex::encode(&self.value))
            }
            tlv_types::GENERIC_NAME_COMPONENT => escape(f, &self.value),
            other => {
                write!(f, "{}=", other)?;
                escape(f, &self.value)
            }
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self)
    }
}

impl FromStr for Component {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_escaped_str(s)
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<&[u8]> for Component {
    fn from(value: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(value))
    }
}

impl From<Vec<u8>> for Component {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// Percent-encode `value`, leaving ASCII alphanumerics and `-._~` as is.
/// A value made only of periods gets three extra periods.
fn escape<W: fmt::Write>(out: &mut W, value: &[u8]) -> fmt::Result {
    if value.iter().all(|b| *b == b'.') {
        out.write_str("...")?;
        for _ in value {
            out.write_char('.')?;
        }
        return Ok(());
    }

    for &b in value {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.write_char(b as char)?;
        } else {
            write!(out, "%{:02X}", b)?;
        }
    }
    Ok(())
}

fn unescape(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escaped = bytes
                .get(i + 1..i + 3)
                .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| Error::InvalidUri(format!("malformed escape in '{}'", s)))?;
            out.push(escaped);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn decode_digest(s: &str, hex_text: &str, tlv_type: u32) -> Result<Component> {
    let digest = hex::decode(hex_text)
        .map_err(|e| Error::InvalidUri(format!("bad digest in '{}': {}", s, e)))?;
    Component::with_type(tlv_type, digest)
}

/// Parse one `/`-delimited piece of a name URI.
///
/// Returns `None` for the pieces that stand for no component (`""`, `"."`
/// and `".."`).
pub(crate) fn parse_uri_component(s: &str) -> Result<Option<Component>> {
    if let Some(hex_text) = s.strip_prefix(IMPLICIT_DIGEST_URI_PREFIX) {
        return decode_digest(s, hex_text, tlv_types::IMPLICIT_SHA256_DIGEST_COMPONENT).map(Some);
    }
    if let Some(hex_text) = s.strip_prefix(PARAMS_DIGEST_URI_PREFIX) {
        return decode_digest(s, hex_text, tlv_types::PARAMETERS_SHA256_DIGEST_COMPONENT).map(Some);
    }

    let (tlv_type, text) = match s.split_once('=') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) => {
            let tlv_type = prefix
                .parse::<u32>()
                .map_err(|_| Error::InvalidUri(format!("bad component type in '{}'", s)))?;
            (tlv_type, rest)
        }
        _ => (tlv_types::GENERIC_NAME_COMPONENT, s),
    };

    let mut value = unescape(text)?;
    if value.iter().all(|b| *b == b'.') {
        if value.len() < 3 {
            return Ok(None);
        }
        value = value.split_off(3);
    }
    Component::with_type(tlv_type, value).map(Some)
}
