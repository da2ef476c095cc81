use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::block::Block;
use crate::component::{self, Component, SHA256_DIGEST_SIZE};
use crate::error::{Error, Result};
use crate::tlv::{self, tlv_types};

/// Hierarchical NDN name: an ordered sequence of components.
///
/// Names compare component by component in canonical order; a strict prefix
/// sorts before any name it prefixes.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// Create a new empty name
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parse a name URI such as `/hello/world` or `ndn:/a/%00%01`.
    ///
    /// A leading scheme and `//authority` are ignored. Pieces that stand for
    /// no component (`""`, `"."`, `".."`) are skipped.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let mut uri = uri.trim();

        if let Some(colon) = uri.find(':') {
            match uri.find('/') {
                Some(slash) if slash < colon => {}
                _ => uri = &uri[colon + 1..],
            }
        }

        if let Some(rest) = uri.strip_prefix("//") {
            match rest.find('/') {
                Some(path_start) => uri = &rest[path_start..],
                None => return Ok(Self::new()),
            }
        }

        let uri = uri.strip_prefix('/').unwrap_or(uri);
        let mut name = Self::new();
        if uri.is_empty() {
            return Ok(name);
        }
        for piece in uri.split('/') {
            if let Some(component) = component::parse_uri_component(piece)? {
                name.components.push(component);
            }
        }
        Ok(name)
    }

    /// URI representation; the empty name is `/`
    pub fn to_uri(&self) -> String {
        self.to_string()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Resolve a possibly negative index (counted from the end)
    fn resolve(&self, index: isize) -> Option<usize> {
        let resolved = if index < 0 {
            self.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        (resolved < self.len()).then_some(resolved)
    }

    /// Component at `index`; negative indexes count from the end
    pub fn get(&self, index: isize) -> Result<&Component> {
        self.resolve(index)
            .map(|i| &self.components[i])
            .ok_or_else(|| Error::NotFound(format!("component {} of {}", index, self)))
    }

    pub fn last(&self) -> Option<&Component> {
        self.components.last()
    }

    /// First `n` components; a negative `n` drops that many from the end
    pub fn get_prefix(&self, n: isize) -> Name {
        let count = if n < 0 {
            self.len().saturating_sub(n.unsigned_abs())
        } else {
            (n as usize).min(self.len())
        };
        Name {
            components: self.components[..count].to_vec(),
        }
    }

    /// Up to `count` components starting at `start` (negative counts from
    /// the end). Out-of-range bounds are clamped.
    pub fn get_sub_name(&self, start: isize, count: usize) -> Name {
        let start = if start < 0 {
            self.len().saturating_sub(start.unsigned_abs())
        } else {
            (start as usize).min(self.len())
        };
        let end = start.saturating_add(count).min(self.len());
        Name {
            components: self.components[start..end].to_vec(),
        }
    }

    /// Check if this name is a prefix of another name
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    pub fn append(&mut self, component: Component) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Append raw bytes as a generic component
    pub fn append_bytes(&mut self, value: impl Into<Bytes>) -> &mut Self {
        self.append(Component::new(value))
    }

    /// Append the bytes of `s` as a generic component (no unescaping)
    pub fn append_str(&mut self, s: &str) -> &mut Self {
        self.append(Component::from(s))
    }

    pub fn append_name(&mut self, other: &Name) -> &mut Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    pub fn append_number(&mut self, n: u64) -> &mut Self {
        self.append(Component::from_number(n))
    }

    pub fn append_number_with_marker(&mut self, marker: u8, n: u64) -> &mut Self {
        self.append(Component::from_number_with_marker(marker, n))
    }

    pub fn append_segment(&mut self, segment: u64) -> &mut Self {
        self.append(Component::from_segment(segment))
    }

    pub fn append_segment_offset(&mut self, offset: u64) -> &mut Self {
        self.append(Component::from_segment_offset(offset))
    }

    /// Append a version; `None` uses the current time in milliseconds
    pub fn append_version(&mut self, version: Option<u64>) -> &mut Self {
        let version = version.unwrap_or_else(|| Utc::now().timestamp_millis().max(0) as u64);
        self.append(Component::from_version(version))
    }

    /// Append a timestamp; `None` uses the current time
    pub fn append_timestamp(&mut self, time: Option<DateTime<Utc>>) -> Result<&mut Self> {
        let component = Component::from_timestamp(time.unwrap_or_else(Utc::now))?;
        Ok(self.append(component))
    }

    pub fn append_sequence_number(&mut self, seq: u64) -> &mut Self {
        self.append(Component::from_sequence_number(seq))
    }

    pub fn append_implicit_sha256_digest(&mut self, digest: impl Into<Bytes>) -> Result<&mut Self> {
        let component = Component::implicit_sha256_digest(digest)?;
        Ok(self.append(component))
    }

    /// Remove the component at `index`; negative indexes count from the end
    pub fn erase(&mut self, index: isize) -> Result<Component> {
        let i = self
            .resolve(index)
            .ok_or_else(|| Error::NotFound(format!("component {} of {}", index, self)))?;
        Ok(self.components.remove(i))
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// The smallest name that sorts after this one and all names it
    /// prefixes.
    pub fn successor(&self) -> Name {
        match self.components.split_last() {
            None => Name {
                components: vec![Component::from_sha256_digest([0; SHA256_DIGEST_SIZE])],
            },
            Some((last, init)) => {
                let mut components = init.to_vec();
                components.push(last.successor());
                Name { components }
            }
        }
    }

    fn value_len(&self) -> usize {
        self.components.iter().map(Component::encoded_len).sum()
    }

    /// Size of the Name TLV
    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(tlv_types::NAME, self.value_len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let value_len = self.value_len();
        let mut written = tlv::write_var_number(sink, tlv_types::NAME as u64);
        written += tlv::write_var_number(sink, value_len as u64);
        for component in &self.components {
            written += component.encode_to(sink);
        }
        written
    }

    /// Encode name to TLV format
    pub fn wire_encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    pub fn to_block(&self) -> Block {
        Block::nested(
            tlv_types::NAME,
            self.components.iter().map(Component::to_block).collect(),
        )
    }

    /// Decode a Name block; components share the block's buffer
    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::NAME)?;
        let mut block = block.clone();
        block.parse()?;

        let components = block
            .elements()
            .iter()
            .map(Component::from_block)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components })
    }

    /// Decode a name from a buffer holding exactly one Name TLV
    pub fn from_wire(bytes: Bytes) -> Result<Self> {
        Self::wire_decode(&Block::from_bytes(bytes)?)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_uri(s)
    }
}

impl FromIterator<Component> for Name {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

impl Extend<Component> for Name {
    fn extend<I: IntoIterator<Item = Component>>(&mut self, iter: I) {
        self.components.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn test_name_creation() {
        let name = name("/hello/world");
        assert_eq!(name.len(), 2);
        assert_eq!(name.get(0).unwrap(), &Component::from("hello"));
        assert_eq!(name.get(-1).unwrap(), &Component::from("world"));
        assert!(name.get(2).is_err());
        assert!(name.get(-3).is_err());
        assert_eq!(name.to_string(), "/hello/world");
    }

    #[test]
    fn test_empty_name() {
        let empty = Name::new();
        assert!(empty.is_empty());
        assert_eq!(empty.to_uri(), "/");
        assert_eq!(name("/"), empty);
        assert_eq!(name(""), empty);
        assert_eq!(name("ndn:"), empty);
    }

    #[test]
    fn test_uri_scheme_and_authority() {
        let expected = name("/a/b");
        assert_eq!(name("ndn:/a/b"), expected);
        assert_eq!(name("ndn://authority/a/b"), expected);
        assert_eq!(name("  /a/b/  "), expected);
        assert_eq!(name("a/b"), expected);
        assert_eq!(name("//authority"), Name::new());
    }

    #[test]
    fn test_uri_period_components() {
        let parsed = name("/a/./b/../c");
        assert_eq!(parsed.to_uri(), "/a/b/c");

        let parsed = name("/.../..../a");
        assert_eq!(parsed.len(), 3);
        assert!(parsed.get(0).unwrap().is_empty());
        assert_eq!(parsed.get(1).unwrap(), &Component::from("."));
        assert_eq!(parsed.to_uri(), "/.../..../a");
    }

    #[test]
    fn test_uri_round_trip_escapes() {
        let mut original = Name::new();
        original
            .append_bytes(vec![0x00, 0x01, 0xFF])
            .append_str("a b")
            .append_str("")
            .append_segment(3);
        let uri = original.to_uri();
        assert_eq!(uri, "/%00%01%FF/a%20b/.../%00%03");
        assert_eq!(name(&uri), original);
        assert!(Name::from_uri("/a%G1").is_err());
    }

    #[test]
    fn test_name_prefix() {
        let name = name("/hello/world/test");
        let prefix = name.get_prefix(2);
        assert_eq!(prefix.to_string(), "/hello/world");
        assert!(prefix.is_prefix_of(&name));
        assert!(name.is_prefix_of(&name));
        assert!(!name.is_prefix_of(&prefix));
        assert_eq!(name.get_prefix(-1), prefix);
        assert_eq!(name.get_prefix(10), name);
        assert_eq!(name.get_prefix(-10), Name::new());
        assert!(Name::new().is_prefix_of(&name));
    }

    #[test]
    fn test_sub_name() {
        let name = name("/a/b/c/d");
        assert_eq!(name.get_sub_name(1, 2).to_uri(), "/b/c");
        assert_eq!(name.get_sub_name(-2, usize::MAX).to_uri(), "/c/d");
        assert_eq!(name.get_sub_name(3, 5).to_uri(), "/d");
        assert!(name.get_sub_name(9, 1).is_empty());
    }

    #[test]
    fn test_erase_and_clear() {
        let mut name = name("/a/b/c");
        assert_eq!(name.erase(-1).unwrap(), Component::from("c"));
        assert_eq!(name.erase(0).unwrap(), Component::from("a"));
        assert!(name.erase(5).is_err());
        assert_eq!(name.to_uri(), "/b");
        name.clear();
        assert!(name.is_empty());
    }

    #[test]
    fn test_canonical_sort_order() {
        let mut names = vec![name("/ab"), name("/b"), name("/a/b"), name("/a")];
        names.sort();
        let uris: Vec<String> = names.iter().map(Name::to_uri).collect();
        assert_eq!(uris, vec!["/a", "/a/b", "/b", "/ab"]);
    }

    #[test]
    fn test_order_is_strict_and_total() {
        let names = vec![name("/"), name("/a"), name("/a/b"), name("/b"), name("/ab"), name("/a/%00")];
        for a in &names {
            for b in &names {
                let forward = a.cmp(b);
                assert_eq!(forward.reverse(), b.cmp(a));
                assert_eq!(forward == std::cmp::Ordering::Equal, a == b);
            }
        }
    }

    #[test]
    fn test_successor() {
        assert_eq!(name("/a/%00").successor(), name("/a/%01"));
        assert_eq!(name("/%FF").successor(), name("/%00%00"));

        let empty_successor = Name::new().successor();
        assert_eq!(empty_successor.to_uri(), format!("/sha256digest={}", "00".repeat(32)));

        let n = name("/a/b");
        assert!(n < n.successor());
        assert!(name("/a/b/c") < n.successor());
    }

    #[test]
    fn test_naming_conventions() {
        let mut name = Name::new();
        name.append_segment(0);
        assert_eq!(name.get(0).unwrap().len(), 1);

        name.append_segment(256).append_version(Some(3)).append_sequence_number(9);
        assert_eq!(name.get(1).unwrap().to_segment().unwrap(), 256);
        assert_eq!(name.get(2).unwrap().to_version().unwrap(), 3);
        assert_eq!(name.get(3).unwrap().to_sequence_number().unwrap(), 9);

        name.append_version(None);
        assert!(name.get(-1).unwrap().is_version());
        name.append_timestamp(None).unwrap();
        assert!(name.get(-1).unwrap().to_timestamp().is_ok());
        name.append_number(5);
        assert_eq!(name.get(-1).unwrap().to_number().unwrap(), 5);
    }

    #[test]
    fn test_name_encoding() {
        let name = name("/hello/world");
        let encoded = name.wire_encode();
        assert_eq!(encoded.len(), name.encoded_len());
        assert_eq!(&encoded[..4], &[7, 14, 8, 5]);
        assert_eq!(Name::from_wire(encoded.clone()).unwrap(), name);
        assert_eq!(name.to_block().wire().unwrap(), &encoded);
    }

    #[test]
    fn test_encoding_edge_cases() {
        assert_eq!(&Name::new().wire_encode()[..], &[7, 0]);
        assert_eq!(Name::from_wire(Name::new().wire_encode()).unwrap(), Name::new());

        for len in [0usize, 252, 253, 0x1_0000] {
            let mut name = Name::new();
            name.append_bytes(vec![b'x'; len]);
            let decoded = Name::from_wire(name.wire_encode()).unwrap();
            assert_eq!(decoded, name);
        }

        let mut typed = Name::new();
        typed
            .append(Component::with_type(0xFFFF, Bytes::from_static(b"t")).unwrap())
            .append_implicit_sha256_digest(vec![7u8; 32])
            .unwrap();
        assert_eq!(Name::from_wire(typed.wire_encode()).unwrap(), typed);
    }

    #[test]
    fn test_decode_errors() {
        assert!(Name::from_wire(Bytes::from_static(&[6, 0])).is_err());
        assert!(Name::from_wire(Bytes::from_static(&[7, 3, 8, 5, b'a'])).is_err());
        assert!(Name::from_wire(Bytes::from_static(&[7, 2, 1, 0])).is_err());
        assert!(Name::from_wire(Bytes::from_static(&[7, 2, 0, 0])).is_err());
    }
}
