//! Lazily parsed TLV element over a shared buffer.
//!
//! A [`Block`] is either *unset* (no bytes at all), *value-only* (holds the
//! value but not the outer type/length) or carries its complete *wire*
//! encoding, in which case the value is a sub-slice of the wire. Parsing the
//! value into sub-elements is deferred until [`Block::parse`] is called; the
//! sub-elements alias the parent's buffer.

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;

use crate::error::{Error, Result};
use crate::tlv::{self, TlvError};

#[derive(Debug, Clone)]
pub struct Block {
    tlv_type: u32,
    wire: Option<Bytes>,
    value: Option<Bytes>,
    elements: Vec<Block>,
    parsed: bool,
}

impl Block {
    /// Create an unset block of the given type
    pub fn new(tlv_type: u32) -> Self {
        Self {
            tlv_type,
            wire: None,
            value: None,
            elements: Vec::new(),
            parsed: false,
        }
    }

    /// Create a value-only block; the outer TLV is produced by `encode`
    pub fn with_value(tlv_type: u32, value: impl Into<Bytes>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(tlv_type)
        }
    }

    /// Create an encoded block with a zero-length value
    pub fn empty(tlv_type: u32) -> Self {
        let mut block = Self::with_value(tlv_type, Bytes::new());
        block.encode();
        block
    }

    /// Create an encoded block holding a non-negative integer
    pub fn non_negative_integer(tlv_type: u32, n: u64) -> Self {
        let mut value = BytesMut::with_capacity(8);
        tlv::write_non_negative_integer(&mut value, n);
        let mut block = Self::with_value(tlv_type, value.freeze());
        block.encode();
        block
    }

    /// Create an encoded block whose value is the concatenation of `elements`
    pub fn nested(tlv_type: u32, elements: Vec<Block>) -> Self {
        let mut block = Self::new(tlv_type);
        block.elements = elements;
        block.parsed = true;
        block.encode();
        block
    }

    /// Wrap a buffer holding exactly one TLV element.
    ///
    /// Only the outer type and length are read; the value is left unparsed.
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let (block, consumed) = Self::decode_prefix(&bytes)?;
        if consumed != bytes.len() {
            return Err(TlvError::TrailingBytes(bytes.len() - consumed).into());
        }
        Ok(block)
    }

    /// Read the first TLV element of `bytes`, returning it and its size.
    ///
    /// Used to split a stream of concatenated elements.
    pub fn decode_prefix(bytes: &Bytes) -> Result<(Self, usize)> {
        let (tlv_type, value, total) = tlv::read_block(bytes, 0)?;
        let block = Self {
            tlv_type,
            wire: Some(bytes.slice(0..total)),
            value: Some(bytes.slice(value)),
            elements: Vec::new(),
            parsed: false,
        };
        Ok((block, total))
    }

    pub fn tlv_type(&self) -> u32 {
        self.tlv_type
    }

    /// Fail unless this block has the given type
    pub fn expect_type(&self, expected: u32) -> Result<()> {
        if self.tlv_type != expected {
            return Err(TlvError::UnexpectedType {
                expected,
                actual: self.tlv_type,
            }
            .into());
        }
        Ok(())
    }

    pub fn has_wire(&self) -> bool {
        self.wire.is_some()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// True unless the block is unset
    pub fn is_valid(&self) -> bool {
        self.wire.is_some() || self.value.is_some() || !self.elements.is_empty()
    }

    pub fn wire(&self) -> Result<&Bytes> {
        self.wire
            .as_ref()
            .ok_or_else(|| Error::NotFound(format!("wire of block type {}", self.tlv_type)))
    }

    pub fn value(&self) -> Result<&Bytes> {
        self.value
            .as_ref()
            .ok_or_else(|| Error::NotFound(format!("value of block type {}", self.tlv_type)))
    }

    /// Size of the complete encoding
    pub fn size(&self) -> Result<usize> {
        self.wire().map(|wire| wire.len())
    }

    pub fn value_size(&self) -> Result<usize> {
        self.value().map(|value| value.len())
    }

    /// Interpret the value as a non-negative integer
    pub fn read_non_negative_integer(&self) -> Result<u64> {
        Ok(tlv::read_non_negative_integer(self.value()?)?)
    }

    /// Split the value into sub-elements.
    ///
    /// Idempotent. Sub-elements are zero-copy slices of this block's buffer.
    /// On failure the block is left as it was.
    pub fn parse(&mut self) -> Result<()> {
        if self.parsed {
            return Ok(());
        }
        let Some(value) = self.value.as_ref() else {
            return Ok(());
        };

        let mut elements = Vec::new();
        let mut offset = 0;
        while offset < value.len() {
            let (tlv_type, range, total) = tlv::read_block(value, offset)?;
            elements.push(Block {
                tlv_type,
                wire: Some(value.slice(offset..offset + total)),
                value: Some(value.slice(range)),
                elements: Vec::new(),
                parsed: false,
            });
            offset += total;
        }

        trace!("parsed block type {} into {} elements", self.tlv_type, elements.len());
        self.elements = elements;
        self.parsed = true;
        Ok(())
    }

    /// Produce the wire encoding if it is missing and return it.
    ///
    /// The value is the raw value when one is held, otherwise the
    /// concatenation of the encoded sub-elements.
    pub fn encode(&mut self) -> Bytes {
        if let Some(wire) = &self.wire {
            return wire.clone();
        }

        let from_elements = self.value.is_none();
        let value_len = if from_elements {
            self.elements.iter_mut().map(|e| e.encode().len()).sum()
        } else {
            self.value.as_ref().map_or(0, |v| v.len())
        };

        let mut buf = BytesMut::with_capacity(tlv::tlv_size(self.tlv_type, value_len));
        tlv::write_var_number(&mut buf, self.tlv_type as u64);
        tlv::write_var_number(&mut buf, value_len as u64);
        let header = buf.len();
        if from_elements {
            for element in &self.elements {
                if let Some(wire) = &element.wire {
                    buf.put_slice(wire);
                }
            }
        } else if let Some(value) = &self.value {
            buf.put_slice(value);
        }

        trace!("encoded block type {} ({} bytes)", self.tlv_type, buf.len());
        let wire = buf.freeze();
        self.rebase(wire.clone(), header);
        wire
    }

    /// Point this block and its sub-elements at a freshly encoded buffer
    fn rebase(&mut self, wire: Bytes, header: usize) {
        let value = wire.slice(header..);
        let mut offset = 0;
        for element in &mut self.elements {
            let size = element.wire.as_ref().map_or(0, |w| w.len());
            let element_header = size - element.value.as_ref().map_or(0, |v| v.len());
            element.rebase(value.slice(offset..offset + size), element_header);
            offset += size;
        }
        self.wire = Some(wire);
        self.value = Some(value);
    }

    /// Sub-elements; empty until `parse` is called on a decoded block
    pub fn elements(&self) -> &[Block] {
        &self.elements
    }

    /// First sub-element of the given type
    pub fn find(&self, tlv_type: u32) -> Option<&Block> {
        self.elements.iter().find(|e| e.tlv_type == tlv_type)
    }

    /// First sub-element of the given type, or a lookup error
    pub fn get(&self, tlv_type: u32) -> Result<&Block> {
        self.find(tlv_type).ok_or_else(|| {
            Error::NotFound(format!(
                "element type {} in block type {}",
                tlv_type, self.tlv_type
            ))
        })
    }

    /// Append a sub-element, dropping the cached encoding.
    ///
    /// Fails without touching the block when its value is not a TLV
    /// sequence.
    pub fn push_back(&mut self, element: Block) -> Result<()> {
        self.reset_wire()?;
        self.elements.push(element);
        Ok(())
    }

    /// Remove every sub-element of the given type
    pub fn remove(&mut self, tlv_type: u32) -> Result<()> {
        self.reset_wire()?;
        self.elements.retain(|e| e.tlv_type != tlv_type);
        Ok(())
    }

    /// Remove the sub-element at `index`
    pub fn erase(&mut self, index: usize) -> Result<Block> {
        self.parse()?;
        if index >= self.elements.len() {
            return Err(Error::NotFound(format!(
                "element {} of {} in block type {}",
                index,
                self.elements.len(),
                self.tlv_type
            )));
        }
        self.reset_wire()?;
        Ok(self.elements.remove(index))
    }

    fn reset_wire(&mut self) -> Result<()> {
        self.parse()?;
        self.wire = None;
        self.value = None;
        self.parsed = true;
        Ok(())
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        match (&self.wire, &other.wire) {
            (Some(a), Some(b)) => a == b,
            _ => {
                self.tlv_type == other.tlv_type
                    && self.value == other.value
                    && self.elements == other.elements
            }
        }
    }
}

impl Eq for Block {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_block() {
        let block = Block::new(21);
        assert!(!block.is_valid());
        assert!(!block.has_wire());
        assert!(!block.has_value());
        assert!(matches!(block.wire(), Err(Error::NotFound(_))));
        assert!(matches!(block.value_size(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_value_only_block_encodes() {
        let mut block = Block::with_value(8, Bytes::from_static(b"abc"));
        assert!(block.has_value());
        assert!(!block.has_wire());

        let wire = block.encode();
        assert_eq!(&wire[..], &[8, 3, b'a', b'b', b'c']);
        assert_eq!(block.size().unwrap(), 5);
        assert_eq!(block.value_size().unwrap(), 3);
    }

    #[test]
    fn test_empty_block() {
        let block = Block::empty(18);
        assert_eq!(&block.wire().unwrap()[..], &[18, 0]);
        assert_eq!(block.value_size().unwrap(), 0);
    }

    #[test]
    fn test_from_bytes_rejects_trailing() {
        let bytes = Bytes::from_static(&[8, 1, b'a', 0]);
        assert!(matches!(
            Block::from_bytes(bytes),
            Err(Error::Decode(TlvError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn test_decode_prefix_splits_stream() {
        let bytes = Bytes::from_static(&[8, 1, b'a', 8, 2, b'b', b'c']);
        let (first, consumed) = Block::decode_prefix(&bytes).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(&first.value().unwrap()[..], b"a");

        let rest = bytes.slice(consumed..);
        let (second, consumed) = Block::decode_prefix(&rest).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(&second.value().unwrap()[..], b"bc");
    }

    #[test]
    fn test_parse_is_zero_copy() {
        let bytes = Bytes::from_static(&[7, 6, 8, 1, b'a', 8, 1, b'b']);
        let mut block = Block::from_bytes(bytes.clone()).unwrap();
        block.parse().unwrap();
        block.parse().unwrap();

        assert_eq!(block.elements().len(), 2);
        let first = &block.elements()[0];
        assert_eq!(first.tlv_type(), 8);
        assert_eq!(first.wire().unwrap().as_ptr(), bytes[2..].as_ptr());
        assert_eq!(first.value().unwrap().as_ptr(), bytes[4..].as_ptr());
    }

    #[test]
    fn test_parse_failure_leaves_block_untouched() {
        let bytes = Bytes::from_static(&[7, 3, 8, 5, b'a']);
        let mut block = Block::from_bytes(bytes).unwrap();
        assert!(block.parse().is_err());
        assert!(block.elements().is_empty());
        assert!(block.has_wire());
        assert!(block.parse().is_err());
    }

    #[test]
    fn test_get_and_find() {
        let mut block = Block::from_bytes(Bytes::from_static(&[6, 4, 7, 0, 21, 0])).unwrap();
        block.parse().unwrap();
        assert!(block.find(21).is_some());
        assert!(block.find(22).is_none());
        assert!(matches!(block.get(22), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_mutation_invalidates_and_reencodes() {
        let mut block = Block::from_bytes(Bytes::from_static(&[7, 3, 8, 1, b'a'])).unwrap();
        block.parse().unwrap();

        block
            .push_back(Block::with_value(8, Bytes::from_static(b"b")))
            .unwrap();
        assert!(!block.has_wire());
        assert!(!block.has_value());

        let wire = block.encode();
        assert_eq!(&wire[..], &[7, 6, 8, 1, b'a', 8, 1, b'b']);
        assert_eq!(&block.elements()[1].wire().unwrap()[..], &[8, 1, b'b']);
        assert_eq!(block.elements()[1].wire().unwrap().as_ptr(), wire[5..].as_ptr());

        block.remove(8).unwrap();
        assert_eq!(&block.encode()[..], &[7, 0]);
    }

    #[test]
    fn test_mutation_of_opaque_value_fails() {
        let mut block = Block::with_value(21, Bytes::from_static(b"hello"));
        assert!(matches!(
            block.push_back(Block::with_value(8, Bytes::from_static(b"x"))),
            Err(Error::Decode(_))
        ));
        assert!(block.remove(8).is_err());
        assert!(block.erase(0).is_err());

        assert_eq!(&block.value().unwrap()[..], b"hello");
        assert_eq!(&block.encode()[..], &[21, 5, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn test_mutation_parses_decoded_block_first() {
        let mut block = Block::from_bytes(Bytes::from_static(&[7, 3, 8, 1, b'a'])).unwrap();
        block.push_back(Block::empty(8)).unwrap();
        assert_eq!(block.elements().len(), 2);
        assert_eq!(&block.encode()[..], &[7, 5, 8, 1, b'a', 8, 0]);
    }

    #[test]
    fn test_erase_out_of_range() {
        let mut block = Block::nested(7, vec![Block::empty(8)]);
        assert!(block.erase(1).is_err());
        assert_eq!(block.erase(0).unwrap().tlv_type(), 8);
        assert!(block.elements().is_empty());
    }

    #[test]
    fn test_nested_and_integer_blocks() {
        let block = Block::nested(
            9,
            vec![Block::non_negative_integer(13, 2), Block::empty(18)],
        );
        assert_eq!(&block.wire().unwrap()[..], &[9, 5, 13, 1, 2, 18, 0]);
        assert_eq!(block.find(13).unwrap().read_non_negative_integer().unwrap(), 2);
    }

    #[test]
    fn test_large_lengths() {
        for len in [252usize, 253, 0x1_0000] {
            let mut block = Block::with_value(21, vec![0x5A; len]);
            let wire = block.encode();
            let decoded = Block::from_bytes(wire).unwrap();
            assert_eq!(decoded.value_size().unwrap(), len);
            assert_eq!(decoded, block);
        }
    }

    #[test]
    fn test_equality_without_wire() {
        let a = Block::with_value(8, Bytes::from_static(b"x"));
        let mut b = Block::with_value(8, Bytes::from_static(b"x"));
        assert_eq!(a, b);
        b.encode();
        assert_eq!(a, b);
        assert_ne!(a, Block::with_value(8, Bytes::from_static(b"y")));
    }
}
