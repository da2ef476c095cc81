use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::tlv::{self, tlv_types, TlvError};

/// Key locator for signatures
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyLocator {
    Name(Name),
    KeyDigest(Bytes),
}

impl KeyLocator {
    fn value_len(&self) -> usize {
        match self {
            KeyLocator::Name(name) => name.encoded_len(),
            KeyLocator::KeyDigest(digest) => tlv::tlv_size(tlv_types::KEY_DIGEST, digest.len()),
        }
    }

    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(tlv_types::KEY_LOCATOR, self.value_len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let mut written = tlv::write_var_number(sink, tlv_types::KEY_LOCATOR as u64);
        written += tlv::write_var_number(sink, self.value_len() as u64);
        written += match self {
            KeyLocator::Name(name) => name.encode_to(sink),
            KeyLocator::KeyDigest(digest) => tlv::write_tlv(sink, tlv_types::KEY_DIGEST, digest),
        };
        written
    }

    pub fn wire_encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::KEY_LOCATOR)?;
        let mut block = block.clone();
        block.parse()?;

        let inner = block
            .elements()
            .first()
            .ok_or_else(|| Error::NotFound("KeyLocator content".into()))?;
        match inner.tlv_type() {
            tlv_types::NAME => Ok(KeyLocator::Name(Name::wire_decode(inner)?)),
            tlv_types::KEY_DIGEST => Ok(KeyLocator::KeyDigest(inner.value()?.clone())),
            other => Err(TlvError::Malformed(format!("unknown KeyLocator type {}", other)).into()),
        }
    }
}

impl fmt::Display for KeyLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLocator::Name(name) => write!(f, "Name={}", name),
            KeyLocator::KeyDigest(digest) => write!(f, "KeyDigest={}", hex::encode(digest)),
        }
    }
}
