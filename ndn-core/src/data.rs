//! Data packet.
//!
//! Encoding needs a signature value; the signer fills it in over
//! [`Data::signed_portion`]. The full name (name plus implicit SHA-256 digest
//! of the wire encoding) is computed on demand and cached together with the
//! wire until the next setter call.

use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};

use crate::block::Block;
use crate::component::{Component, SHA256_DIGEST_SIZE};
use crate::error::{Error, Result};
use crate::meta_info::{ContentType, MetaInfo};
use crate::name::Name;
use crate::signature::{Signature, SignatureInfo};
use crate::tlv::{self, tlv_types};

/// Data packet structure
#[derive(Debug, Clone)]
pub struct Data {
    name: Name,
    meta_info: MetaInfo,
    content: Block,
    signature: Signature,
    wire: OnceLock<Bytes>,
    full_name: OnceLock<Name>,
}

impl Default for Data {
    fn default() -> Self {
        Self::new(Name::new(), Bytes::new())
    }
}

impl Data {
    /// Create a new Data packet with the given name and content
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            meta_info: MetaInfo::new(),
            content: Self::make_content(content.into()),
            signature: Signature::default(),
            wire: OnceLock::new(),
            full_name: OnceLock::new(),
        }
    }

    fn make_content(content: Bytes) -> Block {
        let mut block = Block::with_value(tlv_types::CONTENT, content);
        block.encode();
        block
    }

    pub fn with_meta_info(mut self, meta_info: MetaInfo) -> Self {
        self.set_meta_info(meta_info);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.set_content_type(content_type);
        self
    }

    pub fn with_freshness_period(mut self, period: Duration) -> Self {
        self.set_freshness_period(Some(period));
        self
    }

    pub fn with_final_block_id(mut self, id: Component) -> Self {
        self.set_final_block_id(Some(id));
        self
    }

    pub fn with_signature_info(mut self, info: SignatureInfo) -> Self {
        self.set_signature_info(info);
        self
    }

    pub fn with_signature_value(mut self, value: impl Into<Bytes>) -> Self {
        self.set_signature_value(value);
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name = name;
        self.reset_wire()
    }

    pub fn meta_info(&self) -> &MetaInfo {
        &self.meta_info
    }

    pub fn set_meta_info(&mut self, meta_info: MetaInfo) -> &mut Self {
        self.meta_info = meta_info;
        self.reset_wire()
    }

    pub fn content_type(&self) -> ContentType {
        self.meta_info.content_type()
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.meta_info.set_content_type(content_type);
        self.reset_wire()
    }

    pub fn freshness_period(&self) -> Option<Duration> {
        self.meta_info.freshness_period()
    }

    pub fn set_freshness_period(&mut self, period: Option<Duration>) -> &mut Self {
        self.meta_info.set_freshness_period(period);
        self.reset_wire()
    }

    pub fn final_block_id(&self) -> Option<&Component> {
        self.meta_info.final_block_id()
    }

    pub fn set_final_block_id(&mut self, id: Option<Component>) -> &mut Self {
        self.meta_info.set_final_block_id(id);
        self.reset_wire()
    }

    /// Content bytes (the value of the Content element)
    pub fn content(&self) -> &[u8] {
        self.content.value().map_or(&[][..], |v| &v[..])
    }

    /// The Content element itself
    pub fn content_block(&self) -> &Block {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<Bytes>) -> &mut Self {
        self.content = Self::make_content(content.into());
        self.reset_wire()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn signature_info(&self) -> &SignatureInfo {
        self.signature.info()
    }

    /// Replace the SignatureInfo; any signature value no longer applies and
    /// is dropped.
    pub fn set_signature_info(&mut self, info: SignatureInfo) -> &mut Self {
        self.signature = Signature::new(info);
        self.reset_wire()
    }

    pub fn signature_value(&self) -> Option<&Bytes> {
        self.signature.value()
    }

    pub fn set_signature_value(&mut self, value: impl Into<Bytes>) -> &mut Self {
        self.signature.set_value(value);
        self.reset_wire()
    }

    fn reset_wire(&mut self) -> &mut Self {
        self.wire = OnceLock::new();
        self.full_name = OnceLock::new();
        self
    }

    /// Check whether the Data is still fresh at `now`, given when it was
    /// received. Without a FreshnessPeriod it is stale right away.
    pub fn is_fresh(&self, received_at: Instant, now: Instant) -> bool {
        match self.freshness_period() {
            Some(period) => now.saturating_duration_since(received_at) < period,
            None => false,
        }
    }

    /// Bytes covered by the signature: Name, MetaInfo, Content and
    /// SignatureInfo elements, concatenated.
    pub fn signed_portion(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.signed_portion_len());
        self.encode_signed_portion(&mut buf);
        buf.freeze()
    }

    fn signed_portion_len(&self) -> usize {
        self.name.encoded_len()
            + self.meta_info.encoded_len()
            + self.content.size().unwrap_or(0)
            + self.signature.info().encoded_len()
    }

    fn encode_signed_portion<B: BufMut>(&self, sink: &mut B) {
        self.name.encode_to(sink);
        self.meta_info.encode_to(sink);
        if let Ok(content) = self.content.wire() {
            sink.put_slice(content);
        }
        self.signature.info().encode_to(sink);
    }

    /// Encode to a Data TLV, reusing the cached encoding
    pub fn wire_encode(&self) -> Result<Bytes> {
        if let Some(wire) = self.wire.get() {
            return Ok(wire.clone());
        }
        let value = self.signature.value().ok_or(Error::Unsigned)?;

        let value_len = self.signed_portion_len() + tlv::tlv_size(tlv_types::SIGNATURE_VALUE, value.len());
        let mut buf = BytesMut::with_capacity(tlv::tlv_size(tlv_types::DATA, value_len));
        tlv::write_var_number(&mut buf, tlv_types::DATA as u64);
        tlv::write_var_number(&mut buf, value_len as u64);
        self.encode_signed_portion(&mut buf);
        tlv::write_tlv(&mut buf, tlv_types::SIGNATURE_VALUE, value);

        let wire = buf.freeze();
        Ok(self.wire.get_or_init(|| wire).clone())
    }

    /// SHA-256 of the full wire encoding
    pub fn implicit_digest(&self) -> Result<[u8; SHA256_DIGEST_SIZE]> {
        let wire = self.wire_encode()?;
        Ok(Sha256::digest(&wire).into())
    }

    /// Name with the implicit digest appended
    pub fn full_name(&self) -> Result<&Name> {
        if let Some(full_name) = self.full_name.get() {
            return Ok(full_name);
        }
        let digest = self.implicit_digest()?;
        let mut full_name = self.name.clone();
        full_name.append(Component::from_sha256_digest(digest));
        Ok(self.full_name.get_or_init(|| full_name))
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::DATA)?;
        let mut block = block.clone();
        block.parse()?;

        let name = Name::wire_decode(block.get(tlv_types::NAME)?)?;
        let meta_info = match block.find(tlv_types::META_INFO) {
            Some(element) => MetaInfo::wire_decode(element)?,
            None => MetaInfo::new(),
        };
        let content = match block.find(tlv_types::CONTENT) {
            Some(element) => element.clone(),
            None => Self::make_content(Bytes::new()),
        };
        let info = SignatureInfo::wire_decode(block.get(tlv_types::SIGNATURE_INFO)?)?;
        let value = block.get(tlv_types::SIGNATURE_VALUE)?.value()?.clone();

        let mut signature = Signature::new(info);
        signature.set_value(value);
        let data = Data {
            name,
            meta_info,
            content,
            signature,
            wire: OnceLock::new(),
            full_name: OnceLock::new(),
        };
        if let Ok(wire) = block.wire() {
            let _ = data.wire.set(wire.clone());
        }
        Ok(data)
    }

    /// Decode from a buffer holding exactly one Data TLV
    pub fn from_wire(bytes: Bytes) -> Result<Self> {
        Self::wire_decode(&Block::from_bytes(bytes)?)
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.meta_info == other.meta_info
            && self.content() == other.content()
            && self.signature == other.signature
    }
}

impl Eq for Data {}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        write!(f, "MetaInfo: [ContentType: {}", self.content_type().to_u64())?;
        if let Some(period) = self.freshness_period() {
            write!(f, ", FreshnessPeriod: {} milliseconds", period.as_millis())?;
        }
        if let Some(id) = self.final_block_id() {
            write!(f, ", FinalBlockId: {}", id)?;
        }
        writeln!(f, "]")?;
        writeln!(f, "Content: (size: {})", self.content().len())?;
        writeln!(
            f,
            "Signature: (type: {}, value_length: {})",
            self.signature.signature_type(),
            self.signature.value().map_or(0, |v| v.len())
        )
    }
}
