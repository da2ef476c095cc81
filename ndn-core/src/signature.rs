use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::error::Result;
use crate::key_locator::KeyLocator;
use crate::tlv::{self, tlv_types};

/// Signature types known to the NDN packet format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SignatureType {
    /// SHA256 digest only (no key)
    #[default]
    DigestSha256,
    Sha256WithRsa,
    Sha256WithEcdsa,
    HmacWithSha256,
    Other(u64),
}

impl SignatureType {
    pub fn to_u64(self) -> u64 {
        match self {
            SignatureType::DigestSha256 => 0,
            SignatureType::Sha256WithRsa => 1,
            SignatureType::Sha256WithEcdsa => 3,
            SignatureType::HmacWithSha256 => 4,
            SignatureType::Other(value) => value,
        }
    }
}

impl From<u64> for SignatureType {
    fn from(value: u64) -> Self {
        match value {
            0 => SignatureType::DigestSha256,
            1 => SignatureType::Sha256WithRsa,
            3 => SignatureType::Sha256WithEcdsa,
            4 => SignatureType::HmacWithSha256,
            other => SignatureType::Other(other),
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureType::DigestSha256 => write!(f, "DigestSha256"),
            SignatureType::Sha256WithRsa => write!(f, "SignatureSha256WithRsa"),
            SignatureType::Sha256WithEcdsa => write!(f, "SignatureSha256WithEcdsa"),
            SignatureType::HmacWithSha256 => write!(f, "SignatureHmacWithSha256"),
            SignatureType::Other(value) => write!(f, "Unknown({})", value),
        }
    }
}

/// Signature information
///
/// Elements other than SignatureType and KeyLocator are kept as opaque
/// blocks so that re-encoding a decoded packet is lossless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureInfo {
    signature_type: SignatureType,
    key_locator: Option<KeyLocator>,
    other_fields: Vec<Block>,
}

impl SignatureInfo {
    pub fn new(signature_type: SignatureType) -> Self {
        Self {
            signature_type,
            ..Self::default()
        }
    }

    pub fn with_key_locator(mut self, key_locator: KeyLocator) -> Self {
        self.key_locator = Some(key_locator);
        self
    }

    pub fn signature_type(&self) -> SignatureType {
        self.signature_type
    }

    pub fn set_signature_type(&mut self, signature_type: SignatureType) -> &mut Self {
        self.signature_type = signature_type;
        self
    }

    pub fn key_locator(&self) -> Option<&KeyLocator> {
        self.key_locator.as_ref()
    }

    pub fn set_key_locator(&mut self, key_locator: Option<KeyLocator>) -> &mut Self {
        self.key_locator = key_locator;
        self
    }

    pub fn other_fields(&self) -> &[Block] {
        &self.other_fields
    }

    fn value_len(&self) -> usize {
        let mut len =
            tlv::non_negative_integer_tlv_size(tlv_types::SIGNATURE_TYPE, self.signature_type.to_u64());
        if let Some(locator) = &self.key_locator {
            len += locator.encoded_len();
        }
        len + self
            .other_fields
            .iter()
            .map(|b| b.size().unwrap_or(0))
            .sum::<usize>()
    }

    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(tlv_types::SIGNATURE_INFO, self.value_len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let mut written = tlv::write_var_number(sink, tlv_types::SIGNATURE_INFO as u64);
        written += tlv::write_var_number(sink, self.value_len() as u64);
        written += tlv::write_non_negative_integer_tlv(
            sink,
            tlv_types::SIGNATURE_TYPE,
            self.signature_type.to_u64(),
        );
        if let Some(locator) = &self.key_locator {
            written += locator.encode_to(sink);
        }
        for field in &self.other_fields {
            if let Ok(wire) = field.wire() {
                sink.put_slice(wire);
                written += wire.len();
            }
        }
        written
    }

    pub fn wire_encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::SIGNATURE_INFO)?;
        let mut block = block.clone();
        block.parse()?;

        let signature_type = block
            .get(tlv_types::SIGNATURE_TYPE)?
            .read_non_negative_integer()?
            .into();
        let mut info = SignatureInfo::new(signature_type);
        for element in block.elements() {
            match element.tlv_type() {
                tlv_types::SIGNATURE_TYPE => {}
                tlv_types::KEY_LOCATOR => {
                    info.key_locator = Some(KeyLocator::wire_decode(element)?);
                }
                _ => info.other_fields.push(element.clone()),
            }
        }
        Ok(info)
    }
}

/// SignatureInfo plus the signature bits. A signer fills `value` over
/// `Data::signed_portion`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    info: SignatureInfo,
    value: Option<Bytes>,
}

impl Signature {
    pub fn new(info: SignatureInfo) -> Self {
        Self { info, value: None }
    }

    pub fn info(&self) -> &SignatureInfo {
        &self.info
    }

    pub fn value(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: impl Into<Bytes>) {
        self.value = Some(value.into());
    }

    pub fn signature_type(&self) -> SignatureType {
        self.info.signature_type()
    }

    pub fn key_locator(&self) -> Option<&KeyLocator> {
        self.info.key_locator()
    }
}
