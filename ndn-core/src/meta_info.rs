use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::component::Component;
use crate::error::{Error, Result};
use crate::tlv::{self, tlv_types};

/// Content type for Data packets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[default]
    Blob,
    Link,
    Key,
    Nack,
    Other(u64),
}

impl ContentType {
    pub fn to_u64(self) -> u64 {
        match self {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
            ContentType::Other(value) => value,
        }
    }
}

impl From<u64> for ContentType {
    fn from(value: u64) -> Self {
        match value {
            0 => ContentType::Blob,
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            other => ContentType::Other(other),
        }
    }
}

/// MetaInfo for Data packets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInfo {
    content_type: ContentType,
    freshness_period: Option<Duration>,
    final_block_id: Option<Component>,
    app_meta_info: Vec<Block>,
}

impl MetaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = content_type;
        self
    }

    pub fn freshness_period(&self) -> Option<Duration> {
        self.freshness_period
    }

    pub fn set_freshness_period(&mut self, period: Option<Duration>) -> &mut Self {
        self.freshness_period = period;
        self
    }

    pub fn final_block_id(&self) -> Option<&Component> {
        self.final_block_id.as_ref()
    }

    pub fn set_final_block_id(&mut self, id: Option<Component>) -> &mut Self {
        self.final_block_id = id;
        self
    }

    /// Application-defined elements, in insertion order
    pub fn app_meta_info(&self) -> &[Block] {
        &self.app_meta_info
    }

    /// Add an application element; its type must be in 128..=252
    pub fn add_app_meta_info(&mut self, mut block: Block) -> Result<&mut Self> {
        let tlv_type = block.tlv_type();
        if !(tlv_types::APP_META_INFO_MIN..=tlv_types::APP_META_INFO_MAX).contains(&tlv_type) {
            return Err(Error::InvalidArgument(format!(
                "AppMetaInfo type {} outside {}..={}",
                tlv_type,
                tlv_types::APP_META_INFO_MIN,
                tlv_types::APP_META_INFO_MAX
            )));
        }
        block.encode();
        self.app_meta_info.push(block);
        Ok(self)
    }

    /// Remove the first application element of `tlv_type`
    pub fn remove_app_meta_info(&mut self, tlv_type: u32) -> bool {
        match self.app_meta_info.iter().position(|b| b.tlv_type() == tlv_type) {
            Some(index) => {
                self.app_meta_info.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn find_app_meta_info(&self, tlv_type: u32) -> Option<&Block> {
        self.app_meta_info.iter().find(|b| b.tlv_type() == tlv_type)
    }

    fn value_len(&self) -> usize {
        let mut len = 0;
        if self.content_type != ContentType::Blob {
            len += tlv::non_negative_integer_tlv_size(
                tlv_types::CONTENT_TYPE,
                self.content_type.to_u64(),
            );
        }
        if let Some(period) = self.freshness_period {
            len += tlv::non_negative_integer_tlv_size(
                tlv_types::FRESHNESS_PERIOD,
                period.as_millis() as u64,
            );
        }
        if let Some(id) = &self.final_block_id {
            len += tlv::tlv_size(tlv_types::FINAL_BLOCK_ID, id.encoded_len());
        }
        len + self
            .app_meta_info
            .iter()
            .map(|b| b.size().unwrap_or(0))
            .sum::<usize>()
    }

    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(tlv_types::META_INFO, self.value_len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let mut written = tlv::write_var_number(sink, tlv_types::META_INFO as u64);
        written += tlv::write_var_number(sink, self.value_len() as u64);
        if self.content_type != ContentType::Blob {
            written += tlv::write_non_negative_integer_tlv(
                sink,
                tlv_types::CONTENT_TYPE,
                self.content_type.to_u64(),
            );
        }
        if let Some(period) = self.freshness_period {
            written += tlv::write_non_negative_integer_tlv(
                sink,
                tlv_types::FRESHNESS_PERIOD,
                period.as_millis() as u64,
            );
        }
        if let Some(id) = &self.final_block_id {
            written += tlv::write_var_number(sink, tlv_types::FINAL_BLOCK_ID as u64);
            written += tlv::write_var_number(sink, id.encoded_len() as u64);
            written += id.encode_to(sink);
        }
        for block in &self.app_meta_info {
            if let Ok(wire) = block.wire() {
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

    /// Decode a MetaInfo block. Unrecognised elements outside the
    /// application range are skipped.
    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::META_INFO)?;
        let mut block = block.clone();
        block.parse()?;

        let mut meta_info = MetaInfo::new();
        for element in block.elements() {
            match element.tlv_type() {
                tlv_types::CONTENT_TYPE => {
                    meta_info.content_type = element.read_non_negative_integer()?.into();
                }
                tlv_types::FRESHNESS_PERIOD => {
                    let millis = element.read_non_negative_integer()?;
                    meta_info.freshness_period = Some(Duration::from_millis(millis));
                }
                tlv_types::FINAL_BLOCK_ID => {
                    let mut id = element.clone();
                    id.parse()?;
                    let component = id
                        .elements()
                        .first()
                        .ok_or_else(|| Error::NotFound("component in FinalBlockId".into()))?;
                    meta_info.final_block_id = Some(Component::from_block(component)?);
                }
                tlv_types::APP_META_INFO_MIN..=tlv_types::APP_META_INFO_MAX => {
                    meta_info.app_meta_info.push(element.clone());
                }
                _ => {}
            }
        }
        Ok(meta_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_meta_info_is_empty() {
        let meta_info = MetaInfo::new();
        assert_eq!(meta_info.content_type(), ContentType::Blob);
        assert_eq!(&meta_info.wire_encode()[..], &[20, 0]);
    }

    #[test]
    fn test_meta_info_round_trip() {
        let mut meta_info = MetaInfo::new();
        meta_info
            .set_content_type(ContentType::Key)
            .set_freshness_period(Some(Duration::from_secs(10)))
            .set_final_block_id(Some(Component::from_segment(9)));
        meta_info
            .add_app_meta_info(Block::with_value(128, Bytes::from_static(b"app")))
            .unwrap();

        let wire = meta_info.wire_encode();
        assert_eq!(wire.len(), meta_info.encoded_len());
        let decoded = MetaInfo::wire_decode(&Block::from_bytes(wire).unwrap()).unwrap();
        assert_eq!(decoded, meta_info);
        assert_eq!(decoded.freshness_period(), Some(Duration::from_millis(10_000)));
        assert_eq!(decoded.final_block_id().unwrap().to_segment().unwrap(), 9);
        assert_eq!(
            decoded.find_app_meta_info(128).unwrap().value().unwrap(),
            &Bytes::from_static(b"app")
        );
    }

    #[test]
    fn test_app_meta_info_range() {
        let mut meta_info = MetaInfo::new();
        assert!(matches!(
            meta_info.add_app_meta_info(Block::empty(127)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(meta_info.add_app_meta_info(Block::empty(253)).is_err());
        meta_info.add_app_meta_info(Block::empty(252)).unwrap();
        assert!(meta_info.remove_app_meta_info(252));
        assert!(!meta_info.remove_app_meta_info(252));
    }

    #[test]
    fn test_content_type_values() {
        assert_eq!(ContentType::from(3), ContentType::Nack);
        assert_eq!(ContentType::from(42), ContentType::Other(42));
        assert_eq!(ContentType::Other(42).to_u64(), 42);
        assert_eq!(ContentType::Link.to_u64(), 1);
    }

    #[test]
    fn test_unknown_elements_skipped() {
        let block = Block::from_bytes(Bytes::from_static(&[20, 5, 24, 1, 2, 99, 0])).unwrap();
        let meta_info = MetaInfo::wire_decode(&block).unwrap();
        assert_eq!(meta_info.content_type(), ContentType::Key);
        assert!(meta_info.app_meta_info().is_empty());
    }
}
