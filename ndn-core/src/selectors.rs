use std::sync::OnceLock;

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::error::Result;
use crate::exclude::Exclude;
use crate::key_locator::KeyLocator;
use crate::tlv::{self, tlv_types};

/// Which child an Interest prefers when several Data match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChildSelector {
    #[default]
    Leftmost,
    Rightmost,
}

impl ChildSelector {
    pub fn to_u64(self) -> u64 {
        match self {
            ChildSelector::Leftmost => 0,
            ChildSelector::Rightmost => 1,
        }
    }
}

impl From<u64> for ChildSelector {
    fn from(value: u64) -> Self {
        if value == 0 {
            ChildSelector::Leftmost
        } else {
            ChildSelector::Rightmost
        }
    }
}

/// Selectors for Interest packets.
///
/// Every field is optional. The wire encoding is cached and dropped by every
/// setter.
#[derive(Debug, Clone, Default)]
pub struct Selectors {
    min_suffix_components: Option<u64>,
    max_suffix_components: Option<u64>,
    publisher_public_key_locator: Option<KeyLocator>,
    exclude: Exclude,
    child_selector: Option<ChildSelector>,
    must_be_fresh: bool,
    wire: OnceLock<Bytes>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no selector is set
    pub fn is_empty(&self) -> bool {
        self.min_suffix_components.is_none()
            && self.max_suffix_components.is_none()
            && self.publisher_public_key_locator.is_none()
            && self.exclude.is_empty()
            && self.child_selector.is_none()
            && !self.must_be_fresh
    }

    pub fn min_suffix_components(&self) -> Option<u64> {
        self.min_suffix_components
    }

    pub fn set_min_suffix_components(&mut self, value: Option<u64>) -> &mut Self {
        self.min_suffix_components = value;
        self.reset_wire()
    }

    pub fn max_suffix_components(&self) -> Option<u64> {
        self.max_suffix_components
    }

    pub fn set_max_suffix_components(&mut self, value: Option<u64>) -> &mut Self {
        self.max_suffix_components = value;
        self.reset_wire()
    }

    pub fn publisher_public_key_locator(&self) -> Option<&KeyLocator> {
        self.publisher_public_key_locator.as_ref()
    }

    pub fn set_publisher_public_key_locator(&mut self, value: Option<KeyLocator>) -> &mut Self {
        self.publisher_public_key_locator = value;
        self.reset_wire()
    }

    pub fn exclude(&self) -> &Exclude {
        &self.exclude
    }

    pub fn set_exclude(&mut self, exclude: Exclude) -> &mut Self {
        self.exclude = exclude;
        self.reset_wire()
    }

    /// Effective child selector; unset means leftmost
    pub fn child_selector(&self) -> ChildSelector {
        self.child_selector.unwrap_or_default()
    }

    pub fn has_child_selector(&self) -> bool {
        self.child_selector.is_some()
    }

    pub fn set_child_selector(&mut self, value: Option<ChildSelector>) -> &mut Self {
        self.child_selector = value;
        self.reset_wire()
    }

    pub fn must_be_fresh(&self) -> bool {
        self.must_be_fresh
    }

    pub fn set_must_be_fresh(&mut self, value: bool) -> &mut Self {
        self.must_be_fresh = value;
        self.reset_wire()
    }

    fn reset_wire(&mut self) -> &mut Self {
        self.wire = OnceLock::new();
        self
    }

    fn encode_value<B: BufMut>(&self, sink: &mut B) {
        if let Some(min) = self.min_suffix_components {
            tlv::write_non_negative_integer_tlv(sink, tlv_types::MIN_SUFFIX_COMPONENTS, min);
        }
        if let Some(max) = self.max_suffix_components {
            tlv::write_non_negative_integer_tlv(sink, tlv_types::MAX_SUFFIX_COMPONENTS, max);
        }
        if let Some(locator) = &self.publisher_public_key_locator {
            tlv::write_var_number(sink, tlv_types::PUBLISHER_PUBLIC_KEY_LOCATOR as u64);
            tlv::write_var_number(sink, locator.encoded_len() as u64);
            locator.encode_to(sink);
        }
        if !self.exclude.is_empty() {
            self.exclude.encode_to(sink);
        }
        if let Some(child) = self.child_selector {
            tlv::write_non_negative_integer_tlv(sink, tlv_types::CHILD_SELECTOR, child.to_u64());
        }
        if self.must_be_fresh {
            tlv::write_tlv(sink, tlv_types::MUST_BE_FRESH, &[]);
        }
    }

    /// Encode to a Selectors TLV, reusing the cached encoding
    pub fn wire_encode(&self) -> Bytes {
        if let Some(wire) = self.wire.get() {
            return wire.clone();
        }

        let mut value = BytesMut::new();
        self.encode_value(&mut value);
        let mut buf = BytesMut::with_capacity(tlv::tlv_size(tlv_types::SELECTORS, value.len()));
        tlv::write_tlv(&mut buf, tlv_types::SELECTORS, &value);
        let wire = buf.freeze();
        self.wire.get_or_init(|| wire).clone()
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::SELECTORS)?;
        let mut block = block.clone();
        block.parse()?;

        let mut selectors = Selectors::new();
        if let Some(min) = block.find(tlv_types::MIN_SUFFIX_COMPONENTS) {
            selectors.min_suffix_components = Some(min.read_non_negative_integer()?);
        }
        if let Some(max) = block.find(tlv_types::MAX_SUFFIX_COMPONENTS) {
            selectors.max_suffix_components = Some(max.read_non_negative_integer()?);
        }
        if let Some(publisher) = block.find(tlv_types::PUBLISHER_PUBLIC_KEY_LOCATOR) {
            let mut publisher = publisher.clone();
            publisher.parse()?;
            let locator = publisher.get(tlv_types::KEY_LOCATOR)?;
            selectors.publisher_public_key_locator = Some(KeyLocator::wire_decode(locator)?);
        }
        if let Some(exclude) = block.find(tlv_types::EXCLUDE) {
            selectors.exclude = Exclude::wire_decode(exclude)?;
        }
        if let Some(child) = block.find(tlv_types::CHILD_SELECTOR) {
            selectors.child_selector = Some(ChildSelector::from(child.read_non_negative_integer()?));
        }
        selectors.must_be_fresh = block.find(tlv_types::MUST_BE_FRESH).is_some();

        if let Ok(wire) = block.wire() {
            let _ = selectors.wire.set(wire.clone());
        }
        Ok(selectors)
    }
}

impl PartialEq for Selectors {
    fn eq(&self, other: &Self) -> bool {
        self.min_suffix_components == other.min_suffix_components
            && self.max_suffix_components == other.max_suffix_components
            && self.publisher_public_key_locator == other.publisher_public_key_locator
            && self.exclude == other.exclude
            && self.child_selector == other.child_selector
            && self.must_be_fresh == other.must_be_fresh
    }
}

impl Eq for Selectors {}
