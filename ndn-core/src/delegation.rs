//! Forwarding hint: a preference-ordered list of delegation names.

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::tlv::{self, tlv_types};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delegation {
    pub preference: u64,
    pub name: Name,
}

impl Delegation {
    fn value_len(&self) -> usize {
        tlv::non_negative_integer_tlv_size(tlv_types::LINK_PREFERENCE, self.preference)
            + self.name.encoded_len()
    }

    fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let mut written = tlv::write_var_number(sink, tlv_types::LINK_DELEGATION as u64);
        written += tlv::write_var_number(sink, self.value_len() as u64);
        written += tlv::write_non_negative_integer_tlv(sink, tlv_types::LINK_PREFERENCE, self.preference);
        written += self.name.encode_to(sink);
        written
    }

    fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::LINK_DELEGATION)?;
        let mut block = block.clone();
        block.parse()?;
        let preference = block.get(tlv_types::LINK_PREFERENCE)?.read_non_negative_integer()?;
        let name = Name::wire_decode(block.get(tlv_types::NAME)?)?;
        Ok(Self { preference, name })
    }
}

/// Delegations sorted by preference, then by name. A name appears at most
/// once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DelegationList {
    delegations: Vec<Delegation>,
}

impl DelegationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.delegations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Delegation> {
        self.delegations.iter()
    }

    /// Add a delegation, replacing any existing one with the same name
    pub fn insert(&mut self, preference: u64, name: Name) -> &mut Self {
        self.delegations.retain(|d| d.name != name);
        let delegation = Delegation { preference, name };
        let at = self.delegations.partition_point(|d| *d < delegation);
        self.delegations.insert(at, delegation);
        self
    }

    /// Remove the delegation for `name`, returning whether one existed
    pub fn remove(&mut self, name: &Name) -> bool {
        let before = self.delegations.len();
        self.delegations.retain(|d| &d.name != name);
        before != self.delegations.len()
    }

    fn value_len(&self) -> usize {
        self.delegations
            .iter()
            .map(|d| tlv::tlv_size(tlv_types::LINK_DELEGATION, d.value_len()))
            .sum()
    }

    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(tlv_types::FORWARDING_HINT, self.value_len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let mut written = tlv::write_var_number(sink, tlv_types::FORWARDING_HINT as u64);
        written += tlv::write_var_number(sink, self.value_len() as u64);
        for delegation in &self.delegations {
            written += delegation.encode_to(sink);
        }
        written
    }

    pub fn wire_encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::FORWARDING_HINT)?;
        let mut block = block.clone();
        block.parse()?;
        if block.elements().is_empty() {
            return Err(Error::NotFound("delegation in ForwardingHint".into()));
        }

        let mut list = Self::new();
        for element in block.elements() {
            let delegation = Delegation::wire_decode(element)?;
            list.insert(delegation.preference, delegation.name);
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a DelegationList {
    type Item = &'a Delegation;
    type IntoIter = std::slice::Iter<'a, Delegation>;

    fn into_iter(self) -> Self::IntoIter {
        self.delegations.iter()
    }
}
