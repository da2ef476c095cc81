use bytes::Bytes;

use crate::block::Block;
use crate::data::Data;
use crate::error::Result;
use crate::interest::Interest;
use crate::name::Name;
use crate::tlv::{tlv_types, TlvError};

/// An NDN network-layer packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
}

impl Packet {
    /// Decode a buffer holding one Interest or Data TLV
    pub fn from_wire(bytes: Bytes) -> Result<Self> {
        Self::wire_decode(&Block::from_bytes(bytes)?)
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        match block.tlv_type() {
            tlv_types::INTEREST => Ok(Packet::Interest(Interest::wire_decode(block)?)),
            tlv_types::DATA => Ok(Packet::Data(Data::wire_decode(block)?)),
            other => Err(TlvError::Malformed(format!("not an Interest or Data packet: type {}", other)).into()),
        }
    }

    pub fn wire_encode(&self) -> Result<Bytes> {
        match self {
            Packet::Interest(interest) => Ok(interest.wire_encode()),
            Packet::Data(data) => data.wire_encode(),
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            Packet::Interest(interest) => interest.name(),
            Packet::Data(data) => data.name(),
        }
    }

    pub fn is_interest(&self) -> bool {
        matches!(self, Packet::Interest(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Packet::Data(_))
    }
}

impl From<Interest> for Packet {
    fn from(interest: Interest) -> Self {
        Packet::Interest(interest)
    }
}

impl From<Data> for Packet {
    fn from(data: Data) -> Self {
        Packet::Data(data)
    }
}
