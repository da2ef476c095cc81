//! Client-side packet core for Named Data Networking: the TLV wire codec,
//! names and their canonical order, Interest and Data packets with the
//! selector matching rules, and a selector-aware in-memory content store.

pub mod block;
pub mod component;
pub mod config;
pub mod data;
pub mod delegation;
pub mod error;
pub mod exclude;
pub mod ims;
pub mod interest;
pub mod key_locator;
pub mod meta_info;
pub mod name;
pub mod packets;
pub mod selectors;
pub mod signature;
pub mod tlv;

pub use block::Block;
pub use component::Component;
pub use config::StorageConfig;
pub use data::Data;
pub use delegation::{Delegation, DelegationList};
pub use error::{Error, Result};
pub use exclude::Exclude;
pub use ims::{EvictionPolicy, InMemoryStorage, PolicyKind};
pub use interest::Interest;
pub use key_locator::KeyLocator;
pub use meta_info::{ContentType, MetaInfo};
pub use name::Name;
pub use packets::Packet;
pub use selectors::{ChildSelector, Selectors};
pub use signature::{Signature, SignatureInfo, SignatureType};
pub use tlv::TlvError;
