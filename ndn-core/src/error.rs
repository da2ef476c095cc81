//! Error types for the NDN packet core.

use crate::tlv::TlvError;

/// All errors surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed wire encoding.
    #[error("Decode error: {0}")]
    Decode(#[from] TlvError),

    /// A requested element, component or entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The text form of a name or component could not be parsed.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// An Exclude range or raw entry sequence is out of order.
    #[error("Invalid exclude: {0}")]
    InvalidExclude(String),

    /// A Data packet was encoded before its signature value was set.
    #[error("Data packet has no signature value")]
    Unsigned,

    /// A name component violates its type's constraints.
    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    /// A packet field was given a value outside its allowed range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The content store could not keep its capacity invariant.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
