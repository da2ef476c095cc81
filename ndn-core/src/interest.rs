//! Interest packet.
//!
//! The nonce is drawn lazily: an Interest built without one gets a random
//! value the first time the nonce is read or the packet is encoded, and keeps
//! it from then on. The wire encoding is cached and every setter drops it.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::data::Data;
use crate::delegation::DelegationList;
use crate::error::Result;
use crate::exclude::Exclude;
use crate::key_locator::KeyLocator;
use crate::name::Name;
use crate::selectors::{ChildSelector, Selectors};
use crate::tlv::{self, tlv_types, TlvError};

/// Lifetime assumed when an Interest carries no InterestLifetime element
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

const NONCE_SIZE: usize = 4;

/// Interest packet structure
#[derive(Debug, Clone)]
pub struct Interest {
    name: Name,
    selectors: Selectors,
    nonce: OnceLock<u32>,
    lifetime: Duration,
    forwarding_hint: DelegationList,
    wire: OnceLock<Bytes>,
}

impl Default for Interest {
    fn default() -> Self {
        Self::new(Name::new())
    }
}

impl Interest {
    /// Create a new Interest with the given name
    pub fn new(name: Name) -> Self {
        Self {
            name,
            selectors: Selectors::new(),
            nonce: OnceLock::new(),
            lifetime: DEFAULT_INTEREST_LIFETIME,
            forwarding_hint: DelegationList::new(),
            wire: OnceLock::new(),
        }
    }

    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.set_selectors(selectors);
        self
    }

    pub fn with_min_suffix_components(mut self, value: u64) -> Self {
        self.set_min_suffix_components(Some(value));
        self
    }

    pub fn with_max_suffix_components(mut self, value: u64) -> Self {
        self.set_max_suffix_components(Some(value));
        self
    }

    pub fn with_publisher_public_key_locator(mut self, locator: KeyLocator) -> Self {
        self.set_publisher_public_key_locator(Some(locator));
        self
    }

    pub fn with_exclude(mut self, exclude: Exclude) -> Self {
        self.set_exclude(exclude);
        self
    }

    pub fn with_child_selector(mut self, child: ChildSelector) -> Self {
        self.set_child_selector(Some(child));
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.set_must_be_fresh(must_be_fresh);
        self
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.set_nonce(nonce);
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.set_lifetime(lifetime);
        self
    }

    pub fn with_forwarding_hint(mut self, hint: DelegationList) -> Self {
        self.set_forwarding_hint(hint);
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name = name;
        self.reset_wire()
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    pub fn set_selectors(&mut self, selectors: Selectors) -> &mut Self {
        self.selectors = selectors;
        self.reset_wire()
    }

    pub fn min_suffix_components(&self) -> Option<u64> {
        self.selectors.min_suffix_components()
    }

    pub fn set_min_suffix_components(&mut self, value: Option<u64>) -> &mut Self {
        self.selectors.set_min_suffix_components(value);
        self.reset_wire()
    }

    pub fn max_suffix_components(&self) -> Option<u64> {
        self.selectors.max_suffix_components()
    }

    pub fn set_max_suffix_components(&mut self, value: Option<u64>) -> &mut Self {
        self.selectors.set_max_suffix_components(value);
        self.reset_wire()
    }

    pub fn publisher_public_key_locator(&self) -> Option<&KeyLocator> {
        self.selectors.publisher_public_key_locator()
    }

    pub fn set_publisher_public_key_locator(&mut self, locator: Option<KeyLocator>) -> &mut Self {
        self.selectors.set_publisher_public_key_locator(locator);
        self.reset_wire()
    }

    pub fn exclude(&self) -> &Exclude {
        self.selectors.exclude()
    }

    pub fn set_exclude(&mut self, exclude: Exclude) -> &mut Self {
        self.selectors.set_exclude(exclude);
        self.reset_wire()
    }

    pub fn child_selector(&self) -> ChildSelector {
        self.selectors.child_selector()
    }

    pub fn set_child_selector(&mut self, child: Option<ChildSelector>) -> &mut Self {
        self.selectors.set_child_selector(child);
        self.reset_wire()
    }

    pub fn must_be_fresh(&self) -> bool {
        self.selectors.must_be_fresh()
    }

    pub fn set_must_be_fresh(&mut self, must_be_fresh: bool) -> &mut Self {
        self.selectors.set_must_be_fresh(must_be_fresh);
        self.reset_wire()
    }

    pub fn has_nonce(&self) -> bool {
        self.nonce.get().is_some()
    }

    /// The nonce, drawn at random on first use
    pub fn nonce(&self) -> u32 {
        *self.nonce.get_or_init(rand::random)
    }

    pub fn set_nonce(&mut self, nonce: u32) -> &mut Self {
        self.nonce = OnceLock::from(nonce);
        self.reset_wire()
    }

    /// Replace the nonce with a different random value
    pub fn refresh_nonce(&mut self) -> &mut Self {
        let old = self.nonce.get().copied();
        let mut fresh = rand::random::<u32>();
        while Some(fresh) == old {
            fresh = rand::random();
        }
        self.set_nonce(fresh)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn set_lifetime(&mut self, lifetime: Duration) -> &mut Self {
        self.lifetime = lifetime;
        self.reset_wire()
    }

    pub fn forwarding_hint(&self) -> &DelegationList {
        &self.forwarding_hint
    }

    pub fn set_forwarding_hint(&mut self, hint: DelegationList) -> &mut Self {
        self.forwarding_hint = hint;
        self.reset_wire()
    }

    fn reset_wire(&mut self) -> &mut Self {
        self.wire = OnceLock::new();
        self
    }

    /// Check if `name` (a Data name without its implicit digest) satisfies
    /// the name-based selectors.
    pub fn matches_name(&self, name: &Name) -> bool {
        if !self.name.is_prefix_of(name) {
            return false;
        }

        // the implicit digest is always part of the suffix
        let suffix = (name.len() + 1 - self.name.len()) as u64;
        if let Some(min) = self.min_suffix_components() {
            if suffix < min {
                return false;
            }
        }
        if let Some(max) = self.max_suffix_components() {
            if suffix > max {
                return false;
            }
        }

        let exclude = self.exclude();
        if !exclude.is_empty() && name.len() > self.name.len() {
            if let Ok(next) = name.get(self.name.len() as isize) {
                if exclude.is_excluded(next) {
                    return false;
                }
            }
        }
        true
    }

    /// Check if `data` can satisfy this Interest.
    ///
    /// Selectors are evaluated against the Data's full name. A Data that
    /// cannot be encoded (no signature value) only matches when its digest
    /// is not needed.
    pub fn matches_data(&self, data: &Data) -> bool {
        let interest_len = self.name.len();
        let data_name = data.name();
        let full_len = data_name.len() + 1;

        let min = self.min_suffix_components().unwrap_or(0);
        if interest_len as u64 + min > full_len as u64 {
            return false;
        }
        if let Some(max) = self.max_suffix_components() {
            if (interest_len as u64).saturating_add(max) < full_len as u64 {
                return false;
            }
        }

        if interest_len == full_len {
            let ends_with_digest = self
                .name
                .last()
                .is_some_and(|c| c.is_implicit_sha256_digest());
            if !ends_with_digest {
                return false;
            }
            match data.full_name() {
                Ok(full_name) if *full_name == self.name => {}
                _ => return false,
            }
        } else if !self.name.is_prefix_of(data_name) {
            return false;
        }

        let exclude = self.exclude();
        if !exclude.is_empty() && full_len > interest_len {
            if interest_len == full_len - 1 {
                match data.full_name() {
                    Ok(full_name) => {
                        if full_name.last().is_some_and(|digest| exclude.is_excluded(digest)) {
                            return false;
                        }
                    }
                    Err(_) => return false,
                }
            } else if let Ok(next) = data_name.get(interest_len as isize) {
                if exclude.is_excluded(next) {
                    return false;
                }
            }
        }

        if let Some(wanted) = self.publisher_public_key_locator() {
            match data.signature().key_locator() {
                Some(actual) if actual == wanted => {}
                _ => return false,
            }
        }
        true
    }

    /// True when `other` has the same name and selectors
    pub fn matches_interest(&self, other: &Interest) -> bool {
        self.name == other.name && self.selectors == other.selectors
    }

    fn value_len(&self) -> usize {
        let mut len = self.name.encoded_len() + tlv::tlv_size(tlv_types::NONCE, NONCE_SIZE);
        if !self.selectors.is_empty() {
            len += self.selectors.wire_encode().len();
        }
        if self.lifetime != DEFAULT_INTEREST_LIFETIME {
            len += tlv::non_negative_integer_tlv_size(
                tlv_types::INTEREST_LIFETIME,
                self.lifetime.as_millis() as u64,
            );
        }
        if !self.forwarding_hint.is_empty() {
            len += self.forwarding_hint.encoded_len();
        }
        len
    }

    fn encode_to<B: BufMut>(&self, sink: &mut B) {
        tlv::write_var_number(sink, tlv_types::INTEREST as u64);
        tlv::write_var_number(sink, self.value_len() as u64);
        self.name.encode_to(sink);
        if !self.selectors.is_empty() {
            sink.put_slice(&self.selectors.wire_encode());
        }
        tlv::write_tlv(sink, tlv_types::NONCE, &self.nonce().to_be_bytes());
        if self.lifetime != DEFAULT_INTEREST_LIFETIME {
            tlv::write_non_negative_integer_tlv(
                sink,
                tlv_types::INTEREST_LIFETIME,
                self.lifetime.as_millis() as u64,
            );
        }
        if !self.forwarding_hint.is_empty() {
            self.forwarding_hint.encode_to(sink);
        }
    }

    /// Encode to an Interest TLV, reusing the cached encoding.
    ///
    /// Fixes the nonce if none was set yet.
    pub fn wire_encode(&self) -> Bytes {
        if let Some(wire) = self.wire.get() {
            return wire.clone();
        }

        let mut buf = BytesMut::new();
        self.encode_to(&mut buf);
        let wire = buf.freeze();
        self.wire.get_or_init(|| wire).clone()
    }

    pub fn wire_decode(block: &Block) -> Result<Self> {
        block.expect_type(tlv_types::INTEREST)?;
        let mut block = block.clone();
        block.parse()?;

        let name = Name::wire_decode(block.get(tlv_types::NAME)?)?;
        let selectors = match block.find(tlv_types::SELECTORS) {
            Some(element) => Selectors::wire_decode(element)?,
            None => Selectors::new(),
        };

        let nonce_value = block.get(tlv_types::NONCE)?.value()?;
        let nonce = <[u8; NONCE_SIZE]>::try_from(&nonce_value[..]).map_err(|_| {
            TlvError::Malformed(format!("Nonce must be {} bytes, got {}", NONCE_SIZE, nonce_value.len()))
        })?;

        let lifetime = match block.find(tlv_types::INTEREST_LIFETIME) {
            Some(element) => Duration::from_millis(element.read_non_negative_integer()?),
            None => DEFAULT_INTEREST_LIFETIME,
        };
        let forwarding_hint = match block.find(tlv_types::FORWARDING_HINT) {
            Some(element) => DelegationList::wire_decode(element)?,
            None => DelegationList::new(),
        };

        let interest = Interest {
            name,
            selectors,
            nonce: OnceLock::from(u32::from_be_bytes(nonce)),
            lifetime,
            forwarding_hint,
            wire: OnceLock::new(),
        };
        if let Ok(wire) = block.wire() {
            let _ = interest.wire.set(wire.clone());
        }
        Ok(interest)
    }

    /// Decode from a buffer holding exactly one Interest TLV
    pub fn from_wire(bytes: Bytes) -> Result<Self> {
        Self::wire_decode(&Block::from_bytes(bytes)?)
    }
}

impl PartialEq for Interest {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.selectors == other.selectors
            && self.nonce.get() == other.nonce.get()
            && self.lifetime == other.lifetime
            && self.forwarding_hint == other.forwarding_hint
    }
}

impl Eq for Interest {}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let mut delim = '?';
        let mut field = |f: &mut fmt::Formatter<'_>, key: &str, value: &dyn fmt::Display| {
            let result = write!(f, "{}ndn.{}={}", delim, key, value);
            delim = '&';
            result
        };

        if let Some(min) = self.min_suffix_components() {
            field(f, "MinSuffixComponents", &min)?;
        }
        if let Some(max) = self.max_suffix_components() {
            field(f, "MaxSuffixComponents", &max)?;
        }
        if self.child_selector() != ChildSelector::Leftmost {
            field(f, "ChildSelector", &self.child_selector().to_u64())?;
        }
        if self.must_be_fresh() {
            field(f, "MustBeFresh", &1)?;
        }
        if self.lifetime != DEFAULT_INTEREST_LIFETIME {
            field(f, "InterestLifetime", &self.lifetime.as_millis())?;
        }
        if let Some(nonce) = self.nonce.get() {
            field(f, "Nonce", nonce)?;
        }
        if !self.exclude().is_empty() {
            field(f, "Exclude", self.exclude())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::meta_info::MetaInfo;
    use crate::signature::{SignatureInfo, SignatureType};

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn signed_data(uri: &str) -> Data {
        let mut data = Data::new(name(uri), Bytes::from_static(b"content"));
        data.set_signature_value(vec![0u8; 32]);
        data
    }

    #[test]
    fn test_nonce_is_frozen_once_read() {
        let interest = Interest::new(name("/a"));
        assert!(!interest.has_nonce());
        let nonce = interest.nonce();
        assert!(interest.has_nonce());
        assert_eq!(interest.nonce(), nonce);
    }

    #[test]
    fn test_refresh_nonce_changes_value() {
        let mut interest = Interest::new(name("/a")).with_nonce(7);
        interest.refresh_nonce();
        assert_ne!(interest.nonce(), 7);
    }

    #[test]
    fn test_minimal_wire_encoding() {
        let interest = Interest::new(name("/a")).with_nonce(0x01020304);
        assert_eq!(
            &interest.wire_encode()[..],
            &[5, 11, 7, 3, 8, 1, b'a', 10, 4, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_wire_round_trip() {
        let mut exclude = Exclude::new();
        exclude.exclude_one(Component::from("x"));
        let mut hint = DelegationList::new();
        hint.insert(10, name("/hub"));

        let interest = Interest::new(name("/video/clip"))
            .with_min_suffix_components(1)
            .with_max_suffix_components(4)
            .with_exclude(exclude)
            .with_child_selector(ChildSelector::Rightmost)
            .with_must_be_fresh(true)
            .with_lifetime(Duration::from_millis(1500))
            .with_forwarding_hint(hint)
            .with_nonce(42);

        let wire = interest.wire_encode();
        let decoded = Interest::from_wire(wire.clone()).unwrap();
        assert_eq!(decoded, interest);
        assert_eq!(decoded.wire_encode(), wire);
        assert_eq!(decoded.lifetime(), Duration::from_millis(1500));
        assert_eq!(decoded.nonce(), 42);
    }

    #[test]
    fn test_setter_invalidates_cache() {
        let mut interest = Interest::new(name("/a")).with_nonce(1);
        let before = interest.wire_encode();
        interest.set_lifetime(Duration::from_secs(1));
        assert_ne!(interest.wire_encode(), before);
    }

    #[test]
    fn test_decode_requires_four_byte_nonce() {
        let missing = Bytes::from_static(&[5, 5, 7, 3, 8, 1, b'a']);
        assert!(Interest::from_wire(missing).is_err());

        let short = Bytes::from_static(&[5, 9, 7, 3, 8, 1, b'a', 10, 2, 1, 2]);
        assert!(matches!(
            Interest::from_wire(short),
            Err(crate::error::Error::Decode(TlvError::Malformed(_)))
        ));
    }

    #[test]
    fn test_matches_name_prefix() {
        let interest = Interest::new(name("/a"));
        assert!(interest.matches_name(&name("/a")));
        assert!(interest.matches_name(&name("/a/b")));
        assert!(!interest.matches_name(&name("/b")));
    }

    #[test]
    fn test_matches_name_suffix_bounds() {
        let interest = Interest::new(name("/a")).with_max_suffix_components(1);
        assert!(interest.matches_name(&name("/a")));
        assert!(!interest.matches_name(&name("/a/b")));

        let interest = Interest::new(name("/a")).with_min_suffix_components(2);
        assert!(!interest.matches_name(&name("/a")));
        assert!(interest.matches_name(&name("/a/b")));

        let interest = Interest::new(name("/a")).with_max_suffix_components(0);
        assert!(!interest.matches_name(&name("/a")));
    }

    #[test]
    fn test_matches_name_exclude() {
        let mut exclude = Exclude::new();
        exclude.exclude_one(Component::from("b"));
        let interest = Interest::new(name("/a")).with_exclude(exclude);
        assert!(!interest.matches_name(&name("/a/b")));
        assert!(interest.matches_name(&name("/a/c")));
        assert!(interest.matches_name(&name("/a")));
    }

    #[test]
    fn test_matches_data_prefix_and_suffix() {
        let interest = Interest::new(name("/a"));
        assert!(interest.matches_data(&signed_data("/a/b")));
        assert!(interest.matches_data(&signed_data("/a")));
        assert!(!interest.matches_data(&signed_data("/b")));

        let interest = Interest::new(name("/a")).with_max_suffix_components(1);
        assert!(interest.matches_data(&signed_data("/a")));
        assert!(!interest.matches_data(&signed_data("/a/b")));
    }

    #[test]
    fn test_matches_data_by_full_name() {
        let data = signed_data("/a/b");
        let full_name = data.full_name().unwrap().clone();

        let interest = Interest::new(full_name.clone());
        assert!(interest.matches_data(&data));

        let mut wrong = full_name.get_prefix(-1);
        wrong.append(Component::from_sha256_digest([0xFF; 32]));
        assert!(!Interest::new(wrong).matches_data(&data));

        // same length as the full name but not ending in a digest
        assert!(!Interest::new(name("/a/b/c")).matches_data(&data));
    }

    #[test]
    fn test_matches_data_excluded_digest() {
        let data = signed_data("/a");
        let digest = data.full_name().unwrap().last().unwrap().clone();

        let mut exclude = Exclude::new();
        exclude.exclude_one(digest);
        assert!(!Interest::new(name("/a")).with_exclude(exclude).matches_data(&data));

        let mut exclude = Exclude::new();
        exclude.exclude_one(Component::from("zzz"));
        assert!(Interest::new(name("/a")).with_exclude(exclude).matches_data(&data));
    }

    #[test]
    fn test_matches_data_publisher_key_locator() {
        let locator = KeyLocator::Name(name("/key/1"));
        let interest = Interest::new(name("/a")).with_publisher_public_key_locator(locator.clone());

        let no_locator = signed_data("/a/b");
        assert!(!interest.matches_data(&no_locator));

        let mut data = Data::new(name("/a/b"), Bytes::new());
        data.set_signature_info(
            SignatureInfo::new(SignatureType::Sha256WithEcdsa).with_key_locator(locator),
        );
        data.set_signature_value(vec![1u8; 64]);
        assert!(interest.matches_data(&data));

        let other = Interest::new(name("/a"))
            .with_publisher_public_key_locator(KeyLocator::Name(name("/key/2")));
        assert!(!other.matches_data(&data));
    }

    #[test]
    fn test_matches_data_min_suffix() {
        let mut data = signed_data("/a/b/c");
        data.set_meta_info(MetaInfo::new());
        assert!(Interest::new(name("/a")).with_min_suffix_components(3).matches_data(&data));
        assert!(!Interest::new(name("/a")).with_min_suffix_components(4).matches_data(&data));
    }

    #[test]
    fn test_display() {
        let interest = Interest::new(name("/a/b"));
        assert_eq!(interest.to_string(), "/a/b");

        let mut exclude = Exclude::new();
        exclude.exclude_one(Component::from("x"));
        let interest = Interest::new(name("/a"))
            .with_min_suffix_components(1)
            .with_child_selector(ChildSelector::Rightmost)
            .with_must_be_fresh(true)
            .with_lifetime(Duration::from_millis(1000))
            .with_nonce(5)
            .with_exclude(exclude);
        assert_eq!(
            interest.to_string(),
            "/a?ndn.MinSuffixComponents=1&ndn.ChildSelector=1&ndn.MustBeFresh=1\
             &ndn.InterestLifetime=1000&ndn.Nonce=5&ndn.Exclude=x"
        );
    }

    #[test]
    fn test_matches_interest_ignores_nonce() {
        let a = Interest::new(name("/a")).with_nonce(1);
        let b = Interest::new(name("/a")).with_nonce(2);
        assert!(a.matches_interest(&b));
        assert_ne!(a, b);
        assert!(!a.matches_interest(&Interest::new(name("/a")).with_must_be_fresh(true)));
    }
}
