//! Exclude filter for Interest selectors.
//!
//! The filter is kept as an ordered map from boundary component to an "any
//! follows" flag. A boundary is itself excluded; when its flag is set every
//! component up to the next boundary is excluded as well. A leading `Any`
//! (everything before the first boundary) is stored under a negative
//! infinity boundary.
//!
//! ```text
//! wire: ANY /b /d ANY /f
//! map:  -inf(any) /b /d(any) /f
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound::{Excluded, Included, Unbounded};

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::Block;
use crate::component::Component;
use crate::error::{Error, Result};
use crate::tlv::{self, tlv_types};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Boundary {
    NegativeInfinity,
    Component(Component),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude {
    entries: BTreeMap<Boundary, bool>,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of stored boundaries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Check whether `component` falls inside the filter
    pub fn is_excluded(&self, component: &Component) -> bool {
        let key = Boundary::Component(component.clone());
        match self.entries.range(..=&key).next_back() {
            Some((boundary, any)) => *any || *boundary == key,
            None => false,
        }
    }

    /// Exclude a single component
    pub fn exclude_one(&mut self, component: Component) -> &mut Self {
        if !self.is_excluded(&component) {
            self.entries.insert(Boundary::Component(component), false);
        }
        self
    }

    /// Exclude every component from `from` to `to`, both inclusive
    pub fn exclude_range(&mut self, from: Component, to: Component) -> Result<&mut Self> {
        if from >= to {
            return Err(Error::InvalidExclude(format!(
                "invalid range [{}, {}] (use exclude_one for a single component)",
                from, to
            )));
        }
        self.merge_range(Boundary::Component(from), Boundary::Component(to));
        Ok(self)
    }

    /// Exclude every component up to and including `to`
    pub fn exclude_before(&mut self, to: Component) -> &mut Self {
        self.merge_range(Boundary::NegativeInfinity, Boundary::Component(to));
        self
    }

    /// Exclude `from` and every component after it
    pub fn exclude_after(&mut self, from: Component) -> &mut Self {
        let (start, _) = self.open_range_at(Boundary::Component(from));
        let above: Vec<Boundary> = self
            .entries
            .range((Excluded(&start), Unbounded))
            .map(|(boundary, _)| boundary.clone())
            .collect();
        for boundary in above {
            self.entries.remove(&boundary);
        }
        self
    }

    /// Make sure an `any` range starts at or before `from`, returning the
    /// boundary that carries it and whether it was inserted just now
    fn open_range_at(&mut self, from: Boundary) -> (Boundary, bool) {
        let covering = self
            .entries
            .range(..=&from)
            .next_back()
            .filter(|(_, any)| **any)
            .map(|(boundary, _)| boundary.clone());

        match covering {
            Some(boundary) => (boundary, false),
            None => {
                self.entries.insert(from.clone(), true);
                (from, true)
            }
        }
    }

    fn merge_range(&mut self, from: Boundary, to: Boundary) {
        let (start, created) = self.open_range_at(from);

        let (end, end_any) = match self.entries.range(..=&to).next_back() {
            Some((boundary, any)) => (boundary.clone(), *any),
            None => (to.clone(), false),
        };

        // An existing `any` range already runs past `to`
        if end == start && !created {
            return;
        }

        // Boundaries swallowed by the new range; a covering `any` range past
        // `to` is absorbed together with its start.
        let swallowed: Vec<Boundary> = if end == start || !end_any {
            self.entries.entry(to.clone()).or_insert(false);
            self.entries
                .range((Excluded(&start), Excluded(&to)))
                .map(|(boundary, _)| boundary.clone())
                .collect()
        } else {
            self.entries
                .range((Excluded(&start), Included(&end)))
                .map(|(boundary, _)| boundary.clone())
                .collect()
        };
        for boundary in swallowed {
            self.entries.remove(&boundary);
        }
    }

    /// Append a raw entry in wire order.
    ///
    /// `None` stands for a leading `Any` and is only accepted first (with
    /// `any` set). Component boundaries must be strictly increasing.
    pub fn append_entry(&mut self, boundary: Option<Component>, any: bool) -> Result<&mut Self> {
        let boundary = match boundary {
            None if !self.entries.is_empty() => {
                return Err(Error::InvalidExclude("leading Any must come first".into()));
            }
            None if !any => {
                return Err(Error::InvalidExclude("unbounded entry without Any".into()));
            }
            None => Boundary::NegativeInfinity,
            Some(component) => Boundary::Component(component),
        };

        if let Some((last, _)) = self.entries.last_key_value() {
            if boundary <= *last {
                return Err(Error::InvalidExclude(format!(
                    "entries out of order: {} after {}",
                    boundary, last
                )));
            }
        }
        self.entries.insert(boundary, any);
        Ok(self)
    }

    /// Entries in wire order; `None` is the leading `Any`
    pub fn entries(&self) -> impl Iterator<Item = (Option<&Component>, bool)> + '_ {
        self.entries.iter().map(|(boundary, any)| match boundary {
            Boundary::NegativeInfinity => (None, *any),
            Boundary::Component(component) => (Some(component), *any),
        })
    }

    fn value_len(&self) -> usize {
        self.entries()
            .map(|(component, any)| {
                component.map_or(0, Component::encoded_len)
                    + if any { tlv::tlv_size(tlv_types::ANY, 0) } else { 0 }
            })
            .sum()
    }

    pub fn encoded_len(&self) -> usize {
        tlv::tlv_size(tlv_types::EXCLUDE, self.value_len())
    }

    pub fn encode_to<B: BufMut>(&self, sink: &mut B) -> usize {
        let mut written = tlv::write_var_number(sink, tlv_types::EXCLUDE as u64);
        written += tlv::write_var_number(sink, self.value_len() as u64);
        for (component, any) in self.entries() {
            if let Some(component) = component {
                written += component.encode_to(sink);
            }
            if any {
                written += tlv::write_tlv(sink, tlv_types::ANY, &[]);
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
        block.expect_type(tlv_types::EXCLUDE)?;
        let mut block = block.clone();
        block.parse()?;

        let elements = block.elements();
        if elements.is_empty() {
            return Err(Error::InvalidExclude("empty Exclude".into()));
        }

        let mut exclude = Exclude::new();
        let mut i = 0;
        if elements[0].tlv_type() == tlv_types::ANY {
            exclude.append_entry(None, true)?;
            i += 1;
        }

        while i < elements.len() {
            let element = &elements[i];
            if element.tlv_type() == tlv_types::ANY {
                return Err(Error::InvalidExclude("consecutive Any elements".into()));
            }
            let component = Component::from_block(element)?;
            i += 1;

            let any = elements
                .get(i)
                .is_some_and(|next| next.tlv_type() == tlv_types::ANY);
            if any {
                i += 1;
            }
            exclude.append_entry(Some(component), any)?;
        }
        Ok(exclude)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::NegativeInfinity => f.write_str("-inf"),
            Boundary::Component(component) => write!(f, "{}", component),
        }
    }
}

impl fmt::Display for Exclude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (component, any) in self.entries() {
            if let Some(component) = component {
                if !first {
                    f.write_str(",")?;
                }
                write!(f, "{}", component)?;
                first = false;
            }
            if any {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str("*")?;
                first = false;
            }
        }
        Ok(())
    }
}
