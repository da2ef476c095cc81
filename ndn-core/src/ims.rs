//! In-memory content store.
//!
//! Entries are kept in canonical order of their full names, so every Data
//! under a prefix is one contiguous range. Capacity grows by doubling up to
//! the configured limit; once the limit is reached the replacement policy
//! picks victims.

mod entry;
mod policy;

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::data::Data;
use crate::error::{Error, Result};
use crate::interest::Interest;
use crate::name::Name;
use crate::selectors::ChildSelector;

pub use entry::Entry;
pub use policy::{EvictionPolicy, FifoPolicy, LfuPolicy, LruPolicy, PersistentPolicy, PolicyKind};

pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Content store for caching Data packets
#[derive(Debug)]
pub struct InMemoryStorage {
    entries: BTreeMap<Name, Entry>,
    policy: Box<dyn EvictionPolicy>,
    capacity: usize,
    limit: Option<usize>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(PolicyKind::default(), None)
    }
}

impl InMemoryStorage {
    /// Create a store; `None` means no limit on the number of entries
    pub fn new(policy: PolicyKind, limit: Option<usize>) -> Self {
        Self::with_policy(policy.build(), limit, DEFAULT_INITIAL_CAPACITY)
    }

    pub fn with_policy(
        policy: Box<dyn EvictionPolicy>,
        limit: Option<usize>,
        initial_capacity: usize,
    ) -> Self {
        let capacity = limit.map_or(initial_capacity, |limit| initial_capacity.min(limit));
        debug!(
            "Created {} content store (capacity {}, limit {:?})",
            policy.kind(),
            capacity,
            limit
        );
        Self {
            entries: BTreeMap::new(),
            policy,
            capacity,
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    fn max_capacity(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Entries in canonical full-name order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.values()
    }

    /// Entry stored under exactly `full_name`
    pub fn get(&self, full_name: &Name) -> Option<&Entry> {
        self.entries.get(full_name)
    }

    /// Store a Data packet that stays fresh until marked stale.
    ///
    /// Returns false when a packet with the same full name is already
    /// stored. Fails if the Data cannot be encoded or the store is at its
    /// limit and the policy refuses to evict.
    pub fn insert(&mut self, data: impl Into<Arc<Data>>) -> Result<bool> {
        self.insert_entry(data.into(), None)
    }

    /// Store a Data packet that turns stale `window` after `now`
    pub fn insert_with_window(
        &mut self,
        data: impl Into<Arc<Data>>,
        window: Duration,
        now: Instant,
    ) -> Result<bool> {
        self.insert_entry(data.into(), Some(now + window))
    }

    fn insert_entry(&mut self, data: Arc<Data>, stale_at: Option<Instant>) -> Result<bool> {
        let full_name = data.full_name()?.clone();
        if self.entries.contains_key(&full_name) {
            return Ok(false);
        }

        let max_capacity = self.max_capacity();
        if self.is_full() && self.capacity < max_capacity {
            let grown = self.capacity.saturating_mul(2).max(1).min(max_capacity);
            self.set_capacity(grown)?;
        }
        if self.is_full() {
            self.evict_one();
        }
        if self.is_full() {
            warn!("Content store full at limit {}, dropping {}", self.capacity, full_name);
            return Err(Error::Storage(format!(
                "store is full ({} entries) and the {} policy cannot evict",
                self.entries.len(),
                self.policy.kind()
            )));
        }

        self.policy.after_insert(&full_name);
        self.entries
            .insert(full_name.clone(), Entry::new(full_name.clone(), data, stale_at));
        debug!("Cached Data: {} (store size: {})", full_name, self.entries.len());
        Ok(true)
    }

    fn evict_one(&mut self) -> bool {
        match self.policy.evict_one() {
            Some(victim) => {
                let removed = self.entries.remove(&victim).is_some();
                if removed {
                    debug!("Evicted {} ({} policy)", victim, self.policy.kind());
                }
                removed
            }
            None => false,
        }
    }

    /// First Data whose full name has `name` as a prefix
    pub fn find_by_name(&mut self, name: &Name) -> Option<Arc<Data>> {
        let (full_name, entry) = self
            .entries
            .range::<Name, _>((Bound::Included(name), Bound::Unbounded))
            .next()?;
        if !name.is_prefix_of(full_name) {
            return None;
        }
        let data = entry.data().clone();
        let full_name = full_name.clone();
        self.policy.after_access(&full_name);
        Some(data)
    }

    /// Best stored Data for `interest`, honouring its selectors
    pub fn find(&mut self, interest: &Interest) -> Option<Arc<Data>> {
        let full_name = self.select(interest)?;
        let data = self.entries.get(&full_name)?.data().clone();
        self.policy.after_access(&full_name);
        Some(data)
    }

    fn select(&self, interest: &Interest) -> Option<Name> {
        let name = interest.name();

        // an Interest carrying the implicit digest names one packet
        if self.entries.contains_key(name) {
            return Some(name.clone());
        }

        let (lower_bound, _) = self
            .entries
            .range::<Name, _>((Bound::Included(name), Bound::Unbounded))
            .next()?;
        let start = self
            .entries
            .range::<Name, _>((Bound::Unbounded, Bound::Excluded(name)))
            .next_back()
            .map_or(lower_bound, |(full_name, _)| full_name);
        self.select_child(interest, start)
            .map(|entry| entry.full_name().clone())
    }

    fn select_child(&self, interest: &Interest, start: &Name) -> Option<&Entry> {
        let leftmost = interest.child_selector() == ChildSelector::Leftmost;
        let prefix = interest.name();
        let mut candidates = self
            .entries
            .range::<Name, _>((Bound::Included(start), Bound::Unbounded));
        let (_, start_entry) = candidates.next()?;

        let child_of = |full_name: &Name| full_name.get_prefix(prefix.len() as isize + 1);
        let start_matches = start_entry.satisfies(interest);
        if leftmost && start_matches {
            return Some(start_entry);
        }

        // the start entry opens its own child group when it matches
        let mut rightmost = start_matches.then_some(start_entry);
        let mut current_child = start_matches.then(|| child_of(start));
        for (full_name, entry) in candidates {
            if !prefix.is_prefix_of(full_name) {
                break;
            }
            if !entry.satisfies(interest) {
                continue;
            }
            if leftmost {
                return Some(entry);
            }
            let child = child_of(full_name);
            if current_child.as_ref() != Some(&child) {
                current_child = Some(child);
                rightmost = Some(entry);
            }
        }
        rightmost
    }

    /// Erase the entry with full name `name`, or with `is_prefix` every
    /// entry whose name starts with `name`. Returns the number removed.
    pub fn erase(&mut self, name: &Name, is_prefix: bool) -> usize {
        let victims: Vec<Name> = if is_prefix {
            self.entries
                .range::<Name, _>((Bound::Included(name), Bound::Unbounded))
                .take_while(|(_, entry)| name.is_prefix_of(entry.name()))
                .map(|(full_name, _)| full_name.clone())
                .collect()
        } else if self.entries.contains_key(name) {
            vec![name.clone()]
        } else {
            return 0;
        };

        for full_name in &victims {
            self.policy.before_erase(full_name);
            self.entries.remove(full_name);
        }
        debug!("Erased {} entries under {}", victims.len(), name);

        let free = self.capacity.saturating_sub(self.entries.len());
        if free > 2 * self.entries.len() {
            let shrunk = self.capacity / 2;
            debug!("Content store capacity {} -> {}", self.capacity, shrunk);
            self.capacity = shrunk;
        }
        victims.len()
    }

    /// Change the capacity, evicting entries if it drops below the size.
    ///
    /// Fails when the policy cannot evict enough; entries evicted before
    /// the failure stay evicted and the capacity is left at the new size.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        debug!("Content store capacity {} -> {}", self.capacity, capacity);
        self.capacity = capacity;

        let mut allowed_failures = self.entries.len().saturating_sub(capacity);
        while self.entries.len() > self.capacity {
            if !self.evict_one() {
                if allowed_failures == 0 {
                    warn!(
                        "Cannot shrink content store to {}: {} entries remain",
                        capacity,
                        self.entries.len()
                    );
                    self.capacity = self.entries.len();
                    return Err(Error::Storage(format!(
                        "cannot evict down to capacity {} ({} entries)",
                        capacity,
                        self.entries.len()
                    )));
                }
                allowed_failures -= 1;
            }
        }
        Ok(())
    }

    /// Mark stale every entry whose freshness window ended at or before
    /// `now`. Returns how many changed.
    pub fn expire_stale(&mut self, now: Instant) -> usize {
        let count = self
            .entries
            .values_mut()
            .map(|entry| entry.expire(now))
            .filter(|changed| *changed)
            .count();
        if count > 0 {
            debug!("Marked {} content store entries stale", count);
        }
        count
    }

    /// Mark the entry stored under `full_name` stale
    pub fn mark_stale(&mut self, full_name: &Name) -> bool {
        match self.entries.get_mut(full_name) {
            Some(entry) => {
                entry.mark_stale();
                true
            }
            None => false,
        }
    }
}
