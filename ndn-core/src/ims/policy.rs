//! Replacement policies for the in-memory store.
//!
//! A policy only tracks full names. The store reports every insert, access
//! and erase; when it needs room it asks the policy for a victim, forgets the
//! victim's bookkeeping inside the policy, and removes the entry itself.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::name::Name;

pub trait EvictionPolicy: fmt::Debug + Send {
    /// A new entry was stored
    fn after_insert(&mut self, full_name: &Name);

    /// An entry was returned by a lookup
    fn after_access(&mut self, full_name: &Name);

    /// An entry is about to be erased by the caller
    fn before_erase(&mut self, full_name: &Name);

    /// Pick and forget a victim; `None` when nothing may be evicted
    fn evict_one(&mut self) -> Option<Name>;

    fn kind(&self) -> PolicyKind;
}

/// Available replacement policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Fifo,
    Lfu,
    #[default]
    Lru,
    Persistent,
}

impl PolicyKind {
    pub fn build(self) -> Box<dyn EvictionPolicy> {
        match self {
            PolicyKind::Fifo => Box::new(FifoPolicy::default()),
            PolicyKind::Lfu => Box::new(LfuPolicy::default()),
            PolicyKind::Lru => Box::new(LruPolicy::default()),
            PolicyKind::Persistent => Box::new(PersistentPolicy),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Fifo => "fifo",
            PolicyKind::Lfu => "lfu",
            PolicyKind::Lru => "lru",
            PolicyKind::Persistent => "persistent",
        };
        f.write_str(name)
    }
}

/// Names ordered by a monotonically increasing sequence number
#[derive(Debug, Default)]
struct SequenceQueue {
    next: u64,
    by_seq: BTreeMap<u64, Name>,
    seq_of: HashMap<Name, u64>,
}

impl SequenceQueue {
    /// Put `name` at the back, moving it if already queued
    fn push_back(&mut self, name: &Name) {
        self.remove(name);
        let seq = self.next;
        self.next += 1;
        self.by_seq.insert(seq, name.clone());
        self.seq_of.insert(name.clone(), seq);
    }

    fn contains(&self, name: &Name) -> bool {
        self.seq_of.contains_key(name)
    }

    fn remove(&mut self, name: &Name) {
        if let Some(seq) = self.seq_of.remove(name) {
            self.by_seq.remove(&seq);
        }
    }

    fn pop_front(&mut self) -> Option<Name> {
        let (_, name) = self.by_seq.pop_first()?;
        self.seq_of.remove(&name);
        Some(name)
    }
}

/// Evicts the entry inserted first
#[derive(Debug, Default)]
pub struct FifoPolicy {
    queue: SequenceQueue,
}

impl EvictionPolicy for FifoPolicy {
    fn after_insert(&mut self, full_name: &Name) {
        self.queue.push_back(full_name);
    }

    fn after_access(&mut self, _full_name: &Name) {}

    fn before_erase(&mut self, full_name: &Name) {
        self.queue.remove(full_name);
    }

    fn evict_one(&mut self) -> Option<Name> {
        self.queue.pop_front()
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }
}

/// Evicts the entry inserted or accessed longest ago
#[derive(Debug, Default)]
pub struct LruPolicy {
    queue: SequenceQueue,
}

impl EvictionPolicy for LruPolicy {
    fn after_insert(&mut self, full_name: &Name) {
        self.queue.push_back(full_name);
    }

    fn after_access(&mut self, full_name: &Name) {
        if self.queue.contains(full_name) {
            self.queue.push_back(full_name);
        }
    }

    fn before_erase(&mut self, full_name: &Name) {
        self.queue.remove(full_name);
    }

    fn evict_one(&mut self) -> Option<Name> {
        self.queue.pop_front()
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }
}

/// Evicts the entry with the fewest accesses; ties go to the name that
/// sorts first
#[derive(Debug, Default)]
pub struct LfuPolicy {
    by_frequency: BTreeSet<(u64, Name)>,
    frequency: HashMap<Name, u64>,
}

impl EvictionPolicy for LfuPolicy {
    fn after_insert(&mut self, full_name: &Name) {
        self.before_erase(full_name);
        self.by_frequency.insert((0, full_name.clone()));
        self.frequency.insert(full_name.clone(), 0);
    }

    fn after_access(&mut self, full_name: &Name) {
        if let Some(count) = self.frequency.get_mut(full_name) {
            self.by_frequency.remove(&(*count, full_name.clone()));
            *count += 1;
            self.by_frequency.insert((*count, full_name.clone()));
        }
    }

    fn before_erase(&mut self, full_name: &Name) {
        if let Some(count) = self.frequency.remove(full_name) {
            self.by_frequency.remove(&(count, full_name.clone()));
        }
    }

    fn evict_one(&mut self) -> Option<Name> {
        let (_, name) = self.by_frequency.pop_first()?;
        self.frequency.remove(&name);
        Some(name)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Lfu
    }
}

/// Never evicts; the store fails to grow past its limit instead
#[derive(Debug, Default)]
pub struct PersistentPolicy;

impl EvictionPolicy for PersistentPolicy {
    fn after_insert(&mut self, _full_name: &Name) {}

    fn after_access(&mut self, _full_name: &Name) {}

    fn before_erase(&mut self, _full_name: &Name) {}

    fn evict_one(&mut self) -> Option<Name> {
        None
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Persistent
    }
}
