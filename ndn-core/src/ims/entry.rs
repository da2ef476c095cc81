use std::sync::Arc;
use std::time::Instant;

use crate::data::Data;
use crate::interest::Interest;
use crate::name::Name;

/// Content store entry
#[derive(Debug, Clone)]
pub struct Entry {
    full_name: Name,
    data: Arc<Data>,
    fresh: bool,
    stale_at: Option<Instant>,
}

impl Entry {
    pub(crate) fn new(full_name: Name, data: Arc<Data>, stale_at: Option<Instant>) -> Self {
        Self {
            full_name,
            data,
            fresh: true,
            stale_at,
        }
    }

    /// Name plus implicit digest; the store's key
    pub fn full_name(&self) -> &Name {
        &self.full_name
    }

    pub fn name(&self) -> &Name {
        self.data.name()
    }

    pub fn data(&self) -> &Arc<Data> {
        &self.data
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// When the entry turns stale, if a freshness window was given
    pub fn stale_at(&self) -> Option<Instant> {
        self.stale_at
    }

    pub(crate) fn mark_stale(&mut self) {
        self.fresh = false;
    }

    /// Mark the entry stale once its window has passed. Returns true when
    /// this call changed the state.
    pub(crate) fn expire(&mut self, now: Instant) -> bool {
        match self.stale_at {
            Some(at) if self.fresh && at <= now => {
                self.fresh = false;
                true
            }
            _ => false,
        }
    }

    /// Check if the entry can answer `interest`
    pub fn satisfies(&self, interest: &Interest) -> bool {
        if interest.must_be_fresh() && !self.fresh {
            return false;
        }
        interest.matches_data(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn entry(window: Option<Duration>, now: Instant) -> Entry {
        let data = Data::new(Name::from_uri("/a/b").unwrap(), Bytes::from_static(b"x"))
            .with_signature_value(vec![0u8; 32]);
        let full_name = data.full_name().unwrap().clone();
        Entry::new(full_name, Arc::new(data), window.map(|w| now + w))
    }

    #[test]
    fn test_expire_after_window() {
        let now = Instant::now();
        let mut entry = entry(Some(Duration::from_millis(100)), now);
        assert!(entry.is_fresh());
        assert!(!entry.expire(now + Duration::from_millis(99)));
        assert!(entry.expire(now + Duration::from_millis(100)));
        assert!(!entry.is_fresh());
        assert!(!entry.expire(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_no_window_stays_fresh() {
        let now = Instant::now();
        let mut entry = entry(None, now);
        assert!(!entry.expire(now + Duration::from_secs(3600)));
        assert!(entry.is_fresh());
    }

    #[test]
    fn test_must_be_fresh_rejects_stale() {
        let now = Instant::now();
        let mut entry = entry(None, now);
        let interest = Interest::new(Name::from_uri("/a").unwrap()).with_must_be_fresh(true);
        assert!(entry.satisfies(&interest));
        entry.mark_stale();
        assert!(!entry.satisfies(&interest));
        assert!(entry.satisfies(&Interest::new(Name::from_uri("/a").unwrap())));
    }
}
