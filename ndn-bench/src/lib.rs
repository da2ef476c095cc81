//! Workload fixtures shared by the codec and store benchmarks.

use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;

use ndn_core::{Data, InMemoryStorage, Interest, Name, PolicyKind};

/// Random name of `depth` components with 1..=`max_component_len` bytes each
pub fn random_name<R: Rng>(rng: &mut R, depth: usize, max_component_len: usize) -> Name {
    let mut name = Name::new();
    for _ in 0..depth {
        let len = rng.gen_range(1..=max_component_len.max(1));
        let component: Vec<u8> = (0..len).map(|_| rng.sample(Alphanumeric)).collect();
        name.append_bytes(component);
    }
    name
}

/// Names `/<prefix>/<i>/seg=<j>` for a segmented-content workload
pub fn segmented_names(prefix: &str, objects: usize, segments: u64) -> Vec<Name> {
    let mut names = Vec::with_capacity(objects * segments as usize);
    for object in 0..objects {
        for segment in 0..segments {
            let mut name = Name::from_uri(prefix).unwrap_or_default();
            name.append_str(&object.to_string()).append_segment(segment);
            names.push(name);
        }
    }
    names
}

/// A Data with random content and a placeholder signature value
pub fn signed_data<R: Rng>(rng: &mut R, name: Name, payload_size: usize) -> Data {
    let mut payload = vec![0u8; payload_size];
    rng.fill(&mut payload[..]);
    Data::new(name, Bytes::from(payload))
        .with_freshness_period(std::time::Duration::from_secs(10))
        .with_signature_value(vec![0u8; 32])
}

pub fn interest_for(name: Name) -> Interest {
    Interest::new(name).with_nonce(0x5EED)
}

/// Store filled with one Data per name
pub fn populated_store<R: Rng>(
    rng: &mut R,
    policy: PolicyKind,
    limit: Option<usize>,
    names: &[Name],
) -> InMemoryStorage {
    let mut store = InMemoryStorage::new(policy, limit);
    for name in names {
        let _ = store.insert(signed_data(rng, name.clone(), 64));
    }
    store
}
