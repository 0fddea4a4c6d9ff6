use std::hash::Hasher;

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

pub fn stable_hash64(s: &str) -> u64 {
    let mut h = StableHasher::new();
    h.write(s.as_bytes());
    h.finish()
}

/// FNV-1a hasher with a fixed seed.
///
/// Digests are identical across threads and runs, which lets independent
/// executions agree on cache keys without sharing a `RandomState`.
#[derive(Clone, Copy, Debug)]
pub struct StableHasher {
    state: u64,
}

impl StableHasher {
    pub fn new() -> Self {
        Self { state: FNV_OFFSET }
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}
