//! Deterministic hashing. Seeds derived from labels must not change between runs or platforms,
//! so everything here is built on `FxHasher` rather than the randomly keyed std hasher.

use std::hash::Hasher;

use rustc_hash::FxHasher;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Hashes a string to a `u64` that is stable across processes.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_str_is_stable_and_discriminating() {
        assert_eq!(hash_str("GillespieRng"), hash_str("GillespieRng"));
        assert_ne!(hash_str("Leaky/3/-/1"), hash_str("Leaky/3/-/2"));
    }
}
