//! FNV hashed collections for grid coordinate keys, which hash far faster than with SipHash.
use std::hash::Hash;

use fnv::FnvBuildHasher;
pub use fnv::{FnvHashMap, FnvHashSet};

pub fn fnv_hashset<T: Hash + Eq>(capacity: usize) -> FnvHashSet<T> {
    FnvHashSet::with_capacity_and_hasher(capacity, FnvBuildHasher::default())
}

/// Sized for a grid's cells up front, so a flood fill or search never rehashes.
pub fn fnv_hashmap<K: Hash + Eq, V>(capacity: usize) -> FnvHashMap<K, V> {
    FnvHashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default())
}
