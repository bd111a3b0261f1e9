use std::fmt;
use std::marker::PhantomData;

use super::{SparseIndex, SparseIter};

/// A list of sparse values accessed by a sparse index.
///
/// Doesn't store indices. Grows in blocks of `growth` slots past the highest
/// index that needs to fit, and never shrinks on its own.
#[derive(Clone)]
pub struct SparseMap<K: SparseIndex, V> {
    inner: Vec<Option<V>>,
    /// The amount of filled slots.
    len: usize,
    /// The amount of slots allocated past a newly required index.
    growth: usize,
    _key: PhantomData<fn(&K)>,
}

impl<K: SparseIndex, V> SparseMap<K, V> {
    /// Creates a new empty sparse map that grows in blocks of `growth` slots.
    pub const fn with_growth(growth: usize) -> Self {
        let inner = Vec::new();
        let len = 0;
        let growth = if growth == 0 { 1 } else { growth };

        Self { inner, len, growth, _key: PhantomData }
    }

    /// Returns the amount of values in the sparse map.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map is empty.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the amount of slots, filled or not.
    pub fn slots_len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the filled slots and their indices.
    pub fn iter(&self) -> SparseIter<'_, V> {
        SparseIter { inner: self.inner.iter().enumerate(), len: self.len }
    }

    /// Returns `true` if the map contains a value corresponding to the index.
    pub fn contains(&self, index: &K) -> bool {
        self.inner.get(index.sparse_index()).is_some_and(Option::is_some)
    }

    /// Returns a reference to the value assosciated with the index.
    pub fn get(&self, index: &K) -> Option<&V> {
        self.inner.get(index.sparse_index()).and_then(Option::as_ref)
    }

    /// Returns a mutable reference to the value assosciated with the index.
    pub fn get_mut(&mut self, index: &K) -> Option<&mut V> {
        self.inner.get_mut(index.sparse_index()).and_then(Option::as_mut)
    }

    /// Makes sure there are at least `slots` slots.
    ///
    /// Allocates `growth` additional slots when it has to grow.
    pub fn reserve_slots(&mut self, slots: usize) {
        if slots > self.inner.len() {
            self.inner.resize_with(slots - 1 + self.growth, || None);
        }
    }

    /// Inserts a value at an index.
    ///
    /// Returns the previous value if it exists.
    pub fn insert(&mut self, index: K, value: V) -> Option<V> {
        let sparse = index.sparse_index();

        self.reserve_slots(sparse + 1);

        let result = self.inner[sparse].replace(value);

        if result.is_none() {
            self.len += 1;
        }

        result
    }

    /// Removes the value at the index.
    pub fn remove(&mut self, index: &K) -> Option<V> {
        self.inner
            .get_mut(index.sparse_index())
            .and_then(Option::take)
            .inspect(|_| self.len -= 1)
    }

    /// Empties every slot without deallocating them.
    pub fn clear(&mut self) {
        self.inner.fill_with(|| None);
        self.len = 0;
    }
}

impl<K: SparseIndex, V: fmt::Debug> fmt::Debug for SparseMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
