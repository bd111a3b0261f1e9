/// The amount of components [`ComponentManager::with_reserved`] makes room
/// for.
///
/// [`ComponentManager::with_reserved`]: super::ComponentManager::with_reserved
pub const DEFAULT_RESERVED_COUNT: usize = 50_000;

/// How a [`ComponentManager`](super::ComponentManager) allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageConfig {
    /// The amount of components, entities, and sparse slots to allocate up
    /// front.
    pub reserved: usize,
    /// How many sparse slots to allocate past an entity that doesn't fit.
    ///
    /// Growing in large blocks keeps reallocation of the sparse array rare.
    pub sparse_growth: usize,
}

impl StorageConfig {
    /// The default amount of slots the sparse array grows by.
    pub const DEFAULT_SPARSE_GROWTH: usize = 5000;

    /// A config that reserves room for `reserved` components.
    pub const fn reserved(reserved: usize) -> Self {
        Self { reserved, sparse_growth: Self::DEFAULT_SPARSE_GROWTH }
    }

    /// Sets [`StorageConfig::sparse_growth`].
    pub const fn with_sparse_growth(mut self, sparse_growth: usize) -> Self {
        self.sparse_growth = sparse_growth;

        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::reserved(0)
    }
}
