use std::any::type_name;
use std::ops::{Index, IndexMut};
use std::sync::Arc;
use std::{fmt, mem};

use tracing::debug;

use super::{Component, ComponentError, StorageConfig};
use crate::serialize::{
    serialize_entity,
    Archive,
    ArchiveError,
    EntitySerializer,
    MAX_PREALLOCATION,
};
use crate::storage::{SparseIndex, SparseMap};
use crate::{Entity, EntityRegistry};

/// Stores every component of type `C`, keyed by entity.
///
/// Components are packed densely in a parallel pair of arrays (components and
/// their owning entities) that can be iterated without gaps, while a sparse
/// array maps each entity to its dense slot for constant time lookup.
///
/// Attaching and detaching components is reported to the store's
/// [`EntityRegistry`], which recycles an entity once no store holds it. A store
/// is not synchronized: structural changes need exclusive access, while
/// shared access may happen from many threads at once.
///
/// Dense indices are not stable. [`ComponentManager::remove`] moves the last
/// component into the freed slot, and other structural operations shift
/// components around. Only entity lookups stay valid across mutation.
pub struct ComponentManager<C> {
    components: Vec<C>,
    entities: Vec<Entity>,
    sparse: SparseMap<Entity, usize>,
    registry: Arc<EntityRegistry>,
}

impl<C> ComponentManager<C> {
    /// Creates an empty store reporting to the [global
    /// registry](EntityRegistry::global).
    pub fn new() -> Self {
        Self::with_registry(Arc::clone(EntityRegistry::global()))
    }

    /// Creates an empty store reporting to the global registry that has room
    /// for `reserved` components.
    ///
    /// See [`DEFAULT_RESERVED_COUNT`](super::DEFAULT_RESERVED_COUNT).
    pub fn with_reserved(reserved: usize) -> Self {
        Self::with_config(
            Arc::clone(EntityRegistry::global()),
            StorageConfig::reserved(reserved),
        )
    }

    /// Creates an empty store reporting to `registry`.
    pub fn with_registry(registry: Arc<EntityRegistry>) -> Self {
        Self::with_config(registry, StorageConfig::default())
    }

    /// Creates an empty store reporting to `registry`, allocating as `config`
    /// describes.
    pub fn with_config(registry: Arc<EntityRegistry>, config: StorageConfig) -> Self {
        let components = Vec::with_capacity(config.reserved);
        let entities = Vec::with_capacity(config.reserved);
        let mut sparse = SparseMap::with_growth(config.sparse_growth);

        if config.reserved > 0 {
            sparse.reserve_slots(config.reserved);
        }

        Self { components, entities, sparse, registry }
    }

    /// The registry this store reports to.
    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// The amount of components in this store.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if this store holds no components.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The amount of owning entities. Always equal to
    /// [`ComponentManager::len`].
    pub fn entities_len(&self) -> usize {
        self.entities.len()
    }

    /// The amount of slots in the sparse array.
    pub fn sparse_len(&self) -> usize {
        self.sparse.slots_len()
    }

    /// Returns `true` if `entity` has a component in this store.
    pub fn contains(&self, entity: Entity) -> bool {
        self.sparse.contains(&entity)
    }

    /// The dense index of an entity's component.
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.sparse.get(&entity).copied()
    }

    /// Returns a reference to the component of an entity.
    pub fn get(&self, entity: Entity) -> Option<&C> {
        self.index_of(entity).map(|index| &self.components[index])
    }

    /// Returns a mutable reference to the component of an entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut C> {
        self.index_of(entity).map(|index| &mut self.components[index])
    }

    /// The entity owning the component at a dense index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn entity(&self, index: usize) -> Entity {
        self.entities[index]
    }

    /// The owning entities in dense order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The components in dense order.
    pub fn components(&self) -> &[C] {
        &self.components
    }

    /// The components in dense order.
    pub fn components_mut(&mut self) -> &mut [C] {
        &mut self.components
    }

    /// Iterates over entities and their components in dense order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Entity, &C)> + '_ {
        self.entities.iter().copied().zip(&self.components)
    }

    /// Iterates over entities and their components in dense order.
    pub fn iter_mut(
        &mut self,
    ) -> impl ExactSizeIterator<Item = (Entity, &mut C)> + '_ {
        self.entities.iter().copied().zip(&mut self.components)
    }

    /// Attaches `component` to `entity`, returning a reference to it.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is [`Entity::INVALID`] or already has a component in
    /// this store.
    pub fn create_with(&mut self, entity: Entity, component: C) -> &mut C {
        match self.try_create_with(entity, component) {
            Ok(component) => component,
            Err(error) => panic!("{error}"),
        }
    }

    /// Attaches `component` to `entity`, returning a reference to it.
    ///
    /// Fails without changing anything if the entity is
    /// [`Entity::INVALID`] or already has a component in this store.
    pub fn try_create_with(
        &mut self,
        entity: Entity,
        component: C,
    ) -> Result<&mut C, ComponentError> {
        if !entity.is_valid() {
            return Err(ComponentError::InvalidEntity);
        }

        if self.contains(entity) {
            return Err(ComponentError::AlreadyPresent(entity));
        }

        let index = self.components.len();

        self.sparse.insert(entity, index);
        self.components.push(component);
        self.entities.push(entity);
        self.registry.on_component_added(entity);

        Ok(&mut self.components[index])
    }

    /// Detaches the component of `entity`, returning it.
    ///
    /// The last component is moved into the freed slot, so the order of the
    /// remaining components changes. Does nothing if the entity has no
    /// component.
    pub fn remove(&mut self, entity: Entity) -> Option<C> {
        let index = self.sparse.remove(&entity)?;
        let component = self.components.swap_remove(index);

        self.entities.swap_remove(index);

        // the previously last entity now lives at `index`
        if let Some(&moved) = self.entities.get(index) {
            self.sparse.insert(moved, index);
        }

        self.registry.on_component_removed(entity);

        Some(component)
    }

    /// Detaches the component of `entity`, returning it.
    ///
    /// Every component after it is shifted down by one, preserving their
    /// order. This is linear in the amount of components after the removed
    /// one. Does nothing if the entity has no component.
    pub fn remove_keep_sorted(&mut self, entity: Entity) -> Option<C> {
        let index = self.sparse.remove(&entity)?;
        let component = self.components.remove(index);

        self.entities.remove(index);
        self.reindex(index..self.entities.len());
        self.registry.on_component_removed(entity);

        Some(component)
    }

    /// Moves the component at dense index `from` to `to`, shifting the
    /// components in between by one.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn move_item(&mut self, from: usize, to: usize) {
        let len = self.len();

        assert!(from < len, "move source {from} out of bounds for length {len}");
        assert!(to < len, "move destination {to} out of bounds for length {len}");

        if from < to {
            self.components[from..=to].rotate_left(1);
            self.entities[from..=to].rotate_left(1);
            self.reindex(from..to + 1);
        } else if to < from {
            self.components[to..=from].rotate_right(1);
            self.entities[to..=from].rotate_right(1);
            self.reindex(to..from + 1);
        }
    }

    /// Detaches every component.
    ///
    /// The sparse array keeps its size.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }

        debug!(component = type_name::<C>(), len = self.len(), "clearing components");

        for &entity in &self.entities {
            self.registry.on_component_removed(entity);
        }

        self.components.clear();
        self.entities.clear();
        self.sparse.clear();
    }

    /// Replaces the contents of this store with a copy of `other`.
    pub fn copy_from(&mut self, other: &Self)
    where
        C: Clone,
    {
        self.clear();

        debug!(component = type_name::<C>(), len = other.len(), "copying components");

        for &entity in &other.entities {
            self.registry.on_component_added(entity);
        }

        self.components.clone_from(&other.components);
        self.entities.clone_from(&other.entities);
        self.sparse.clone_from(&other.sparse);
    }

    /// Moves every component of `other` into this store, leaving `other`
    /// empty.
    ///
    /// The moved components keep their order and are placed after the
    /// existing ones.
    ///
    /// # Panics
    ///
    /// Panics if an entity has a component in both stores.
    pub fn merge(&mut self, other: &mut Self) {
        if let Err(error) = self.try_merge(other) {
            panic!("{error}");
        }
    }

    /// Moves every component of `other` into this store, leaving `other`
    /// empty.
    ///
    /// Fails without changing either store if an entity has a component in
    /// both.
    pub fn try_merge(&mut self, other: &mut Self) -> Result<(), ComponentError> {
        if let Some(&entity) = other.entities.iter().find(|&&entity| self.contains(entity)) {
            return Err(ComponentError::AlreadyPresent(entity));
        }

        if other.is_empty() {
            return Ok(());
        }

        debug!(
            component = type_name::<C>(),
            len = self.len(),
            merged = other.len(),
            "merging components",
        );

        self.components.reserve(other.len());
        self.entities.reserve(other.len());
        self.sparse.reserve_slots(other.sparse.slots_len());

        let start = self.len();

        for (entity, component) in
            other.entities.iter().copied().zip(other.components.drain(..))
        {
            self.sparse.insert(entity, self.components.len());
            self.components.push(component);
            self.entities.push(entity);
            self.registry.on_component_added(entity);
        }

        // `other` lets go only after the entities were attached here, so they
        // are never recycled in between
        for &entity in &self.entities[start..] {
            other.registry.on_component_removed(entity);
        }

        other.entities.clear();
        other.sparse.clear();

        Ok(())
    }

    /// Fixes up the sparse entries of the entities in a dense range.
    fn reindex(&mut self, range: std::ops::Range<usize>) {
        for index in range {
            self.sparse.insert(self.entities[index], index);
        }
    }
}

impl<C: Component> ComponentManager<C> {
    /// Attaches a default component to `entity`, returning a reference to it.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is [`Entity::INVALID`] or already has a component in
    /// this store.
    pub fn create(&mut self, entity: Entity) -> &mut C {
        self.create_with(entity, C::default())
    }

    /// Attaches a default component to `entity`, returning a reference to it.
    ///
    /// Fails without changing anything if the entity is
    /// [`Entity::INVALID`] or already has a component in this store.
    pub fn try_create(&mut self, entity: Entity) -> Result<&mut C, ComponentError> {
        self.try_create_with(entity, C::default())
    }

    /// Reads or writes this store, depending on the archive's mode.
    ///
    /// Written as the component count, every component, then every owning
    /// entity, all in dense order. Reading first clears the store and resolves
    /// the persisted entities through `seri`. If reading fails, the store is
    /// left empty.
    pub fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        if archive.is_read_mode() {
            self.read(archive, seri)
        } else {
            self.write(archive, seri)
        }
    }

    fn read<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        self.clear();

        let count = archive.read_len()?;
        let mut components = mem::take(&mut self.components);

        components.reserve(count.min(MAX_PREALLOCATION));

        for _ in 0..count {
            let mut component = C::default();

            component.persist(archive, seri)?;
            components.push(component);
        }

        let mut entities = mem::take(&mut self.entities);
        let mut max_entity = 0;

        entities.reserve(count.min(MAX_PREALLOCATION));

        for _ in 0..count {
            let mut entity = Entity::INVALID;

            serialize_entity(archive, &mut entity, seri)?;

            // can't be minted, so it never owns a component
            if entity.to_raw() == u32::MAX {
                return Err(ArchiveError::InvalidStoreEntity(entity));
            }

            max_entity = max_entity.max(entity.sparse_index());
            entities.push(entity);
        }

        // grow once for the whole batch
        self.sparse.reserve_slots(max_entity + 1);

        for (index, &entity) in entities.iter().enumerate() {
            if !entity.is_valid() || self.sparse.insert(entity, index).is_some() {
                self.sparse.clear();

                return Err(ArchiveError::InvalidStoreEntity(entity));
            }
        }

        self.registry.on_components_loaded(&entities);

        self.components = components;
        self.entities = entities;

        debug!(
            component = type_name::<C>(),
            len = count,
            max_entity,
            "read components",
        );

        Ok(())
    }

    fn write<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        archive.write_len(self.len())?;

        for component in &mut self.components {
            component.persist(archive, seri)?;
        }

        for entity in &mut self.entities {
            serialize_entity(archive, entity, seri)?;
        }

        debug!(component = type_name::<C>(), len = self.len(), "wrote components");

        Ok(())
    }
}

impl<C> Default for ComponentManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Drop for ComponentManager<C> {
    fn drop(&mut self) {
        for &entity in &self.entities {
            self.registry.on_component_removed(entity);
        }
    }
}

impl<C> Index<usize> for ComponentManager<C> {
    type Output = C;

    fn index(&self, index: usize) -> &Self::Output {
        &self.components[index]
    }
}

impl<C> IndexMut<usize> for ComponentManager<C> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.components[index]
    }
}

impl<C: fmt::Debug> fmt::Debug for ComponentManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
