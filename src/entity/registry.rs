use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::Entity;

/// Mints, tracks, and recycles entities.
///
/// Every [`ComponentManager`](crate::ComponentManager) reports attachments and
/// detachments to the registry it was created with. An entity is recycled as
/// soon as the last store holding a component for it lets go.
///
/// All methods take `&self` and are safe to call from any thread.
#[derive(Debug)]
pub struct EntityRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Debug)]
struct RegistryState {
    next_id: u32,
    free_ids: Vec<Entity>,
    component_counts: HashMap<Entity, usize>,
    reused: u32,
}

impl EntityRegistry {
    /// Creates an empty registry. The first entity it creates is `1`.
    pub fn new() -> Self {
        Self { state: Mutex::new(RegistryState::new()) }
    }

    /// The process-wide registry.
    ///
    /// Used by stores and serializers that aren't given one explicitly.
    pub fn global() -> &'static Arc<Self> {
        static GLOBAL: OnceLock<Arc<EntityRegistry>> = OnceLock::new();

        GLOBAL.get_or_init(Default::default)
    }

    /// Creates a new entity, reusing the most recently freed one if possible.
    ///
    /// Never returns [`Entity::INVALID`].
    pub fn create_entity(&self) -> Entity {
        let mut state = self.state.lock();

        if let Some(entity) = state.free_ids.pop() {
            state.reused += 1;
            trace!(%entity, "reused entity");

            entity
        } else {
            let entity = Entity::from_raw(state.next_id);

            state.next_id = state.next_id.checked_add(1).expect("entity overflow");
            trace!(%entity, "minted entity");

            entity
        }
    }

    /// Records that a store attached a component to `entity`.
    pub fn on_component_added(&self, entity: Entity) {
        *self.state.lock().component_counts.entry(entity).or_default() += 1;
    }

    /// Records that a store loaded a component for each of `entities`.
    ///
    /// Loaded entities weren't necessarily created by this registry. They are
    /// taken off the free list and future entities are minted past the largest
    /// one, so [`EntityRegistry::create_entity`] never returns a loaded entity
    /// while it's in use. Entities skipped over that way become free.
    ///
    /// # Panics
    ///
    /// Panics if `entities` contains the largest possible entity.
    pub fn on_components_loaded(&self, entities: &[Entity]) {
        let Some(max) = entities.iter().map(|entity| entity.to_raw()).max() else {
            return;
        };
        let mut state = self.state.lock();

        if max >= state.next_id {
            let skipped = (state.next_id..=max).rev().map(Entity::from_raw);

            state.free_ids.extend(skipped);
            state.next_id = max.checked_add(1).expect("entity overflow");
            trace!(next = state.next_id, "minting past loaded entities");
        }

        if !state.free_ids.is_empty() {
            let loaded: HashSet<_> = entities.iter().copied().collect();

            state.free_ids.retain(|entity| !loaded.contains(entity));
        }

        for &entity in entities {
            *state.component_counts.entry(entity).or_default() += 1;
        }
    }

    /// Records that a store detached a component from `entity`.
    ///
    /// When the count reaches zero the entity becomes available to
    /// [`EntityRegistry::create_entity`] again, even if something outside of
    /// the component stores still holds on to it. Entities aren't versioned, so
    /// such a stale handle will alias whatever entity is created next.
    ///
    /// Does nothing if the entity isn't tracked.
    pub fn on_component_removed(&self, entity: Entity) {
        let mut state = self.state.lock();

        let Some(count) = state.component_counts.get_mut(&entity) else {
            warn!(%entity, "component removed from an untracked entity");

            return;
        };

        *count -= 1;

        if *count == 0 {
            state.component_counts.remove(&entity);
            state.free_ids.push(entity);
        }
    }

    /// The amount of entities currently in use.
    ///
    /// Includes entities that have been created but have no components yet.
    pub fn current_entity_count(&self) -> u32 {
        let state = self.state.lock();

        (state.next_id - 1).saturating_sub(state.free_ids.len() as u32)
    }

    /// How many times an entity was served from the free list.
    pub fn reused_id_count(&self) -> u32 {
        self.state.lock().reused
    }

    /// The amount of stores holding a component for `entity`.
    pub fn component_count(&self, entity: Entity) -> usize {
        self.state.lock().component_counts.get(&entity).copied().unwrap_or_default()
    }

    /// Resets the registry to its initial state.
    ///
    /// Entities handed out before this call become meaningless. Stores that
    /// still hold components should be cleared first.
    pub fn clear(&self) {
        let mut state = self.state.lock();

        debug!(
            issued = state.next_id - 1,
            free = state.free_ids.len(),
            "clearing entity registry",
        );

        *state = RegistryState::new();
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryState {
    fn new() -> Self {
        Self {
            next_id: Entity::INVALID.to_raw() + 1,
            free_ids: Vec::new(),
            component_counts: HashMap::new(),
            reused: 0,
        }
    }
}

/// Creates an entity in the [global registry](EntityRegistry::global).
pub fn create_entity() -> Entity {
    EntityRegistry::global().create_entity()
}

/// The amount of entities in use in the [global
/// registry](EntityRegistry::global).
pub fn current_entity_count() -> u32 {
    EntityRegistry::global().current_entity_count()
}

/// How many entities the [global registry](EntityRegistry::global) has reused.
pub fn reused_entity_ids() -> u32 {
    EntityRegistry::global().reused_id_count()
}
