use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{Archive, ArchiveError};
use crate::jobs::JobContext;
use crate::{Entity, EntityRegistry};

/// Translates persisted entities into live ones while loading.
///
/// Every persisted value is resolved to a single live entity for the lifetime
/// of the serializer, so components in different stores that referred to the
/// same entity when saved still do after loading into a populated world.
///
/// Payloads may offload work through [`EntitySerializer::jobs`]. Dropping the
/// serializer blocks until that work has finished.
#[derive(Debug)]
pub struct EntitySerializer {
    jobs: JobContext,
    remap: IndexMap<u64, Entity>,
    allow_remap: bool,
    registry: Arc<EntityRegistry>,
}

impl EntitySerializer {
    /// Creates a remapping serializer using the [global
    /// registry](EntityRegistry::global).
    pub fn new() -> Self {
        Self::with_registry(Arc::clone(EntityRegistry::global()))
    }

    /// Creates a remapping serializer that creates entities in `registry`.
    pub fn with_registry(registry: Arc<EntityRegistry>) -> Self {
        Self {
            jobs: JobContext::default(),
            remap: IndexMap::new(),
            allow_remap: true,
            registry,
        }
    }

    /// Replaces the context payloads enqueue work on.
    ///
    /// Waits for work already enqueued on the previous context.
    pub fn with_jobs(mut self, jobs: JobContext) -> Self {
        self.jobs.wait();
        self.jobs = jobs;

        self
    }

    /// Sets whether persisted entities are remapped.
    ///
    /// When disabled, persisted values are used as live entities as-is. This is
    /// for reloading into the registry the data was saved from. Stores reading
    /// such entities claim them from their registry, so it won't create them
    /// again while they're in use.
    pub fn with_remap(mut self, allow_remap: bool) -> Self {
        self.allow_remap = allow_remap;

        self
    }

    /// Returns `true` if persisted entities are remapped.
    pub fn allow_remap(&self) -> bool {
        self.allow_remap
    }

    /// Sets whether persisted entities are remapped.
    pub fn set_allow_remap(&mut self, allow_remap: bool) {
        self.allow_remap = allow_remap;
    }

    /// The registry new entities are created in.
    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// The context to enqueue asynchronous deserialization work on.
    pub fn jobs(&self) -> &JobContext {
        &self.jobs
    }

    /// Resolves a persisted entity to a live one.
    ///
    /// The persisted null entity always resolves to [`Entity::INVALID`].
    pub fn resolve(&mut self, persisted: u64) -> Result<Entity, ArchiveError> {
        if persisted == u64::from(Entity::INVALID.to_raw()) {
            return Ok(Entity::INVALID);
        }

        if !self.allow_remap {
            return u32::try_from(persisted)
                .map(Entity::from_raw)
                .map_err(|_| ArchiveError::EntityOverflow(persisted));
        }

        let registry = &self.registry;

        Ok(*self.remap.entry(persisted).or_insert_with(|| registry.create_entity()))
    }

    /// The persisted entities resolved so far and what they resolved to, in
    /// the order they were first seen.
    ///
    /// Waits for outstanding work first, as it may still be resolving
    /// entities.
    pub fn remapped(&self) -> impl ExactSizeIterator<Item = (u64, Entity)> + '_ {
        self.wait();

        self.remap.iter().map(|(&persisted, &entity)| (persisted, entity))
    }

    /// Blocks until all work enqueued on [`EntitySerializer::jobs`] has
    /// finished.
    pub fn wait(&self) {
        if self.jobs.is_busy() {
            debug!(pending = self.jobs.pending(), "waiting for deserialization jobs");
        }

        self.jobs.wait();
    }
}

impl Default for EntitySerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EntitySerializer {
    fn drop(&mut self) {
        self.wait();
    }
}

/// Reads or writes an entity.
///
/// Entities are persisted as 64-bit values. When reading, the value is
/// resolved through [`EntitySerializer::resolve`].
pub fn serialize_entity<A: Archive + ?Sized>(
    archive: &mut A,
    entity: &mut Entity,
    seri: &mut EntitySerializer,
) -> Result<(), ArchiveError> {
    if archive.is_read_mode() {
        let persisted = archive.read_u64()?;

        *entity = seri.resolve(persisted)?;

        Ok(())
    } else {
        archive.write_u64(u64::from(entity.to_raw()))
    }
}
