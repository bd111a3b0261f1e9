use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::prelude::*;

#[derive(Debug, Default, Clone, PartialEq, Persist)]
struct Value(u32);

#[derive(Debug, Default, Clone, PartialEq, Persist)]
struct Parent {
    target: Entity,
}

#[derive(Debug, Default, Clone, PartialEq, Persist)]
struct Mesh {
    name: String,
    vertices: Vec<[f32; 3]>,
    material: Option<Entity>,
    visible: bool,
    #[persist(skip)]
    dirty: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Persist)]
struct Sample(u16, #[persist(skip)] u32, u8);

fn registry() -> Arc<EntityRegistry> {
    Arc::new(EntityRegistry::new())
}

fn entity(raw: u32) -> Entity {
    Entity::from_raw(raw)
}

fn write<C: Component>(store: &mut ComponentManager<C>) -> MemoryArchive {
    let mut archive = MemoryArchive::writer();
    let mut seri = EntitySerializer::with_registry(Arc::clone(store.registry()));

    store.persist(&mut archive, &mut seri).unwrap();

    archive
}

#[test]
fn layout_is_count_components_entities() {
    let registry = registry();
    let mut store = ComponentManager::with_registry(Arc::clone(&registry));

    store.create_with(entity(2), Value(0xaa));
    store.create_with(entity(7), Value(0xbb));

    let bytes = write(&mut store).into_bytes();
    let mut expected = Vec::new();

    expected.extend(2u64.to_le_bytes());
    expected.extend(0xaau32.to_le_bytes());
    expected.extend(0xbbu32.to_le_bytes());
    expected.extend(2u64.to_le_bytes());
    expected.extend(7u64.to_le_bytes());

    assert_eq!(bytes, expected);
}

#[test]
fn round_trip_without_remap() {
    let registry = registry();
    let mut store = ComponentManager::with_registry(Arc::clone(&registry));

    store.create_with(entity(2), Value(1));
    store.create_with(entity(7), Value(2));

    let mut archive = write(&mut store).into_reader();
    let loaded_registry = self::registry();
    let mut loaded = ComponentManager::<Value>::with_registry(Arc::clone(&loaded_registry));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&loaded_registry)).with_remap(false);

    loaded.persist(&mut archive, &mut seri).unwrap();

    assert_eq!(loaded.entities(), [entity(2), entity(7)]);
    assert_eq!(loaded.components(), [Value(1), Value(2)]);
    assert_eq!(loaded.index_of(entity(7)), Some(1));
    assert!(loaded.sparse_len() > 7);
    assert_eq!(loaded_registry.component_count(entity(2)), 1);
    assert_eq!(archive.remaining(), 0);
    assert_eq!(seri.remapped().len(), 0);
}

#[test]
fn reading_replaces_contents() {
    let registry = registry();
    let mut store = ComponentManager::with_registry(Arc::clone(&registry));

    store.create_with(entity(3), Value(3));

    let mut archive = write(&mut store).into_reader();
    let mut target = ComponentManager::with_registry(Arc::clone(&registry));

    target.create_with(entity(9), Value(9));

    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry)).with_remap(false);

    target.persist(&mut archive, &mut seri).unwrap();

    assert_eq!(target.entities(), [entity(3)]);
    assert!(!target.contains(entity(9)));
    assert_eq!(registry.component_count(entity(9)), 0);
    assert_eq!(registry.component_count(entity(3)), 2);
}

#[test]
fn remap_resolves_many_to_one() {
    let registry = registry();
    let mut store = ComponentManager::with_registry(Arc::clone(&registry));

    store.create_with(entity(1), Parent { target: entity(1000) });
    store.create_with(entity(2), Parent { target: entity(1000) });

    let mut archive = write(&mut store).into_reader();
    // a populated world to load into
    let live = self::registry();

    for _ in 0..10 {
        live.create_entity();
    }

    let mut loaded = ComponentManager::<Parent>::with_registry(Arc::clone(&live));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&live));

    loaded.persist(&mut archive, &mut seri).unwrap();

    let [a, b] = [&loaded[0], &loaded[1]];

    assert_eq!(a.target, b.target);
    assert!(a.target.to_raw() > 10);
    assert!(!loaded.contains(entity(1)));
    assert!(!loaded.contains(entity(2)));

    for owner in loaded.entities() {
        assert!(owner.to_raw() > 10);
        assert_ne!(*owner, a.target);
    }

    // payloads are read before owners, so `1000` was seen first
    let remapped: Vec<_> = seri.remapped().map(|(persisted, _)| persisted).collect();

    assert_eq!(remapped, [1000, 1, 2]);
    assert_eq!(seri.resolve(1000).unwrap(), a.target);
}

#[test]
fn remap_is_shared_across_stores() {
    let registry = registry();
    let mut values = ComponentManager::with_registry(Arc::clone(&registry));
    let mut parents = ComponentManager::with_registry(Arc::clone(&registry));

    values.create_with(entity(4), Value(40));
    values.create_with(entity(5), Value(50));
    parents.create_with(entity(5), Parent { target: entity(4) });

    let mut values_archive = write(&mut values).into_reader();
    let mut parents_archive = write(&mut parents).into_reader();

    let live = self::registry();
    let mut loaded_values = ComponentManager::<Value>::with_registry(Arc::clone(&live));
    let mut loaded_parents = ComponentManager::<Parent>::with_registry(Arc::clone(&live));

    {
        let mut seri = EntitySerializer::with_registry(Arc::clone(&live));

        loaded_values.persist(&mut values_archive, &mut seri).unwrap();
        loaded_parents.persist(&mut parents_archive, &mut seri).unwrap();
    }

    let child = loaded_parents.entity(0);
    let parent = loaded_parents[0].target;

    assert_eq!(loaded_values.get(child), Some(&Value(50)));
    assert_eq!(loaded_values.get(parent), Some(&Value(40)));
    assert_eq!(live.component_count(child), 2);
    assert_eq!(live.component_count(parent), 1);
}

#[test]
fn null_entity_stays_null() {
    let registry = registry();
    let mut store = ComponentManager::with_registry(Arc::clone(&registry));

    store.create_with(entity(1), Parent::default());

    let mut archive = write(&mut store).into_reader();
    let live = self::registry();
    let mut loaded = ComponentManager::<Parent>::with_registry(Arc::clone(&live));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&live));

    loaded.persist(&mut archive, &mut seri).unwrap();

    assert_eq!(loaded[0].target, Entity::INVALID);
    // only the owner was created
    assert_eq!(live.current_entity_count(), 1);
}

#[test]
fn derived_payload_round_trips() {
    let registry = registry();
    let mesh = Mesh {
        name: "cube".into(),
        vertices: vec![[0.0, 1.0, 2.0], [-1.5, 0.25, 8.0]],
        material: Some(entity(3)),
        visible: true,
        dirty: true,
    };

    let mut meshes = ComponentManager::with_registry(Arc::clone(&registry));

    meshes.create_with(entity(1), mesh.clone());
    meshes.create_with(entity(2), Mesh::default());

    let mut archive = write(&mut meshes).into_reader();
    let mut loaded = ComponentManager::<Mesh>::with_registry(Arc::clone(&registry));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry)).with_remap(false);

    loaded.persist(&mut archive, &mut seri).unwrap();

    assert_eq!(loaded.get(entity(1)), Some(&Mesh { dirty: false, ..mesh }));
    assert_eq!(loaded.get(entity(2)), Some(&Mesh::default()));
}

#[test]
fn derived_tuple_skips_fields() {
    let mut seri = EntitySerializer::with_registry(registry());
    let mut archive = MemoryArchive::writer();

    Sample(0x0102, 7, 3).persist(&mut archive, &mut seri).unwrap();

    assert_eq!(archive.as_bytes(), [0x02, 0x01, 0x03]);

    let mut loaded = Sample(0, 9, 0);

    loaded.persist(&mut archive.into_reader(), &mut seri).unwrap();

    assert_eq!(loaded, Sample(0x0102, 9, 3));
}

#[test]
fn truncated_archive_leaves_store_empty() {
    let registry = registry();
    let mut store = ComponentManager::with_registry(Arc::clone(&registry));

    store.create_with(entity(1), Value(1));
    store.create_with(entity(2), Value(2));

    let mut bytes = write(&mut store).into_bytes();

    bytes.truncate(bytes.len() - 4);

    let mut loaded = ComponentManager::<Value>::with_registry(Arc::clone(&registry));

    loaded.create_with(entity(5), Value(5));

    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry)).with_remap(false);
    let error = loaded.persist(&mut MemoryArchive::reader(bytes), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::UnexpectedEof { needed: 8, remaining: 4 }));
    assert!(loaded.is_empty());
    assert!(!loaded.contains(entity(5)));
    assert_eq!(registry.component_count(entity(2)), 1);
}

#[test]
fn duplicate_owner_is_rejected() {
    let mut archive = MemoryArchive::writer();

    archive.write_u64(2).unwrap();
    archive.write_bytes(&1u32.to_le_bytes()).unwrap();
    archive.write_bytes(&2u32.to_le_bytes()).unwrap();
    archive.write_u64(6).unwrap();
    archive.write_u64(6).unwrap();

    let registry = registry();
    let mut loaded = ComponentManager::<Value>::with_registry(Arc::clone(&registry));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry)).with_remap(false);
    let error = loaded.persist(&mut archive.into_reader(), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::InvalidStoreEntity(e) if e == entity(6)));
    assert!(loaded.is_empty());
    assert!(!loaded.contains(entity(6)));
    assert_eq!(registry.component_count(entity(6)), 0);
}

#[test]
fn unmintable_owner_is_rejected() {
    let mut archive = MemoryArchive::writer();

    archive.write_u64(1).unwrap();
    archive.write_bytes(&1u32.to_le_bytes()).unwrap();
    archive.write_u64(u64::from(u32::MAX)).unwrap();

    let registry = registry();
    let mut loaded = ComponentManager::<Value>::with_registry(Arc::clone(&registry));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry)).with_remap(false);
    let error = loaded.persist(&mut archive.into_reader(), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::InvalidStoreEntity(e) if e.to_raw() == u32::MAX));
    assert!(loaded.is_empty());
    assert_eq!(registry.current_entity_count(), 0);
}

#[test]
fn huge_count_without_body_is_truncated() {
    let mut archive = MemoryArchive::writer();

    archive.write_u64(1 << 40).unwrap();

    let registry = registry();
    let mut loaded = ComponentManager::<Value>::with_registry(Arc::clone(&registry));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry));
    let error = loaded.persist(&mut archive.into_reader(), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::UnexpectedEof { needed: 4, remaining: 0 }));
    assert!(loaded.is_empty());
}

#[test]
fn huge_lengths_are_truncated() {
    let mut seri = EntitySerializer::with_registry(registry());

    let mut archive = MemoryArchive::writer();

    archive.write_u64(u64::MAX >> 1).unwrap();
    archive.write_bytes(b"abc").unwrap();

    let mut name = String::from("kept?");
    let error = name.persist(&mut archive.into_reader(), &mut seri).unwrap_err();

    assert!(matches!(
        error,
        ArchiveError::UnexpectedEof { needed: MAX_PREALLOCATION, remaining: 3 },
    ));

    let mut archive = MemoryArchive::writer();

    archive.write_u64(1 << 40).unwrap();
    archive.write_bytes(&7u32.to_le_bytes()).unwrap();

    let mut values = vec![1u32, 2, 3];
    let error = values.persist(&mut archive.into_reader(), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::UnexpectedEof { needed: 4, remaining: 0 }));
    assert_eq!(values, [7]);
}

#[test]
fn identity_reload_is_never_reissued() {
    let mut archive = MemoryArchive::writer();

    archive.write_u64(2).unwrap();
    archive.write_bytes(&20u32.to_le_bytes()).unwrap();
    archive.write_bytes(&30u32.to_le_bytes()).unwrap();
    archive.write_u64(2).unwrap();
    archive.write_u64(3).unwrap();

    let registry = registry();
    let mut loaded = ComponentManager::<Value>::with_registry(Arc::clone(&registry));
    let mut seri = EntitySerializer::with_registry(Arc::clone(&registry)).with_remap(false);

    loaded.persist(&mut archive.into_reader(), &mut seri).unwrap();

    // 1 was skipped over, so it's free
    assert_eq!(registry.current_entity_count(), 2);

    loaded.remove(entity(3));

    let created: Vec<_> = (0..3).map(|_| registry.create_entity()).collect();

    assert_eq!(created, [entity(3), entity(1), entity(4)]);
    assert!(loaded.contains(entity(2)));
    assert_eq!(registry.component_count(entity(2)), 1);
}

#[test]
fn oversized_entity_without_remap() {
    let mut archive = MemoryArchive::writer();

    archive.write_u64(u64::from(u32::MAX) + 1).unwrap();

    let mut seri = EntitySerializer::with_registry(registry()).with_remap(false);
    let mut target = Entity::INVALID;
    let error =
        serialize_entity(&mut archive.into_reader(), &mut target, &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::EntityOverflow(_)));
}

#[test]
fn wrong_mode_is_an_error() {
    let mut archive = MemoryArchive::reader(Vec::<u8>::new());

    assert!(matches!(
        archive.write_u64(1),
        Err(ArchiveError::WrongMode { expected: ArchiveMode::Write }),
    ));

    let mut archive = MemoryArchive::writer();

    assert!(matches!(
        archive.read_u64(),
        Err(ArchiveError::WrongMode { expected: ArchiveMode::Read }),
    ));
}

#[test]
fn invalid_bool_and_utf8() {
    let mut seri = EntitySerializer::with_registry(registry());
    let mut flag = false;
    let error = flag.persist(&mut MemoryArchive::reader([2u8]), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::InvalidBool(2)));

    let mut bytes = 2u64.to_le_bytes().to_vec();

    bytes.extend([0xff, 0xfe]);

    let mut text = String::new();
    let error = text.persist(&mut MemoryArchive::reader(bytes), &mut seri).unwrap_err();

    assert!(matches!(error, ArchiveError::InvalidUtf8(_)));
}

/// A payload that decodes itself in the background after being read.
#[derive(Debug, Default)]
struct Texture {
    encoded: Vec<u8>,
    decoded: Arc<Mutex<Option<Vec<u8>>>>,
}

impl Persist for Texture {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        self.encoded.persist(archive, seri)?;

        if archive.is_read_mode() {
            let encoded = self.encoded.clone();
            let decoded = Arc::clone(&self.decoded);

            seri.jobs().execute(move || {
                thread::sleep(Duration::from_millis(10));
                *decoded.lock() = Some(encoded.into_iter().rev().collect());
            });
        }

        Ok(())
    }
}

#[test]
fn serializer_waits_for_jobs_on_drop() {
    let registry = registry();
    let mut textures = ComponentManager::with_registry(Arc::clone(&registry));

    textures.create_with(entity(1), Texture { encoded: vec![1, 2, 3], ..Default::default() });
    textures.create_with(entity(2), Texture { encoded: vec![4, 5], ..Default::default() });

    let mut archive = write(&mut textures).into_reader();
    let mut loaded = ComponentManager::<Texture>::with_registry(Arc::clone(&registry));

    {
        let mut seri = EntitySerializer::with_registry(Arc::clone(&registry))
            .with_jobs(JobContext::default());

        loaded.persist(&mut archive, &mut seri).unwrap();
    }

    let decoded: Vec<_> = loaded
        .components()
        .iter()
        .map(|texture| texture.decoded.lock().clone())
        .collect();

    assert_eq!(decoded, [Some(vec![3, 2, 1]), Some(vec![5, 4])]);
}
