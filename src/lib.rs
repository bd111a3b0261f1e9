//! Sparse-set component storage keyed by recyclable entities.
//!
//! An [`EntityRegistry`] hands out [`Entity`] keys. Each component type lives
//! in its own [`ComponentManager`], which packs components densely for
//! iteration and maps entities to them through a sparse array. Stores report
//! attachments to their registry, which recycles an entity once no store
//! holds a component for it anymore.
//!
//! ```
//! use std::sync::Arc;
//!
//! use sparseworld::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq, Persist)]
//! struct Health(u32);
//!
//! let registry = Arc::new(EntityRegistry::new());
//! let mut health = ComponentManager::<Health>::with_registry(Arc::clone(&registry));
//!
//! let entity = registry.create_entity();
//!
//! health.create(entity).0 = 100;
//!
//! assert_eq!(health.get(entity), Some(&Health(100)));
//!
//! health.remove(entity);
//!
//! // the entity is free to be reused
//! assert_eq!(registry.create_entity(), entity);
//! ```

#![forbid(unsafe_code)]

// allows referencing this crate as `sparseworld` in derives
extern crate self as sparseworld;

pub mod component;
pub mod entity;
pub mod jobs;
pub mod serialize;
pub mod storage;

pub use crate::component::{Component, ComponentManager};
pub use crate::entity::{Entity, EntityRegistry};

/// Re-export of all items in this crate.
pub mod prelude {
    pub use crate::component::*;
    pub use crate::entity::*;
    pub use crate::jobs::*;
    pub use crate::serialize::*;
}
