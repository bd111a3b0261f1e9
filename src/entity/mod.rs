//! Defines entities, the opaque keys components are attached to.

use std::fmt;

pub use self::registry::*;
use crate::storage::SparseIndex;

mod registry;

/// An identifier for an entity.
///
/// Entities carry no data and own no memory. They are keys handed out by an
/// [`EntityRegistry`] and recycled once the last component attached to them
/// is removed.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// The null entity. Never issued by a registry.
    pub const INVALID: Self = Self(0);

    /// Reinterprets a raw value as an entity.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this entity.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is not [`Entity::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Entity({})", self.0)
        } else {
            f.write_str("Entity(INVALID)")
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Entity> for u32 {
    fn from(entity: Entity) -> Self {
        entity.0
    }
}

impl SparseIndex for Entity {
    fn sparse_index(&self) -> usize {
        self.0 as _
    }
}
