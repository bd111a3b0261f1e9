//! Components and the sparse-set stores that hold them.

use thiserror::Error;

pub use self::config::*;
pub use self::manager::*;
use crate::serialize::Persist;
use crate::Entity;

mod config;
mod manager;

/// A value that can be attached to an entity.
///
/// Components are created in place by their store, so they must have a
/// default. They also have to know how to persist themselves.
pub trait Component: Persist + Default + Send + Sync + 'static {}

impl<C: Persist + Default + Send + Sync + 'static> Component for C {}

/// An error for when a component can't be attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// Components can't be attached to [`Entity::INVALID`].
    #[error("cannot attach a component to the invalid entity")]
    InvalidEntity,
    /// The store already holds a component for the entity.
    #[error("entity {0:?} already has this component")]
    AlreadyPresent(Entity),
}
