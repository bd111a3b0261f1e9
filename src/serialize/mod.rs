//! Persisting component stores through a byte stream.
//!
//! A store is persisted as its component count, then every component in dense
//! order, then every owning entity in dense order. Entities are remapped on
//! load by an [`EntitySerializer`].

pub use sparseworld_macros::Persist;

pub use self::archive::*;
pub use self::persist::*;
pub use self::remap::*;

mod archive;
mod persist;
mod remap;
#[cfg(test)]
mod tests;
