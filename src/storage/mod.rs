//! Low-level storage shared by the component stores.

pub use self::sparse::*;

mod sparse;
