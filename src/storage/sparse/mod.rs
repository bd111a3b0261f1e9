use std::slice;

pub use self::map::*;

mod map;

/// Trait for types that can provide a `usize` index for a sparse type.
pub trait SparseIndex {
    /// The index into a sparse datatype that this value represents.
    fn sparse_index(&self) -> usize;
}

/// Iterator over the filled slots of a sparse datatype, with their index.
pub struct SparseIter<'a, T> {
    inner: std::iter::Enumerate<slice::Iter<'a, Option<T>>>,
    /// The amount of filled slots left.
    len: usize,
}

impl SparseIndex for usize {
    fn sparse_index(&self) -> usize {
        *self
    }
}

impl<'a, T> Iterator for SparseIter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.inner.by_ref() {
            if let Some(value) = slot {
                self.len -= 1;

                return Some((index, value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T> ExactSizeIterator for SparseIter<'_, T> {}
