use super::{serialize_entity, Archive, ArchiveError, EntitySerializer, MAX_PREALLOCATION};
use crate::Entity;

/// A value that reads and writes itself through an [`Archive`].
///
/// A single method handles both directions: when the archive
/// [is in read mode](Archive::is_read_mode) `self` is overwritten with what
/// was read, otherwise `self` is written out. Values containing
/// [`Entity`]s must persist them through the [`EntitySerializer`] so they can
/// be remapped on load, which the `Entity` implementation does.
///
/// Can be derived for structs with `#[derive(Persist)]`.
pub trait Persist {
    /// Reads or writes `self`, depending on the archive's mode.
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError>;
}

macro_rules! impl_persist_for_num {
    ($($t:ty),* $(,)?) => {
        $(
            impl Persist for $t {
                fn persist<A: Archive + ?Sized>(
                    &mut self,
                    archive: &mut A,
                    _seri: &mut EntitySerializer,
                ) -> Result<(), ArchiveError> {
                    if archive.is_read_mode() {
                        let mut buf = [0; size_of::<$t>()];

                        archive.read_bytes(&mut buf)?;
                        *self = <$t>::from_le_bytes(buf);

                        Ok(())
                    } else {
                        archive.write_bytes(&self.to_le_bytes())
                    }
                }
            }
        )*
    };
}

impl_persist_for_num!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Persist for usize {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        _seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        if archive.is_read_mode() {
            *self = archive.read_len()?;

            Ok(())
        } else {
            archive.write_len(*self)
        }
    }
}

impl Persist for bool {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        _seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        if archive.is_read_mode() {
            let mut buf = [0];

            archive.read_bytes(&mut buf)?;
            *self = match buf[0] {
                0 => false,
                1 => true,
                byte => return Err(ArchiveError::InvalidBool(byte)),
            };

            Ok(())
        } else {
            archive.write_bytes(&[*self as u8])
        }
    }
}

impl Persist for String {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        _seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        if archive.is_read_mode() {
            let len = archive.read_len()?;

            *self = String::from_utf8(archive.read_byte_vec(len)?)?;

            Ok(())
        } else {
            archive.write_len(self.len())?;
            archive.write_bytes(self.as_bytes())
        }
    }
}

impl<T: Persist + Default> Persist for Vec<T> {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        if archive.is_read_mode() {
            let len = archive.read_len()?;

            self.clear();
            self.reserve(len.min(MAX_PREALLOCATION));

            for _ in 0..len {
                let mut value = T::default();

                value.persist(archive, seri)?;
                self.push(value);
            }
        } else {
            archive.write_len(self.len())?;

            for value in self {
                value.persist(archive, seri)?;
            }
        }

        Ok(())
    }
}

impl<T: Persist + Default> Persist for Option<T> {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        let mut is_some = self.is_some();

        is_some.persist(archive, seri)?;

        if archive.is_read_mode() {
            *self = is_some.then(T::default);
        }

        match self {
            Some(value) => value.persist(archive, seri),
            None => Ok(()),
        }
    }
}

impl<T: Persist, const N: usize> Persist for [T; N] {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        for value in self {
            value.persist(archive, seri)?;
        }

        Ok(())
    }
}

impl Persist for Entity {
    fn persist<A: Archive + ?Sized>(
        &mut self,
        archive: &mut A,
        seri: &mut EntitySerializer,
    ) -> Result<(), ArchiveError> {
        serialize_entity(archive, self, seri)
    }
}
