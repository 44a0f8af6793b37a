//! Surface trait.

use crate::error::{SurfaceError, SurfaceResult};

/// A byte region addressed by offset, accessed only through copies.
pub trait Surface {
    /// Size in bytes.
    fn len(&self) -> usize;

    /// Copy `out.len()` bytes starting at `offset` into `out`.
    fn read(&self, offset: usize, out: &mut [u8]) -> SurfaceResult<()>;

    /// Copy `data` into the surface starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> SurfaceResult<()>;

    /// True for a zero-sized surface.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail with `OutOfBounds` unless `offset..offset + len` lies inside the surface.
    fn check_range(&self, offset: usize, len: usize) -> SurfaceResult<()> {
        let size = self.len();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(SurfaceError::OutOfBounds { offset, len, size }),
        }
    }
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> SurfaceResult<()> {
        (**self).read(offset, out)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> SurfaceResult<()> {
        (**self).write(offset, data)
    }
}
