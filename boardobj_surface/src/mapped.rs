//! File-backed surface.
//!
//! Maps a regular file (or a file under `/dev/shm`) shared read/write so a
//! host process and the runtime can exchange commands through it.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::{debug, info};

use crate::error::{SurfaceError, SurfaceResult};
use crate::surface::Surface;

/// Surface backed by a shared memory mapping of a file.
pub struct MappedSurface {
    path: PathBuf,
    mmap: MmapMut,
}

impl MappedSurface {
    /// Create (or truncate) `path` to `size` zero bytes and map it.
    pub fn create(path: &Path, size: usize) -> SurfaceResult<Self> {
        if size == 0 {
            return Err(SurfaceError::InvalidSize { size });
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size as u64)?;

        // SAFETY: the mapping is only accessed through bounded copies; a
        // concurrent writer in another process can change bytes but never
        // invalidate the mapping's length, which was fixed above.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        info!("Created surface {} ({} bytes)", path.display(), size);
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Map an existing file at its current length.
    pub fn open(path: &Path) -> SurfaceResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let size = file.metadata()?.len() as usize;
        if size == 0 {
            return Err(SurfaceError::InvalidSize { size });
        }

        // SAFETY: see `create`.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        debug!("Attached surface {} ({} bytes)", path.display(), size);
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush outstanding writes to the backing file.
    pub fn flush(&self) -> SurfaceResult<()> {
        self.mmap.flush()?;
        Ok(())
    }
}

impl Surface for MappedSurface {
    fn len(&self) -> usize {
        self.mmap.len()
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> SurfaceResult<()> {
        self.check_range(offset, out.len())?;
        out.copy_from_slice(&self.mmap[offset..offset + out.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> SurfaceResult<()> {
        self.check_range(offset, data.len())?;
        self.mmap[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl std::fmt::Debug for MappedSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedSurface")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}
