//! Heap-backed surface.

use crate::error::{SurfaceError, SurfaceResult};
use crate::surface::Surface;

/// Surface backed by a `Vec<u8>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemSurface {
    bytes: Vec<u8>,
}

impl MemSurface {
    /// Zero-filled surface of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Surface initialised with `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Whole contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whole contents, mutable. For hosts that stage a command in place.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Consume into the backing vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Surface for MemSurface {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, offset: usize, out: &mut [u8]) -> SurfaceResult<()> {
        self.check_range(offset, out.len())?;
        out.copy_from_slice(&self.bytes[offset..offset + out.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> SurfaceResult<()> {
        self.check_range(offset, data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}
