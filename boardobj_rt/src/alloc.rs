//! Object memory allocator collaborator.
//!
//! Objects themselves are boxed, but every byte a group consumes is charged
//! against a fixed budget first, the way the firmware carves objects out of
//! a bounded DMEM heap. A failed charge is an allocation error and leaves
//! the slot empty.

use boardobj::error::{BoardObjError, BoardObjResult};
use tracing::debug;

/// Source of object memory.
pub trait ObjAllocator {
    /// Reserve `size` bytes.
    ///
    /// # Errors
    /// `OutOfMemory` if the reservation cannot be satisfied.
    fn alloc(&mut self, size: usize) -> BoardObjResult<()>;

    /// Bytes still available.
    fn available(&self) -> usize;
}

/// Fixed byte budget. Reservations are never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmemBudget {
    capacity: usize,
    used: usize,
}

impl DmemBudget {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, used: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }
}

impl ObjAllocator for DmemBudget {
    fn alloc(&mut self, size: usize) -> BoardObjResult<()> {
        let available = self.available();
        if size > available {
            return Err(BoardObjError::OutOfMemory {
                requested: size,
                available,
            });
        }
        self.used += size;
        debug!(size, used = self.used, "dmem reserved");
        Ok(())
    }

    fn available(&self) -> usize {
        self.capacity - self.used
    }
}
