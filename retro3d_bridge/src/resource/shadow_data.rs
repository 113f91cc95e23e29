/// ShadowData - CPU-side copy of a buffer's bytes
///
/// A zero-filled, 16-byte aligned heap block whose capacity is the requested
/// length rounded up to a multiple of 16. Blocks are shared through `Arc`
/// between the buffer (its current block) and queued upload commands, so a
/// buffer can swap in a fresh block while older commands still read the
/// previous one.
///
/// Copies in and out of the block go through an internal reader/writer
/// lock, so a producer writing a mapped range and the worker copying an
/// upload out never touch the bytes at the same time. Raw pointers from
/// `as_ptr` bypass that lock.

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use parking_lot::RwLock;
use crate::error::{Error, Result};

const ALIGNMENT: usize = 16;

/// Round `length` up to the next multiple of 16
pub fn round_up_16(length: usize) -> Option<usize> {
    length.checked_add(ALIGNMENT - 1).map(|v| v & !(ALIGNMENT - 1))
}

pub struct ShadowData {
    ptr: NonNull<u8>,
    capacity: usize,
    access: RwLock<()>,
}

// SAFETY: the block is plain bytes owned by this value; `write` and `read`
// serialize through `access`.
unsafe impl Send for ShadowData {}
unsafe impl Sync for ShadowData {}

impl ShadowData {
    /// Allocate a zero-filled block able to hold `length` bytes
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the allocation fails or the size overflows.
    pub fn zeroed(length: usize) -> Result<Self> {
        let capacity = round_up_16(length)
            .ok_or(Error::OutOfMemory)?
            .max(ALIGNMENT);
        let layout = Layout::from_size_align(capacity, ALIGNMENT)
            .map_err(|_| Error::OutOfMemory)?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(Error::OutOfMemory)?;

        Ok(Self { ptr, capacity, access: RwLock::new(()) })
    }

    /// Size of the block in bytes (multiple of 16)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(Error::InvalidCall(format!(
                "range {}+{} exceeds shadow capacity {}", offset, length, self.capacity
            ))),
        }
    }

    /// Copy `data` into the block at `offset`
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len())?;
        let _guard = self.access.write();
        // SAFETY: range checked; source is a distinct caller-owned slice and
        // the write lock excludes every reader.
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), self.as_ptr().add(offset), data.len());
        }
        Ok(())
    }

    /// Copy `length` bytes starting at `offset` out of the block
    pub fn read(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        self.check_range(offset, length)?;
        let _guard = self.access.read();
        let mut out = vec![0u8; length];
        // SAFETY: range checked; the read lock excludes writers.
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr().add(offset), out.as_mut_ptr(), length);
        }
        Ok(out)
    }
}

impl Drop for ShadowData {
    fn drop(&mut self) {
        if let Ok(layout) = Layout::from_size_align(self.capacity, ALIGNMENT) {
            // SAFETY: allocated in `zeroed` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl std::fmt::Debug for ShadowData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowData")
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
#[path = "shadow_data_tests.rs"]
mod tests;
