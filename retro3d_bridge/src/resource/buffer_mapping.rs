/// BufferMapping - view of a locked range of a buffer's shadow data
///
/// Returned by `lock`. The mapping keeps the shadow block it points into
/// alive, so it stays memory-safe even if the buffer swaps blocks. Writes
/// are accepted until the matching `unlock`; after that they fail with
/// `NotLocked`, so the upload sees the range exactly as it was at unlock.
/// Reads stay available.

use std::sync::Arc;
use parking_lot::Mutex;
use crate::error::{Error, Result};
use crate::resource::ShadowData;
use crate::engine_warn;

const SOURCE: &str = "retro3d::Buffer";

/// Open while the lock that produced a mapping is held
#[derive(Debug)]
pub(crate) struct MappingGate {
    open: Mutex<bool>,
}

impl MappingGate {
    pub(crate) fn open() -> Arc<Self> {
        Arc::new(Self { open: Mutex::new(true) })
    }

    pub(crate) fn closed() -> Arc<Self> {
        Arc::new(Self { open: Mutex::new(false) })
    }

    /// Waits for a write in progress through the mapping
    pub(crate) fn close(&self) {
        *self.open.lock() = false;
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.open.lock()
    }
}

#[derive(Debug)]
pub struct BufferMapping {
    data: Arc<ShadowData>,
    gate: Arc<MappingGate>,
    offset: usize,
    length: usize,
    read_only: bool,
}

impl BufferMapping {
    pub(crate) fn new(
        data: Arc<ShadowData>,
        gate: Arc<MappingGate>,
        offset: usize,
        length: usize,
        read_only: bool,
    ) -> Self {
        Self { data, gate, offset, length, read_only }
    }

    /// Offset of the mapping inside the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether the lock behind this mapping is still held
    pub fn is_locked(&self) -> bool {
        self.gate.is_open()
    }

    /// Raw pointer to the first mapped byte, valid for `len()` bytes while
    /// the mapping lives
    pub fn as_ptr(&self) -> *const u8 {
        self.as_mut_ptr() as *const u8
    }

    /// Mutable raw pointer to the first mapped byte
    ///
    /// Writing through it on a read-only mapping is not uploaded, and
    /// writing through it after `unlock` races with the upload.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.data.as_ptr().wrapping_add(self.offset)
    }

    /// Copy `length` bytes at `at` (relative to the mapping) out
    pub fn read(&self, at: usize, length: usize) -> Result<Vec<u8>> {
        self.check_range(at, length)?;
        self.data.read(self.offset + at, length)
    }

    /// Copy the whole mapped range out
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.read(0, self.length)
    }

    /// Copy `bytes` in at `at` (relative to the mapping)
    ///
    /// # Errors
    ///
    /// - `InvalidCall` on read-only mappings or when the write leaves the
    ///   mapped range
    /// - `NotLocked` once the buffer was unlocked
    pub fn write(&self, at: usize, bytes: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::InvalidCall("write through a read-only mapping".to_string()));
        }
        self.check_range(at, bytes.len())?;

        // Held across the copy so `unlock` cannot slip in between
        let open = self.gate.open.lock();
        if !*open {
            drop(open);
            engine_warn!(SOURCE, "Write through the mapping of an unlocked range");
            return Err(Error::NotLocked);
        }
        self.data.write(self.offset + at, bytes)
    }

    /// Write a slice of plain-old-data values (vertices, indices)
    pub fn write_pod<T: bytemuck::Pod>(&self, at: usize, values: &[T]) -> Result<()> {
        self.write(at, bytemuck::cast_slice(values))
    }

    /// Set every mapped byte to `value`
    pub fn fill(&self, value: u8) -> Result<()> {
        self.write(0, &vec![value; self.length])
    }

    fn check_range(&self, at: usize, length: usize) -> Result<()> {
        match at.checked_add(length) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(Error::InvalidCall(format!(
                "range {}+{} outside mapping of {} bytes", at, length, self.length
            ))),
        }
    }
}
