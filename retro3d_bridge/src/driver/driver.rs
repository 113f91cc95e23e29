/// Driver trait - entry points of the graphics driver
///
/// A `Driver` is moved into the command queue's worker thread when the queue
/// is spawned and never leaves it: driver contexts are bound to one thread,
/// so the only way to reach the driver is to enqueue a command.

use std::fmt;
use std::num::NonZeroU64;
use crate::error::Result;

/// Opaque, non-zero handle of a driver-side buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(NonZeroU64);

impl BufferId {
    /// Wrap a raw handle value; zero is reserved for "no driver object"
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw handle value (never zero)
    pub fn raw(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Usage hint passed with full uploads
///
/// Dynamic buffers are rewritten often and benefit from host-visible,
/// write-combined storage; everything else is uploaded once per change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverUsageHint {
    /// Contents are modified repeatedly and used many times
    Dynamic,
    /// Contents are modified and then used a few times
    Stream,
}

/// Graphics driver entry points
///
/// Every method is called on the worker thread only. Implementations return
/// errors instead of panicking; the calling command logs them and the worker
/// carries on with the next command.
pub trait Driver: Send {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Create a buffer object with no storage yet
    fn create_buffer(&mut self) -> Result<BufferId>;

    /// (Re)allocate the storage of `id` to `size` bytes
    ///
    /// When `data` is `None` the new contents are undefined (orphaning);
    /// otherwise `data` holds at least `size` bytes to copy in.
    fn upload_full(
        &mut self,
        id: BufferId,
        size: usize,
        data: Option<&[u8]>,
        hint: DriverUsageHint,
    ) -> Result<()>;

    /// Overwrite `data.len()` bytes of `id` starting at `offset`
    fn upload_sub_range(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<()>;

    /// Destroy the buffer object
    fn delete_buffer(&mut self, id: BufferId) -> Result<()>;
}
