/// Buffer commands - driver-side half of the buffer lifecycle
///
/// Each variant carries only what the worker needs: the buffer's shared
/// state, a byte range or size, and a shared handle to the shadow block it
/// uploads from. Driver failures are logged here and never propagated; the
/// Init handshake is checked by the producer through the buffer handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use crate::command::Command;
use crate::driver::{BufferId, Driver, DriverUsageHint};
use crate::resource::ShadowData;
use crate::{engine_error, engine_trace};

const SOURCE: &str = "retro3d::BufferCommand";

// ===== SHARED STATE =====

/// State of a buffer shared with the worker thread
#[derive(Debug, Default)]
pub struct BufferShared {
    /// Raw driver handle, 0 until Init ran successfully
    buffer_id: AtomicU64,
    /// Upload commands enqueued but not yet finished
    pending_updates: AtomicU32,
}

impl BufferShared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_id(&self) -> Option<BufferId> {
        BufferId::new(self.buffer_id.load(Ordering::Acquire))
    }

    fn set_buffer_id(&self, id: Option<BufferId>) {
        self.buffer_id.store(id.map_or(0, |id| id.raw()), Ordering::Release);
    }

    pub fn pending_updates(&self) -> u32 {
        self.pending_updates.load(Ordering::Acquire)
    }

    /// Count one more in-flight update
    ///
    /// Returns the token to hand to the command and the count before this
    /// update was added.
    pub fn begin_update(self: &Arc<Self>) -> (PendingUpdate, u32) {
        let previous = self.pending_updates.fetch_add(1, Ordering::AcqRel);
        (PendingUpdate { shared: Arc::clone(self) }, previous)
    }
}

/// One in-flight update; the pending counter drops when this is dropped
///
/// Commands hold the token, so the counter also drops when a command is
/// discarded unexecuted or panics.
#[derive(Debug)]
pub struct PendingUpdate {
    shared: Arc<BufferShared>,
}

impl Drop for PendingUpdate {
    fn drop(&mut self) {
        self.shared.pending_updates.fetch_sub(1, Ordering::AcqRel);
    }
}

// ===== COMMANDS =====

/// Closed set of buffer commands
pub enum BufferCommand {
    /// Create the driver object and upload the zeroed shadow block
    Init {
        shared: Arc<BufferShared>,
        data: Arc<ShadowData>,
        hint: DriverUsageHint,
        token: PendingUpdate,
    },
    /// Delete the driver object
    Destroy {
        id: BufferId,
    },
    /// Reallocate driver storage to `size` bytes, contents undefined
    Resize {
        shared: Arc<BufferShared>,
        size: usize,
        hint: DriverUsageHint,
    },
    /// Upload `length` bytes at `offset` from `data`
    LoadData {
        shared: Arc<BufferShared>,
        offset: usize,
        length: usize,
        data: Arc<ShadowData>,
        token: PendingUpdate,
    },
}

impl BufferCommand {
    fn init(driver: &mut dyn Driver, shared: &BufferShared, data: &ShadowData, hint: DriverUsageHint) -> usize {
        let id = match driver.create_buffer() {
            Ok(id) => id,
            Err(e) => {
                engine_error!(SOURCE, "Failed to create buffer object: {}", e);
                return 0;
            }
        };

        let upload = data.read(0, data.capacity())
            .and_then(|bytes| driver.upload_full(id, data.capacity(), Some(&bytes), hint));
        if let Err(e) = upload {
            engine_error!(SOURCE, "Failed to initialize buffer object {}: {}", id, e);
            if let Err(e) = driver.delete_buffer(id) {
                engine_error!(SOURCE, "Failed to delete buffer object {}: {}", id, e);
            }
            return 0;
        }

        shared.set_buffer_id(Some(id));
        engine_trace!(SOURCE, "Initialized buffer object {} ({} bytes, {:?})", id, data.capacity(), hint);
        data.capacity()
    }

    fn resize(driver: &mut dyn Driver, shared: &BufferShared, size: usize, hint: DriverUsageHint) -> usize {
        let Some(id) = shared.buffer_id() else {
            engine_error!(SOURCE, "Resize of a buffer without driver object");
            return 0;
        };
        if let Err(e) = driver.upload_full(id, size, None, hint) {
            engine_error!(SOURCE, "Failed to resize buffer object {} to {} bytes: {}", id, size, e);
        }
        size
    }

    fn load(driver: &mut dyn Driver, shared: &BufferShared, offset: usize, length: usize, data: &ShadowData) -> usize {
        let Some(id) = shared.buffer_id() else {
            engine_error!(SOURCE, "Upload to a buffer without driver object");
            return 0;
        };
        let upload = data.read(offset, length)
            .and_then(|bytes| driver.upload_sub_range(id, offset, &bytes));
        if let Err(e) = upload {
            engine_error!(SOURCE, "Failed to upload {}+{} to buffer object {}: {}", offset, length, id, e);
        }
        length
    }
}

impl Command for BufferCommand {
    fn name(&self) -> &'static str {
        match self {
            BufferCommand::Init { .. } => "InitBufferObject",
            BufferCommand::Destroy { .. } => "DestroyBuffer",
            BufferCommand::Resize { .. } => "ResizeBuffer",
            BufferCommand::LoadData { .. } => "LoadBufferData",
        }
    }

    fn execute(self: Box<Self>, driver: &mut dyn Driver) -> usize {
        match *self {
            BufferCommand::Init { shared, data, hint, token } => {
                let cost = Self::init(driver, &shared, &data, hint);
                drop(token);
                cost
            }
            BufferCommand::Destroy { id } => {
                if let Err(e) = driver.delete_buffer(id) {
                    engine_error!(SOURCE, "Failed to delete buffer object {}: {}", id, e);
                }
                std::mem::size_of::<Self>()
            }
            BufferCommand::Resize { shared, size, hint } => Self::resize(driver, &shared, size, hint),
            BufferCommand::LoadData { shared, offset, length, data, token } => {
                let cost = Self::load(driver, &shared, offset, length, &data);
                drop(token);
                cost
            }
        }
    }
}

#[cfg(test)]
#[path = "buffer_commands_tests.rs"]
mod tests;
