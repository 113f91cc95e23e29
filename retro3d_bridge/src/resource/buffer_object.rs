/// BufferObject - vertex/index buffer backed by a CPU shadow copy
///
/// All reads and writes from the application go to the shadow block; the
/// driver object is only touched by commands running on the device's worker
/// thread. The pending-update counter tracks uploads not yet executed and
/// gates every point where the producer must not race them: locks that may
/// overwrite data and destruction.

use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use crate::device::Device;
use crate::driver::{BufferId, DriverUsageHint};
use crate::error::{Error, Result};
use crate::resource::{
    BufferCommand, BufferFormat, BufferMapping, BufferShared, Fvf, LockFlags, Pool,
    ResourceType, ShadowData, Usage,
};
use crate::resource::buffer_mapping::MappingGate;
use crate::{engine_bail_warn, engine_debug, engine_error, engine_fixme, engine_trace, engine_warn};

const SOURCE: &str = "retro3d::Buffer";

// ===== LOCK STATE =====

/// Lock state of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0,
    ReadOnly = 1,
    Full = 2,
}

impl LockState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LockState::ReadOnly,
            2 => LockState::Full,
            _ => LockState::Unlocked,
        }
    }
}

/// What the buffer holds, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex { fvf: Fvf },
    Index { format: BufferFormat },
}

struct CpuState {
    data: Arc<ShadowData>,
    length: usize,
    locked_offset: usize,
    locked_length: usize,
    gate: Arc<MappingGate>,
}

// ===== BUFFER OBJECT =====

pub struct BufferObject {
    device: Device,
    kind: BufferKind,
    usage: Usage,
    pool: Pool,
    shared: Arc<BufferShared>,
    lock_state: AtomicU8,
    state: Mutex<CpuState>,
}

impl BufferObject {
    /// Create a vertex buffer of `length` bytes
    ///
    /// # Errors
    ///
    /// `InvalidCall` if `length` cannot hold one vertex of `fvf`, plus the
    /// errors of [`init_common`](Self::init_common).
    pub fn init_as_vertex_buffer(
        device: &Device,
        length: usize,
        usage: Usage,
        fvf: Fvf,
        pool: Pool,
    ) -> Result<Self> {
        let vertex_size = fvf.vertex_size();
        if length < vertex_size {
            engine_bail_warn!(SOURCE, "Specified length is less than FVF size ({} < {})", length, vertex_size);
        }
        Self::init_common(device, BufferKind::Vertex { fvf }, length, usage, pool)
    }

    /// Create an index buffer of `length` bytes
    ///
    /// # Errors
    ///
    /// `InvalidCall` unless `format` is `Index16` or `Index32`, plus the
    /// errors of [`init_common`](Self::init_common).
    pub fn init_as_index_buffer(
        device: &Device,
        length: usize,
        usage: Usage,
        format: BufferFormat,
        pool: Pool,
    ) -> Result<Self> {
        if format.index_size().is_none() {
            engine_bail_warn!(SOURCE, "Invalid index buffer format: {}", format);
        }
        Self::init_common(device, BufferKind::Index { format }, length, usage, pool)
    }

    /// Validate placement, allocate the shadow block and run the Init
    /// handshake on the worker thread
    ///
    /// # Errors
    ///
    /// - `InvalidCall` for scratch pool, managed dynamic buffers or a zero length
    /// - `OutOfMemory` if the shadow block cannot be allocated
    /// - `InitializationFailed` if the driver object could not be created
    pub fn init_common(
        device: &Device,
        kind: BufferKind,
        length: usize,
        usage: Usage,
        pool: Pool,
    ) -> Result<Self> {
        if pool == Pool::Scratch {
            engine_bail_warn!(SOURCE, "Buffer objects not allowed in scratch mem");
        }
        if pool == Pool::Managed && usage.contains(Usage::DYNAMIC) {
            engine_bail_warn!(SOURCE, "Managed dynamic buffers aren't allowed");
        }
        if length == 0 {
            engine_bail_warn!(SOURCE, "Buffer length must be non-zero");
        }

        let data = Arc::new(ShadowData::zeroed(length)?);
        let shared = Arc::new(BufferShared::new());
        let (token, _) = shared.begin_update();

        let buffer = Self {
            device: device.clone(),
            kind,
            usage,
            pool,
            shared: Arc::clone(&shared),
            lock_state: AtomicU8::new(LockState::Unlocked as u8),
            state: Mutex::new(CpuState {
                data: Arc::clone(&data),
                length,
                locked_offset: 0,
                locked_length: 0,
                gate: MappingGate::closed(),
            }),
        };

        let init = BufferCommand::Init {
            shared,
            data,
            hint: buffer.usage_hint(),
            token,
        };
        if let Err(e) = device.queue().enqueue_blocking(init) {
            engine_error!(SOURCE, "Buffer initialization handshake failed: {}", e);
            return Err(Error::InitializationFailed(format!("Init handshake failed: {}", e)));
        }

        let Some(id) = buffer.buffer_id() else {
            return Err(Error::InitializationFailed("Driver failed to create the buffer object".to_string()));
        };

        engine_debug!(SOURCE, "Created {:?} buffer {} ({} bytes, usage {:?}, pool {:?})",
            buffer.resource_type(), id, length, usage, pool);
        Ok(buffer)
    }

    fn state(&self) -> MutexGuard<'_, CpuState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn usage_hint(&self) -> DriverUsageHint {
        if self.usage.contains(Usage::DYNAMIC) {
            DriverUsageHint::Dynamic
        } else {
            DriverUsageHint::Stream
        }
    }

    // ===== LOCK / UNLOCK =====

    /// Lock `length` bytes at `offset` (`length == 0`: whole buffer) and
    /// map them
    ///
    /// # Errors
    ///
    /// - `InvalidCall` for out-of-range requests or a read-only lock on a
    ///   write-only buffer
    /// - `AlreadyLocked` if a lock is outstanding (locks never nest)
    /// - `OutOfMemory` if discarding could not allocate a fresh block
    pub fn lock(&self, offset: usize, length: usize, flags: LockFlags) -> Result<BufferMapping> {
        engine_trace!(SOURCE, "lock offset {} length {} flags 0x{:x}", offset, length, flags.bits());

        let unknown = flags.unknown_bits();
        if unknown != 0 {
            engine_fixme!(SOURCE, "Ignoring unknown lock flags 0x{:x}", unknown);
        }

        let logical_length = self.length();
        let length = if length == 0 {
            if offset > 0 {
                engine_bail_warn!(SOURCE, "Whole-buffer lock with non-zero offset {}", offset);
            }
            logical_length
        } else {
            if offset >= logical_length || length > logical_length - offset {
                engine_bail_warn!(SOURCE, "Lock range {}+{} exceeds buffer length {}",
                    offset, length, logical_length);
            }
            length
        };

        let read_only = flags.contains(LockFlags::READONLY);
        if read_only && self.usage.contains(Usage::WRITEONLY) {
            engine_bail_warn!(SOURCE, "Read-only lock on a write-only buffer");
        }

        let target = if read_only { LockState::ReadOnly } else { LockState::Full };
        let gate = {
            // Range and gate are published together with the state change
            let mut state = self.state();
            if self.lock_state
                .compare_exchange(LockState::Unlocked as u8, target as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                drop(state);
                engine_warn!(SOURCE, "Locking a locked buffer");
                return Err(Error::AlreadyLocked);
            }
            state.locked_offset = offset;
            state.locked_length = length;
            state.gate = MappingGate::open();
            Arc::clone(&state.gate)
        };

        let pending = self.shared.pending_updates();
        if flags.contains(LockFlags::DISCARD) && pending > 0 {
            let capacity = self.state().data.capacity();
            match ShadowData::zeroed(capacity) {
                Ok(fresh) => self.state().data = Arc::new(fresh),
                Err(e) => {
                    let mut state = self.state();
                    state.gate.close();
                    state.locked_offset = 0;
                    state.locked_length = 0;
                    self.lock_state.store(LockState::Unlocked as u8, Ordering::Release);
                    return Err(e);
                }
            }
            engine_trace!(SOURCE, "Discarded shadow data with {} pending update(s)", pending);
        } else if !flags.intersects(LockFlags::NOOVERWRITE | LockFlags::READONLY) {
            self.wait_for_pending_updates();
        }

        let data = Arc::clone(&self.state().data);
        Ok(BufferMapping::new(data, gate, offset, length, read_only))
    }

    /// Release the lock; uploads the locked range unless it was read-only
    ///
    /// # Errors
    ///
    /// - `NotLocked` if the buffer is not locked
    /// - `QueueClosed` if the upload could not be enqueued (the buffer is
    ///   unlocked anyway)
    pub fn unlock(&self) -> Result<()> {
        // Concurrent unlocks serialize on the state lock; only the first
        // one sees a locked state.
        let (offset, length, data, token) = {
            let mut state = self.state();
            let current = LockState::from_u8(self.lock_state.load(Ordering::Acquire));
            if current == LockState::Unlocked {
                drop(state);
                engine_warn!(SOURCE, "Unlocking an unlocked buffer");
                return Err(Error::NotLocked);
            }

            state.gate.close();
            let range = (state.locked_offset, state.locked_length);
            state.locked_offset = 0;
            state.locked_length = 0;

            // Counted before the state is released, so the next overwrite
            // lock waits for this upload.
            let token = (current == LockState::Full).then(|| self.shared.begin_update().0);
            self.lock_state.store(LockState::Unlocked as u8, Ordering::Release);
            (range.0, range.1, Arc::clone(&state.data), token)
        };

        match token {
            Some(token) => self.device.queue().enqueue(BufferCommand::LoadData {
                shared: Arc::clone(&self.shared),
                offset,
                length,
                data,
                token,
            }),
            None => Ok(()),
        }
    }

    // ===== FULL REPLACE =====

    /// Replace the whole contents with `data`, growing the buffer if needed
    ///
    /// The size check, the optional resize and the upload are enqueued as
    /// one producer transaction. The new length is visible on return; the
    /// driver catches up asynchronously.
    ///
    /// # Errors
    ///
    /// - `InvalidCall` if `data` is empty
    /// - `OutOfMemory` if a larger shadow block cannot be allocated
    /// - `QueueClosed` if the queue no longer accepts commands
    pub fn reset_buffer_data(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            engine_bail_warn!(SOURCE, "Resetting buffer data with no data");
        }

        let (token, previous) = self.shared.begin_update();
        let producer = self.device.queue().lock_producers();
        let mut state = self.state();

        if data.len() > state.data.capacity() || previous > 0 {
            let fresh = Arc::new(ShadowData::zeroed(data.len())?);
            let size = fresh.capacity();
            producer.enqueue(BufferCommand::Resize {
                shared: Arc::clone(&self.shared),
                size,
                hint: self.usage_hint(),
            })?;
            state.data = fresh;
            engine_trace!(SOURCE, "Resized buffer to {} bytes", size);
        }

        state.length = data.len();
        state.data.write(0, data)?;
        let shadow = Arc::clone(&state.data);
        drop(state);

        producer.enqueue_and_unlock(BufferCommand::LoadData {
            shared: Arc::clone(&self.shared),
            offset: 0,
            length: data.len(),
            data: shadow,
            token,
        })
    }

    // ===== PENDING UPDATES =====

    /// Spin until every enqueued upload for this buffer has executed
    ///
    /// Gives up (returns `false`) when called on the worker thread, which
    /// would wait on itself, or once the worker has stopped.
    pub fn wait_for_pending_updates(&self) -> bool {
        let queue = self.device.queue();
        let interval = self.device.config().pending_poll_interval;

        while self.shared.pending_updates() > 0 {
            if queue.is_worker_thread() {
                engine_warn!(SOURCE, "Not waiting for {} pending update(s) on the worker thread",
                    self.shared.pending_updates());
                return false;
            }
            if !queue.is_running() {
                engine_error!(SOURCE, "Worker stopped with {} pending update(s)", self.shared.pending_updates());
                return false;
            }
            thread::sleep(interval);
        }
        true
    }

    pub fn pending_updates(&self) -> u32 {
        self.shared.pending_updates()
    }

    // ===== ACCESSORS =====

    /// Driver handle, `None` only if initialization failed
    pub fn buffer_id(&self) -> Option<BufferId> {
        self.shared.buffer_id()
    }

    /// Logical length in bytes
    pub fn length(&self) -> usize {
        self.state().length
    }

    /// Capacity of the current shadow block (multiple of 16)
    pub fn capacity(&self) -> usize {
        self.state().data.capacity()
    }

    pub fn lock_state(&self) -> LockState {
        LockState::from_u8(self.lock_state.load(Ordering::Acquire))
    }

    /// Locked `(offset, length)`, if locked
    pub fn locked_range(&self) -> Option<(usize, usize)> {
        if self.lock_state() == LockState::Unlocked {
            return None;
        }
        let state = self.state();
        Some((state.locked_offset, state.locked_length))
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn format(&self) -> BufferFormat {
        match self.kind {
            BufferKind::Vertex { .. } => BufferFormat::VertexData,
            BufferKind::Index { format } => format,
        }
    }

    pub fn fvf(&self) -> Fvf {
        match self.kind {
            BufferKind::Vertex { fvf } => fvf,
            BufferKind::Index { .. } => Fvf::default(),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self.kind {
            BufferKind::Vertex { .. } => ResourceType::VertexBuffer,
            BufferKind::Index { .. } => ResourceType::IndexBuffer,
        }
    }

    /// Owning device
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Drop for BufferObject {
    fn drop(&mut self) {
        if let Some(id) = self.shared.buffer_id() {
            if let Err(e) = self.device.queue().enqueue(BufferCommand::Destroy { id }) {
                engine_error!(SOURCE, "Failed to enqueue destruction of buffer {}: {}", id, e);
            }
        }
        self.wait_for_pending_updates();
        engine_trace!(SOURCE, "Released {:?} buffer", self.resource_type());
    }
}

#[cfg(test)]
#[path = "buffer_object_tests.rs"]
mod tests;
