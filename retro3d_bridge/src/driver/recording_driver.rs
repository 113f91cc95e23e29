/// Recording driver - headless `Driver` keeping buffer contents in host memory
///
/// Useful wherever no GPU is available: headless runs, CI, and tests. Every
/// successful driver call is recorded, buffer contents can be read back, and
/// the worker can be held at the next driver call with `pause()` to observe
/// in-flight updates from the producer side.
///
/// The driver is `Clone`; clones share the same state, so one clone can be
/// moved into the worker while another is kept for inspection.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use slotmap::{DefaultKey, Key, KeyData, SlotMap};
use crate::driver::{BufferId, Driver, DriverUsageHint};
use crate::error::{Error, Result};
use crate::engine_warn;

/// One successful driver call, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    CreateBuffer { id: BufferId },
    UploadFull { id: BufferId, size: usize, with_data: bool, hint: DriverUsageHint },
    UploadSubRange { id: BufferId, offset: usize, length: usize },
    DeleteBuffer { id: BufferId },
}

/// Driver entry point selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    CreateBuffer,
    UploadFull,
    UploadSubRange,
    DeleteBuffer,
}

#[derive(Debug, Default)]
struct StoredBuffer {
    data: Vec<u8>,
    hint: Option<DriverUsageHint>,
}

#[derive(Default)]
struct RecordingState {
    buffers: SlotMap<DefaultKey, StoredBuffer>,
    calls: Vec<DriverCall>,
    injected_failures: Vec<DriverOp>,
}

struct RecordingShared {
    state: Mutex<RecordingState>,
    paused: Mutex<bool>,
    resumed: Condvar,
}

/// Headless driver storing buffers in host memory
#[derive(Clone)]
pub struct RecordingDriver {
    shared: Arc<RecordingShared>,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RecordingShared {
                state: Mutex::new(RecordingState::default()),
                paused: Mutex::new(false),
                resumed: Condvar::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn key_of(id: BufferId) -> DefaultKey {
        DefaultKey::from(KeyData::from_ffi(id.raw()))
    }

    /// Block the calling (worker) thread while the driver is paused
    fn wait_while_paused(&self) {
        let mut paused = match self.shared.paused.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while *paused {
            paused = match self.shared.resumed.wait(paused) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    fn take_injected_failure(state: &mut RecordingState, op: DriverOp) -> Result<()> {
        if let Some(index) = state.injected_failures.iter().position(|f| *f == op) {
            state.injected_failures.remove(index);
            return Err(Error::BackendError(format!("injected {:?} failure", op)));
        }
        Ok(())
    }

    // ===== INSPECTION / CONTROL =====

    /// Hold the worker at its next driver call until `resume()`
    pub fn pause(&self) {
        if let Ok(mut paused) = self.shared.paused.lock() {
            *paused = true;
        }
    }

    /// Release a paused worker
    pub fn resume(&self) {
        if let Ok(mut paused) = self.shared.paused.lock() {
            *paused = false;
        }
        self.shared.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.lock().map(|p| *p).unwrap_or(false)
    }

    /// Make the next call to `op` fail with a backend error
    pub fn fail_next(&self, op: DriverOp) {
        self.state().injected_failures.push(op);
    }

    /// Successful calls so far, in execution order
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Current contents of a live buffer object
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.state().buffers.get(Self::key_of(id)).map(|b| b.data.clone())
    }

    /// Usage hint of the last full upload of a live buffer object
    pub fn buffer_hint(&self, id: BufferId) -> Option<DriverUsageHint> {
        self.state().buffers.get(Self::key_of(id)).and_then(|b| b.hint)
    }

    pub fn live_buffer_count(&self) -> usize {
        self.state().buffers.len()
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        self.wait_while_paused();
        let mut state = self.state();
        Self::take_injected_failure(&mut state, DriverOp::CreateBuffer)?;

        let key = state.buffers.insert(StoredBuffer::default());
        let id = match BufferId::new(key.data().as_ffi()) {
            Some(id) => id,
            None => {
                state.buffers.remove(key);
                return Err(Error::BackendError("slot key mapped to a null handle".to_string()));
            }
        };
        state.calls.push(DriverCall::CreateBuffer { id });
        Ok(id)
    }

    fn upload_full(
        &mut self,
        id: BufferId,
        size: usize,
        data: Option<&[u8]>,
        hint: DriverUsageHint,
    ) -> Result<()> {
        self.wait_while_paused();
        let mut state = self.state();
        Self::take_injected_failure(&mut state, DriverOp::UploadFull)?;

        let buffer = state.buffers.get_mut(Self::key_of(id))
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {}", id)))?;

        let mut storage = vec![0u8; size];
        if let Some(bytes) = data {
            let count = bytes.len().min(size);
            if count < size {
                engine_warn!("retro3d::RecordingDriver",
                    "Full upload of {} bytes with only {} bytes of data", size, count);
            }
            storage[..count].copy_from_slice(&bytes[..count]);
        }
        buffer.data = storage;
        buffer.hint = Some(hint);

        state.calls.push(DriverCall::UploadFull { id, size, with_data: data.is_some(), hint });
        Ok(())
    }

    fn upload_sub_range(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        self.wait_while_paused();
        let mut state = self.state();
        Self::take_injected_failure(&mut state, DriverOp::UploadSubRange)?;

        let buffer = state.buffers.get_mut(Self::key_of(id))
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {}", id)))?;

        let end = offset.checked_add(data.len())
            .filter(|end| *end <= buffer.data.len())
            .ok_or_else(|| Error::BackendError(format!(
                "sub-range upload {}+{} exceeds buffer size {}", offset, data.len(), buffer.data.len()
            )))?;
        buffer.data[offset..end].copy_from_slice(data);

        state.calls.push(DriverCall::UploadSubRange { id, offset, length: data.len() });
        Ok(())
    }

    fn delete_buffer(&mut self, id: BufferId) -> Result<()> {
        self.wait_while_paused();
        let mut state = self.state();
        Self::take_injected_failure(&mut state, DriverOp::DeleteBuffer)?;

        state.buffers.remove(Self::key_of(id))
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {}", id)))?;

        state.calls.push(DriverCall::DeleteBuffer { id });
        Ok(())
    }
}

#[cfg(test)]
#[path = "recording_driver_tests.rs"]
mod tests;
