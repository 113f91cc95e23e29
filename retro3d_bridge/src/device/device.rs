/// Device - owner of the command queue and its worker thread
///
/// A `Device` is a cheap reference-counted handle. Every buffer created from
/// it keeps a handle, so the worker thread (and the driver it owns) stays
/// alive until the application has released the device and every buffer.
/// Dropping the last handle shuts the queue down: pending commands are
/// drained, then the worker exits.

use std::sync::Arc;
use crate::command::CommandQueue;
use crate::config::BridgeConfig;
use crate::driver::Driver;
use crate::error::Result;
use crate::resource::{BufferFormat, BufferObject, Fvf, IndexBuffer, Pool, Usage, VertexBuffer};
use crate::{engine_debug, engine_info};

const SOURCE: &str = "retro3d::Device";

struct DeviceInner {
    queue: CommandQueue,
    config: BridgeConfig,
    driver_name: String,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        engine_debug!(SOURCE, "Releasing device (driver: {})", self.driver_name);
    }
}

#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Spawn the worker thread and move `driver` into it
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the worker thread cannot be created.
    pub fn new<D: Driver + 'static>(driver: D, config: BridgeConfig) -> Result<Self> {
        let driver_name = driver.name().to_string();
        let queue = CommandQueue::spawn(driver, &config)?;

        engine_info!(SOURCE, "Device created for '{}' (driver: {})", config.app_name, driver_name);
        Ok(Self {
            inner: Arc::new(DeviceInner { queue, config, driver_name }),
        })
    }

    /// The queue bound to this device's worker thread
    pub fn queue(&self) -> &CommandQueue {
        &self.inner.queue
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn driver_name(&self) -> &str {
        &self.inner.driver_name
    }

    /// Number of live handles (application handles plus one per buffer)
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether both handles refer to the same device
    pub fn ptr_eq(&self, other: &Device) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Create a vertex buffer of `length` bytes laid out as `fvf`
    pub fn create_vertex_buffer(
        &self,
        length: usize,
        usage: Usage,
        fvf: Fvf,
        pool: Pool,
    ) -> Result<VertexBuffer> {
        let object = BufferObject::init_as_vertex_buffer(self, length, usage, fvf, pool)?;
        Ok(VertexBuffer::new(object))
    }

    /// Create an index buffer of `length` bytes
    pub fn create_index_buffer(
        &self,
        length: usize,
        usage: Usage,
        format: BufferFormat,
        pool: Pool,
    ) -> Result<IndexBuffer> {
        let object = BufferObject::init_as_index_buffer(self, length, usage, format, pool)?;
        Ok(IndexBuffer::new(object))
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
