/// VulkanDriver - `Driver` implementation on top of a headless Vulkan device
///
/// Handles are plain counters mapped to `VulkanBuffer`s. The driver is moved
/// into the command queue's worker thread and every call happens there, so
/// no internal locking is needed.

use retro3d_bridge::retro3d::Result;
use retro3d_bridge::retro3d::driver::{BufferId, Driver, DriverUsageHint};
use retro3d_bridge::{engine_bail, engine_debug, engine_err, engine_warn};
use rustc_hash::FxHashMap;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "retro3d::vulkan";

/// Configuration for the Vulkan driver
#[derive(Debug, Clone)]
pub struct VulkanDriverConfig {
    /// Application name reported to the Vulkan instance
    pub app_name: String,
    /// Request VK_LAYER_KHRONOS_validation (skipped with a warning when missing)
    pub enable_validation: bool,
    /// Pick a discrete GPU over integrated ones when both exist
    pub prefer_discrete_gpu: bool,
}

impl Default for VulkanDriverConfig {
    fn default() -> Self {
        Self {
            app_name: "Retro3D Application".to_string(),
            enable_validation: cfg!(feature = "vulkan-validation"),
            prefer_discrete_gpu: true,
        }
    }
}

pub struct VulkanDriver {
    buffers: FxHashMap<BufferId, VulkanBuffer>,
    next_handle: u64,
    // Outlives every buffer released in Drop
    context: VulkanContext,
}

impl VulkanDriver {
    /// Create the Vulkan instance, device and allocator
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` when no Vulkan loader or suitable
    /// device is available.
    pub fn new(config: VulkanDriverConfig) -> Result<Self> {
        let context = VulkanContext::new(&config)?;
        Ok(Self {
            buffers: FxHashMap::default(),
            next_handle: 1,
            context,
        })
    }

    /// Name of the physical device in use
    pub fn device_name(&self) -> &str {
        &self.context.device_name
    }

    pub fn validation_enabled(&self) -> bool {
        self.context.validation_enabled()
    }

    /// Number of live buffer handles
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Current storage size of `id`, if the handle exists
    pub fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.buffers.get(&id).map(VulkanBuffer::size)
    }

    /// Copy of the whole storage of `id`
    pub fn buffer_contents(&self, id: BufferId) -> Result<Vec<u8>> {
        let buffer = self.lookup(id)?;
        buffer.read(0, buffer.size() as usize)
    }

    fn lookup(&self, id: BufferId) -> Result<&VulkanBuffer> {
        match self.buffers.get(&id) {
            Some(buffer) => Ok(buffer),
            None => engine_bail!(SOURCE, "Unknown buffer {}", id),
        }
    }
}

impl Driver for VulkanDriver {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        let id = BufferId::new(self.next_handle)
            .ok_or_else(|| engine_err!(SOURCE, "Buffer handle space exhausted"))?;
        self.next_handle += 1;
        self.buffers.insert(id, VulkanBuffer::default());
        engine_debug!(SOURCE, "Created buffer {}", id);
        Ok(id)
    }

    fn upload_full(
        &mut self,
        id: BufferId,
        size: usize,
        data: Option<&[u8]>,
        hint: DriverUsageHint,
    ) -> Result<()> {
        if let Some(data) = data {
            if data.len() < size {
                engine_bail!(SOURCE, "Upload of {} bytes to buffer {} has only {} bytes of data", size, id, data.len());
            }
        }
        let buffer = match self.buffers.get_mut(&id) {
            Some(buffer) => buffer,
            None => engine_bail!(SOURCE, "Unknown buffer {}", id),
        };
        buffer.allocate(&mut self.context, size as u64, data, hint)
    }

    fn upload_sub_range(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        let buffer = match self.buffers.get_mut(&id) {
            Some(buffer) => buffer,
            None => engine_bail!(SOURCE, "Unknown buffer {}", id),
        };
        buffer.write(offset as u64, data)
    }

    fn delete_buffer(&mut self, id: BufferId) -> Result<()> {
        match self.buffers.remove(&id) {
            Some(mut buffer) => {
                buffer.release(&mut self.context);
                engine_debug!(SOURCE, "Deleted buffer {}", id);
                Ok(())
            }
            None => {
                engine_warn!(SOURCE, "Deleting unknown buffer {}", id);
                Ok(())
            }
        }
    }
}

impl Drop for VulkanDriver {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            engine_warn!(SOURCE, "{} buffer(s) still alive at driver shutdown", self.buffers.len());
        }
        for (_, mut buffer) in self.buffers.drain() {
            buffer.release(&mut self.context);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_driver_tests.rs"]
mod tests;
