/// VulkanBuffer - one driver-side buffer object
///
/// A buffer handle exists from `create_buffer` on, but its storage (the
/// `vk::Buffer` and its host-visible allocation) only appears with the first
/// full upload. Every full upload replaces the storage.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use retro3d_bridge::retro3d::{Error, Result};
use retro3d_bridge::retro3d::driver::DriverUsageHint;
use retro3d_bridge::{engine_err, engine_error};

use crate::vulkan_context::VulkanContext;

const SOURCE: &str = "retro3d::vulkan";

/// Storage behind a buffer handle
pub(crate) struct BufferStorage {
    pub(crate) buffer: vk::Buffer,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) size: u64,
    pub(crate) hint: DriverUsageHint,
}

#[derive(Default)]
pub struct VulkanBuffer {
    pub(crate) storage: Option<BufferStorage>,
}

impl VulkanBuffer {
    /// Size of the current storage in bytes (0 before the first full upload)
    pub fn size(&self) -> u64 {
        self.storage.as_ref().map_or(0, |s| s.size)
    }

    pub fn hint(&self) -> Option<DriverUsageHint> {
        self.storage.as_ref().map(|s| s.hint)
    }

    /// Replace the storage with `size` fresh bytes, optionally filled from `data`
    pub fn allocate(
        &mut self,
        ctx: &mut VulkanContext,
        size: u64,
        data: Option<&[u8]>,
        hint: DriverUsageHint,
    ) -> Result<()> {
        self.release(ctx);
        if size == 0 {
            return Ok(());
        }

        let usage = vk::BufferUsageFlags::VERTEX_BUFFER
            | vk::BufferUsageFlags::INDEX_BUFFER
            | vk::BufferUsageFlags::TRANSFER_DST;
        let buffer_create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            // Uploads are plain writes through the mapping, so both hints
            // need host-visible memory.
            let name = match hint {
                DriverUsageHint::Dynamic => "retro3d dynamic buffer",
                DriverUsageHint::Stream => "retro3d stream buffer",
            };
            let allocation = match ctx.allocator.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(_e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.allocator.free(allocation).ok();
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!(SOURCE, "Failed to bind buffer memory: {:?}", e));
            }

            self.storage = Some(BufferStorage {
                buffer,
                allocation: Some(allocation),
                size,
                hint,
            });
        }

        match data {
            Some(data) => {
                let count = data.len().min(size as usize);
                self.write(0, &data[..count])
            }
            None => Ok(()),
        }
    }

    /// Copy `data` into the storage at `offset`
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let storage = self.storage.as_mut()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer update failed: no storage allocated"))?;

        let end = offset.checked_add(data.len() as u64);
        if end.is_none_or(|end| end > storage.size) {
            return Err(engine_err!(
                SOURCE,
                "Buffer update out of range: {} bytes at offset {} (size {})",
                data.len(),
                offset,
                storage.size
            ));
        }

        let mapped = storage.allocation.as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?;

        let start = offset as usize;
        mapped[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copy of `len` bytes at `offset`
    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let storage = self.storage.as_ref()
            .ok_or_else(|| Error::InvalidResource("Buffer has no storage".to_string()))?;
        let end = offset.checked_add(len as u64);
        if end.is_none_or(|end| end > storage.size) {
            return Err(Error::InvalidCall(format!(
                "Read of {} bytes at offset {} exceeds size {}",
                len, offset, storage.size
            )));
        }

        let mapped = storage.allocation.as_ref()
            .and_then(|allocation| allocation.mapped_slice())
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?;

        let start = offset as usize;
        Ok(mapped[start..start + len].to_vec())
    }

    /// Free the storage; the handle stays valid
    pub fn release(&mut self, ctx: &mut VulkanContext) {
        if let Some(mut storage) = self.storage.take() {
            unsafe {
                if let Some(allocation) = storage.allocation.take() {
                    ctx.allocator.free(allocation).ok();
                }
                ctx.device.destroy_buffer(storage.buffer, None);
            }
        }
    }
}
