/// Legacy resource surface over `BufferObject`
///
/// `VertexBuffer` and `IndexBuffer` are reference-counted handles to one
/// buffer object: cloning adds a reference, dropping releases it, and the
/// object is destroyed with its last handle. Each buffer also holds its
/// device, so the device outlives every buffer created from it.
///
/// Capability discovery is a closed set (`Interface`) answered from the
/// kind the buffer was created with.

use std::sync::Arc;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::resource::{
    BufferMapping, BufferObject, IndexBufferDesc, LockFlags, ResourceType, VertexBufferDesc,
};
use crate::engine_fixme;

const SOURCE: &str = "retro3d::Resource";

/// Capability sets a buffer may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    VertexBufferOps,
    IndexBufferOps,
    ResourceOps,
}

/// Tag identifying a private data entry
pub type PrivateDataTag = u128;

// ===== RESOURCE OPS =====

/// Operations common to every resource
///
/// Private data is not supported; priority and preloading are accepted and
/// ignored.
pub trait ResourceOps {
    /// The buffer object behind this handle
    fn buffer(&self) -> &BufferObject;

    fn device(&self) -> Device {
        self.buffer().device().clone()
    }

    fn resource_type(&self) -> ResourceType {
        self.buffer().resource_type()
    }

    fn set_private_data(&self, tag: PrivateDataTag, data: &[u8], flags: u32) -> Result<()> {
        engine_fixme!(SOURCE, "set_private_data tag {:x} ({} bytes, flags 0x{:x}): stub", tag, data.len(), flags);
        Err(Error::NotImplemented("set_private_data"))
    }

    fn private_data(&self, tag: PrivateDataTag) -> Result<Vec<u8>> {
        engine_fixme!(SOURCE, "private_data tag {:x}: stub", tag);
        Err(Error::NotImplemented("private_data"))
    }

    fn free_private_data(&self, tag: PrivateDataTag) -> Result<()> {
        engine_fixme!(SOURCE, "free_private_data tag {:x}: stub", tag);
        Err(Error::NotImplemented("free_private_data"))
    }

    /// Returns the previous priority (always 0)
    fn set_priority(&self, priority: u32) -> u32 {
        engine_fixme!(SOURCE, "set_priority {}: stub", priority);
        0
    }

    fn priority(&self) -> u32 {
        engine_fixme!(SOURCE, "priority: stub");
        0
    }

    fn preload(&self) {
        engine_fixme!(SOURCE, "preload: stub");
    }
}

// ===== VERTEX BUFFER =====

/// Handle to a vertex buffer
#[derive(Clone)]
pub struct VertexBuffer {
    object: Arc<BufferObject>,
}

impl VertexBuffer {
    pub(crate) fn new(object: BufferObject) -> Self {
        Self { object: Arc::new(object) }
    }

    pub fn lock(&self, offset: usize, length: usize, flags: LockFlags) -> Result<BufferMapping> {
        self.object.lock(offset, length, flags)
    }

    pub fn unlock(&self) -> Result<()> {
        self.object.unlock()
    }

    pub fn desc(&self) -> VertexBufferDesc {
        VertexBufferDesc {
            format: self.object.format(),
            resource_type: ResourceType::VertexBuffer,
            usage: self.object.usage(),
            pool: self.object.pool(),
            size: self.object.length(),
            fvf: self.object.fvf(),
        }
    }

    /// Number of handles sharing this buffer
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.object)
    }

    pub fn query_interface(&self, interface: Interface) -> Result<BufferInterface> {
        match interface {
            Interface::VertexBufferOps | Interface::ResourceOps => Ok(BufferInterface::Vertex(self.clone())),
            Interface::IndexBufferOps => Err(Error::NoInterface(format!("{:?} on a vertex buffer", interface))),
        }
    }
}

impl ResourceOps for VertexBuffer {
    fn buffer(&self) -> &BufferObject {
        &self.object
    }
}

// ===== INDEX BUFFER =====

/// Handle to an index buffer
#[derive(Clone)]
pub struct IndexBuffer {
    object: Arc<BufferObject>,
}

impl IndexBuffer {
    pub(crate) fn new(object: BufferObject) -> Self {
        Self { object: Arc::new(object) }
    }

    pub fn lock(&self, offset: usize, length: usize, flags: LockFlags) -> Result<BufferMapping> {
        self.object.lock(offset, length, flags)
    }

    pub fn unlock(&self) -> Result<()> {
        self.object.unlock()
    }

    pub fn desc(&self) -> IndexBufferDesc {
        IndexBufferDesc {
            format: self.object.format(),
            resource_type: ResourceType::IndexBuffer,
            usage: self.object.usage(),
            pool: self.object.pool(),
            size: self.object.length(),
        }
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.object)
    }

    pub fn query_interface(&self, interface: Interface) -> Result<BufferInterface> {
        match interface {
            Interface::IndexBufferOps | Interface::ResourceOps => Ok(BufferInterface::Index(self.clone())),
            Interface::VertexBufferOps => Err(Error::NoInterface(format!("{:?} on an index buffer", interface))),
        }
    }
}

impl ResourceOps for IndexBuffer {
    fn buffer(&self) -> &BufferObject {
        &self.object
    }
}

// ===== BUFFER INTERFACE =====

/// Result of `query_interface`: a new reference of the matching kind
#[derive(Clone)]
pub enum BufferInterface {
    Vertex(VertexBuffer),
    Index(IndexBuffer),
}

impl BufferInterface {
    pub fn as_vertex_buffer(&self) -> Option<&VertexBuffer> {
        match self {
            BufferInterface::Vertex(buffer) => Some(buffer),
            BufferInterface::Index(_) => None,
        }
    }

    pub fn as_index_buffer(&self) -> Option<&IndexBuffer> {
        match self {
            BufferInterface::Index(buffer) => Some(buffer),
            BufferInterface::Vertex(_) => None,
        }
    }
}

impl ResourceOps for BufferInterface {
    fn buffer(&self) -> &BufferObject {
        match self {
            BufferInterface::Vertex(buffer) => buffer.buffer(),
            BufferInterface::Index(buffer) => buffer.buffer(),
        }
    }
}

#[cfg(test)]
#[path = "buffer_interface_tests.rs"]
mod tests;
