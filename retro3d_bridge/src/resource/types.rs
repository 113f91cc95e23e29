/// Legacy resource vocabulary: usage and lock flags, memory pools, buffer
/// formats, flexible vertex formats and descriptors
///
/// Numeric values match the legacy API so that flags coming straight from a
/// client can be wrapped without translation.

use std::fmt;
use bitflags::bitflags;

bitflags! {
    /// Creation-time usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Usage: u32 {
        /// The application never reads the buffer back
        const WRITEONLY = 0x0000_0008;
        const SOFTWAREPROCESSING = 0x0000_0010;
        const DONOTCLIP = 0x0000_0020;
        const POINTS = 0x0000_0040;
        const RTPATCHES = 0x0000_0080;
        const NPATCHES = 0x0000_0100;
        /// Contents change often; selects the dynamic driver usage hint
        const DYNAMIC = 0x0000_0200;
    }
}

bitflags! {
    /// Flags accepted by `lock`
    ///
    /// Bits outside the known set are kept (`from_bits_retain`) and reported
    /// with a Fixme log entry when locking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LockFlags: u32 {
        const READONLY = 0x0000_0010;
        const NOSYSLOCK = 0x0000_0800;
        /// The caller promises not to touch data still in use by the driver
        const NOOVERWRITE = 0x0000_1000;
        /// The caller does not care about previous contents
        const DISCARD = 0x0000_2000;
    }
}

impl LockFlags {
    /// Bits that are not part of the known flag set
    pub fn unknown_bits(&self) -> u32 {
        self.bits() & !Self::all().bits()
    }
}

/// Memory class a resource is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    Default,
    Managed,
    SystemMem,
    /// Not allowed for buffer objects
    Scratch,
}

/// Data format of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferFormat {
    Unknown,
    /// Vertex buffers
    VertexData,
    Index16,
    Index32,
    /// Any other legacy format code (never valid for buffers)
    Other(u32),
}

impl BufferFormat {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => BufferFormat::Unknown,
            100 => BufferFormat::VertexData,
            101 => BufferFormat::Index16,
            102 => BufferFormat::Index32,
            other => BufferFormat::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            BufferFormat::Unknown => 0,
            BufferFormat::VertexData => 100,
            BufferFormat::Index16 => 101,
            BufferFormat::Index32 => 102,
            BufferFormat::Other(code) => *code,
        }
    }

    /// Size of one index in bytes, for index formats
    pub fn index_size(&self) -> Option<usize> {
        match self {
            BufferFormat::Index16 => Some(2),
            BufferFormat::Index32 => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for BufferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferFormat::Unknown => write!(f, "UNKNOWN"),
            BufferFormat::VertexData => write!(f, "VERTEXDATA"),
            BufferFormat::Index16 => write!(f, "INDEX16"),
            BufferFormat::Index32 => write!(f, "INDEX32"),
            BufferFormat::Other(code) => write!(f, "0x{:x}", code),
        }
    }
}

/// Resource kind reported by `resource_type()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    VertexBuffer,
    IndexBuffer,
}

// ===== FLEXIBLE VERTEX FORMAT =====

/// Flexible vertex format code describing one vertex of a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fvf(pub u32);

impl Fvf {
    pub const POSITION_MASK: u32 = 0x400E;
    pub const XYZ: u32 = 0x002;
    pub const XYZRHW: u32 = 0x004;
    pub const XYZB1: u32 = 0x006;
    pub const XYZB2: u32 = 0x008;
    pub const XYZB3: u32 = 0x00A;
    pub const XYZB4: u32 = 0x00C;
    pub const XYZB5: u32 = 0x00E;
    pub const XYZW: u32 = 0x4002;
    pub const NORMAL: u32 = 0x010;
    pub const PSIZE: u32 = 0x020;
    pub const DIFFUSE: u32 = 0x040;
    pub const SPECULAR: u32 = 0x080;
    pub const TEXCOUNT_MASK: u32 = 0xF00;
    pub const TEXCOUNT_SHIFT: u32 = 8;

    /// Texture coordinate set count field for `count` sets
    pub const fn tex_count(count: u32) -> u32 {
        (count << Self::TEXCOUNT_SHIFT) & Self::TEXCOUNT_MASK
    }

    /// Size field selecting `floats` components (1-4) for texture set `index`
    pub const fn tex_coord_size(index: u32, floats: u32) -> u32 {
        let code = match floats {
            1 => 3,
            3 => 1,
            4 => 2,
            _ => 0,
        };
        code << (16 + index * 2)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Number of texture coordinate sets
    pub fn texture_count(&self) -> u32 {
        (self.0 & Self::TEXCOUNT_MASK) >> Self::TEXCOUNT_SHIFT
    }

    /// Size in bytes of one vertex described by this format
    pub fn vertex_size(&self) -> usize {
        const FLOAT: usize = std::mem::size_of::<f32>();
        const COLOR: usize = 4;

        let mut size = match self.0 & Self::POSITION_MASK {
            Self::XYZ => 3 * FLOAT,
            Self::XYZRHW | Self::XYZW => 4 * FLOAT,
            Self::XYZB1 => 4 * FLOAT,
            Self::XYZB2 => 5 * FLOAT,
            Self::XYZB3 => 6 * FLOAT,
            Self::XYZB4 => 7 * FLOAT,
            Self::XYZB5 => 8 * FLOAT,
            _ => 0,
        };
        if self.0 & Self::NORMAL != 0 {
            size += 3 * FLOAT;
        }
        if self.0 & Self::PSIZE != 0 {
            size += FLOAT;
        }
        if self.0 & Self::DIFFUSE != 0 {
            size += COLOR;
        }
        if self.0 & Self::SPECULAR != 0 {
            size += COLOR;
        }
        for set in 0..self.texture_count().min(8) {
            let floats = match (self.0 >> (16 + set * 2)) & 0x3 {
                0 => 2,
                1 => 3,
                2 => 4,
                _ => 1,
            };
            size += floats * FLOAT;
        }
        size
    }
}

// ===== DESCRIPTORS =====

/// Description of a vertex buffer, as returned by `desc()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferDesc {
    pub format: BufferFormat,
    pub resource_type: ResourceType,
    pub usage: Usage,
    pub pool: Pool,
    pub size: usize,
    pub fvf: Fvf,
}

/// Description of an index buffer, as returned by `desc()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferDesc {
    pub format: BufferFormat,
    pub resource_type: ResourceType,
    pub usage: Usage,
    pub pool: Pool,
    pub size: usize,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
