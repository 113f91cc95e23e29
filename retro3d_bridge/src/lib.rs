/*!
# Retro3D Bridge

Core of a compatibility layer exposing legacy fixed-function 3D buffer
resources (vertex and index buffers with Lock/Unlock) on top of a modern
driver.

Driver contexts are bound to a single thread, so every driver call is made
by one dedicated worker thread. Application threads only touch CPU-side
shadow copies and enqueue commands; the worker executes them in submission
order.

## Architecture

- **Driver**: trait over the driver entry points (create, upload, delete);
  moved into the worker thread when the device is created
- **CommandQueue**: ordered multi-producer queue drained by the worker
- **Device**: owns the queue; every buffer holds a device handle
- **BufferObject**: shadow data, lock state machine and pending-update
  tracking; `VertexBuffer` / `IndexBuffer` are its reference-counted handles

Backends (such as the Vulkan driver crate) implement `Driver`;
`RecordingDriver` is a headless in-memory implementation.
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod driver;
pub mod command;
pub mod device;
pub mod resource;

// Main retro3d namespace module
pub mod retro3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{BridgeConfig, LOG_FILE_ENV, LOG_LEVEL_ENV};

    // Resource owner
    pub use crate::device::Device;

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, FileLogger, LogFacadeLogger};
    }

    // Driver seam and the headless driver
    pub mod driver {
        pub use crate::driver::*;
    }

    // Commands and the worker queue
    pub mod command {
        pub use crate::command::*;
    }

    // Buffer resources
    pub mod resource {
        pub use crate::resource::*;
    }
}
