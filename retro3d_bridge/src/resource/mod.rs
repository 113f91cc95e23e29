/// Resource module - buffer resources and the legacy resource vocabulary

pub mod types;
pub mod shadow_data;
pub mod buffer_commands;
pub mod buffer_mapping;
pub mod buffer_object;
pub mod buffer_interface;

pub use types::*;
pub use shadow_data::{ShadowData, round_up_16};
pub use buffer_commands::{BufferCommand, BufferShared, PendingUpdate};
pub use buffer_mapping::BufferMapping;
pub use buffer_object::{BufferObject, BufferKind, LockState};
pub use buffer_interface::*;
