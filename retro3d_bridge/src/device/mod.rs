/// Device module - resource owner holding the command queue

pub mod device;

pub use device::*;
