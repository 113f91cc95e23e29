/// Command module - deferred work and the driver-thread queue

pub mod command;
pub mod command_queue;

pub use command::*;
pub use command_queue::*;
