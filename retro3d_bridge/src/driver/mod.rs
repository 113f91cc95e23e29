/// Driver module - the graphics driver seam consumed by commands

// Module declarations
pub mod driver;
pub mod recording_driver;

// Re-export everything from driver.rs
pub use driver::*;

// Re-export the headless driver
pub use recording_driver::*;
