/*!
# Retro3D Bridge - Vulkan Driver Backend

Vulkan implementation of the `Driver` trait of `retro3d_bridge`.

The backend runs headless: it creates an instance and a logical device
without any surface, and backs every buffer handle with a host-visible
allocation from gpu-allocator. Uploads are copies through the persistent
mapping.

```no_run
use retro3d_bridge::retro3d::{BridgeConfig, Device};
use retro3d_bridge_driver_vulkan::retro3d::vulkan::{VulkanDriver, VulkanDriverConfig};

let driver = VulkanDriver::new(VulkanDriverConfig::default())?;
let device = Device::new(driver, BridgeConfig::default())?;
# Ok::<(), retro3d_bridge::retro3d::Error>(())
```
*/

mod debug;
mod vulkan_buffer;
mod vulkan_context;
mod vulkan_driver;

pub mod retro3d {
    pub mod vulkan {
        pub use crate::vulkan_driver::{VulkanDriver, VulkanDriverConfig};
        pub use crate::debug::{validation_stats, ValidationStats};
    }
}
