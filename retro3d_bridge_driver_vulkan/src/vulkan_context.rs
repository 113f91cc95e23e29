/// VulkanContext - headless instance, device and allocator
///
/// Owns every Vulkan object the driver needs besides the buffers
/// themselves. Nothing is presented, so the instance is created without
/// surface extensions and the device without swapchain support.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use retro3d_bridge::retro3d::{Error, Result};
use retro3d_bridge::{engine_error, engine_info, engine_warn};
use std::ffi::CStr;
use std::mem::ManuallyDrop;

use crate::debug;
use crate::vulkan_driver::VulkanDriverConfig;

const SOURCE: &str = "retro3d::vulkan";
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct VulkanContext {
    _entry: ash::Entry,
    instance: ash::Instance,
    pub device: ash::Device,
    /// Dropped before the device is destroyed
    pub allocator: ManuallyDrop<Allocator>,
    /// Name reported by the physical device
    pub device_name: String,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

fn init_failed(what: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

impl VulkanContext {
    pub fn new(config: &VulkanDriverConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .map_err(|e| init_failed("Invalid application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Retro3D Bridge")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            let enable_validation = config.enable_validation && Self::validation_layer_present(&entry);

            let mut extension_names = Vec::new();
            let mut layer_names = Vec::new();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(VALIDATION_LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        engine_warn!(SOURCE, "Failed to create debug messenger: {:?}", e);
                        (None, None)
                    }
                }
            } else {
                (None, None)
            };

            // Objects created so far are released by the partially built context
            // if a later step fails.
            let context = PartialContext {
                instance: Some(instance),
                debug_utils_loader,
                debug_messenger,
            };

            let (physical_device, queue_family, device_name) =
                Self::pick_physical_device(context.instance(), config.prefer_discrete_gpu)?;

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos);

            let device = context
                .instance()
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("Failed to create logical device", e))?;

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: context.instance().clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    return Err(init_failed("Failed to create GPU allocator", e));
                }
            };

            engine_info!(
                SOURCE,
                "Vulkan device '{}' ready (queue family {}, validation {})",
                device_name,
                queue_family,
                if enable_validation { "on" } else { "off" }
            );

            let (instance, debug_utils_loader, debug_messenger) = context.release();
            Ok(Self {
                _entry: entry,
                instance,
                device,
                allocator: ManuallyDrop::new(allocator),
                device_name,
                debug_utils_loader,
                debug_messenger,
            })
        }
    }

    fn validation_layer_present(entry: &ash::Entry) -> bool {
        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let present = layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
        if !present {
            engine_warn!(SOURCE, "Validation requested but {:?} is not installed", VALIDATION_LAYER);
        }
        present
    }

    /// First device with a graphics or transfer queue; a discrete GPU wins
    /// when `prefer_discrete` is set
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        prefer_discrete: bool,
    ) -> Result<(vk::PhysicalDevice, u32, String)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;

        let mut candidates = Vec::new();
        for physical_device in physical_devices {
            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let family = families
                .iter()
                .position(|qf| qf.queue_flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER));
            if let Some(family) = family {
                let properties = instance.get_physical_device_properties(physical_device);
                let name = properties
                    .device_name_as_c_str()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| "unknown".to_string());
                let discrete = properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
                candidates.push((physical_device, family as u32, name, discrete));
            }
        }

        let index = if prefer_discrete {
            candidates.iter().position(|c| c.3).unwrap_or(0)
        } else {
            0
        };

        if index >= candidates.len() {
            engine_error!(SOURCE, "No Vulkan device with a graphics or transfer queue");
            return Err(Error::InitializationFailed(
                "No Vulkan device with a graphics or transfer queue".to_string(),
            ));
        }
        let (physical_device, family, name, _) = candidates.swap_remove(index);
        Ok((physical_device, family, name))
    }

    /// Whether the validation layer and debug messenger are active
    pub fn validation_enabled(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Allocator pages must go before the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger.take())
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

// ===== PARTIAL CONTEXT =====

/// Instance-level objects not yet handed to a `VulkanContext`
struct PartialContext {
    instance: Option<ash::Instance>,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl PartialContext {
    fn instance(&self) -> &ash::Instance {
        match &self.instance {
            Some(instance) => instance,
            None => unreachable!("instance is only taken by release()"),
        }
    }

    fn release(
        mut self,
    ) -> (ash::Instance, Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>) {
        let instance = match self.instance.take() {
            Some(instance) => instance,
            None => unreachable!("release() consumes the context"),
        };
        (instance, self.debug_utils_loader.take(), self.debug_messenger.take())
    }
}

impl Drop for PartialContext {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger.take())
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}
