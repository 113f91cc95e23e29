/// Validation layer messages routed into the bridge logger

use ash::vk;
use retro3d_bridge::{engine_error, engine_warn};
use std::ffi::CStr;
use std::sync::atomic::{AtomicU64, Ordering};

const SOURCE: &str = "retro3d::vulkan::validation";

static VALIDATION_ERRORS: AtomicU64 = AtomicU64::new(0);
static VALIDATION_WARNINGS: AtomicU64 = AtomicU64::new(0);

/// Counters of validation messages received by this process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u64,
    pub warnings: u64,
}

pub fn validation_stats() -> ValidationStats {
    ValidationStats {
        errors: VALIDATION_ERRORS.load(Ordering::Relaxed),
        warnings: VALIDATION_WARNINGS.load(Ordering::Relaxed),
    }
}

fn message_text(ptr: *const std::os::raw::c_char, fallback: &'static str) -> String {
    if ptr.is_null() {
        return fallback.to_string();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Forward one validation message
pub(crate) fn report(severity: vk::DebugUtilsMessageSeverityFlagsEXT, id_name: &str, message: &str) {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        engine_error!(SOURCE, "[{}] {}", id_name, message);
    } else {
        VALIDATION_WARNINGS.fetch_add(1, Ordering::Relaxed);
        engine_warn!(SOURCE, "[{}] {}", id_name, message);
    }
}

/// # Safety
///
/// Called by the Vulkan loader with a valid callback data pointer.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let id_name = message_text(callback_data.p_message_id_name, "Unknown");
    let message = message_text(callback_data.p_message, "No message");

    report(message_severity, &id_name, &message);
    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
