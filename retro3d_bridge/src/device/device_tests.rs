use super::*;
use crate::command::FnCommand;
use crate::driver::RecordingDriver;
use crate::error::Error;
use std::time::Duration;

fn test_config() -> BridgeConfig {
    BridgeConfig {
        app_name: "device tests".to_string(),
        worker_thread_name: "retro3d-device-test".to_string(),
        ..BridgeConfig::default()
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_device_starts_worker() {
    let device = Device::new(RecordingDriver::new(), test_config()).unwrap();

    assert!(device.queue().is_running());
    assert!(!device.queue().is_worker_thread());
    assert_eq!(device.driver_name(), "recording");
    assert_eq!(device.config().app_name, "device tests");
    assert_eq!(device.ref_count(), 1);
}

#[test]
fn test_clones_share_one_queue() {
    let device = Device::new(RecordingDriver::new(), test_config()).unwrap();
    let other = device.clone();

    assert!(device.ptr_eq(&other));
    assert!(std::ptr::eq(device.queue(), other.queue()));
    assert_eq!(device.ref_count(), 2);

    let unrelated = Device::new(RecordingDriver::new(), test_config()).unwrap();
    assert!(!device.ptr_eq(&unrelated));
}

// ============================================================================
// Buffer creation
// ============================================================================

#[test]
fn test_create_buffers() {
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let device = Device::new(driver, test_config()).unwrap();

    let vertices = device.create_vertex_buffer(48, Usage::empty(), Fvf(Fvf::XYZ), Pool::Default).unwrap();
    let indices = device.create_index_buffer(48, Usage::empty(), BufferFormat::Index16, Pool::Default).unwrap();

    assert_eq!(probe.live_buffer_count(), 2);
    assert_eq!(vertices.desc().size, 48);
    assert_eq!(indices.desc().size, 48);
    assert_eq!(device.ref_count(), 3);
}

#[test]
fn test_create_buffer_validation_errors_pass_through() {
    let device = Device::new(RecordingDriver::new(), test_config()).unwrap();

    let result = device.create_vertex_buffer(4, Usage::empty(), Fvf(Fvf::XYZ), Pool::Default);
    assert!(matches!(result, Err(Error::InvalidCall(_))));
    assert_eq!(device.ref_count(), 1);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_last_release_drains_queue() {
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let device = Device::new(driver, test_config()).unwrap();

    for _ in 0..5 {
        device.queue().enqueue(FnCommand::new("Create", |driver: &mut dyn Driver| {
            std::thread::sleep(Duration::from_millis(2));
            let _ = driver.create_buffer();
        })).unwrap();
    }
    drop(device);

    assert_eq!(probe.live_buffer_count(), 5);
}

#[test]
fn test_buffers_keep_device_alive() {
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let device = Device::new(driver, test_config()).unwrap();
    let buffer = device.create_vertex_buffer(64, Usage::empty(), Fvf(Fvf::XYZ), Pool::Default).unwrap();

    drop(device);
    assert_eq!(probe.live_buffer_count(), 1);

    drop(buffer);
    assert_eq!(probe.live_buffer_count(), 0);
}
