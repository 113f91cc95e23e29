use super::*;
use serial_test::serial;

/// Driver on the local Vulkan device, or `None` when there is none
fn try_driver() -> Option<VulkanDriver> {
    match VulkanDriver::new(VulkanDriverConfig::default()) {
        Ok(driver) => Some(driver),
        Err(e) => {
            eprintln!("Skipping: Vulkan unavailable ({})", e);
            None
        }
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[test]
fn test_config_default() {
    let config = VulkanDriverConfig::default();
    assert_eq!(config.app_name, "Retro3D Application");
    assert_eq!(config.enable_validation, cfg!(feature = "vulkan-validation"));
    assert!(config.prefer_discrete_gpu);
}

// ============================================================================
// DRIVER (skipped without a Vulkan device)
// ============================================================================

#[test]
#[serial]
fn test_create_buffer_has_no_storage() {
    let Some(mut driver) = try_driver() else { return };

    let first = driver.create_buffer().unwrap();
    let second = driver.create_buffer().unwrap();
    assert_ne!(first, second);
    assert_eq!(driver.buffer_count(), 2);
    assert_eq!(driver.buffer_size(first), Some(0));
}

#[test]
#[serial]
fn test_upload_full_then_sub_range() {
    let Some(mut driver) = try_driver() else { return };

    let id = driver.create_buffer().unwrap();
    let data: Vec<u8> = (0..32).collect();
    driver.upload_full(id, 32, Some(&data), DriverUsageHint::Dynamic).unwrap();
    assert_eq!(driver.buffer_size(id), Some(32));
    assert_eq!(driver.buffer_contents(id).unwrap(), data);

    driver.upload_sub_range(id, 8, &[0xFF; 4]).unwrap();
    let contents = driver.buffer_contents(id).unwrap();
    assert_eq!(&contents[8..12], &[0xFF; 4]);
    assert_eq!(contents[7], 7);
    assert_eq!(contents[12], 12);
}

#[test]
#[serial]
fn test_upload_full_without_data_resizes() {
    let Some(mut driver) = try_driver() else { return };

    let id = driver.create_buffer().unwrap();
    driver.upload_full(id, 16, Some(&[1; 16]), DriverUsageHint::Stream).unwrap();
    driver.upload_full(id, 64, None, DriverUsageHint::Stream).unwrap();
    assert_eq!(driver.buffer_size(id), Some(64));
}

#[test]
#[serial]
fn test_upload_errors() {
    let Some(mut driver) = try_driver() else { return };

    let id = driver.create_buffer().unwrap();
    // No storage yet
    assert!(driver.upload_sub_range(id, 0, &[1, 2]).is_err());

    driver.upload_full(id, 16, None, DriverUsageHint::Stream).unwrap();
    assert!(driver.upload_sub_range(id, 12, &[0; 8]).is_err());
    assert!(driver.upload_full(id, 32, Some(&[0; 8]), DriverUsageHint::Stream).is_err());

    let unknown = BufferId::new(999).unwrap();
    assert!(driver.upload_full(unknown, 16, None, DriverUsageHint::Stream).is_err());
}

#[test]
#[serial]
fn test_delete_buffer() {
    let Some(mut driver) = try_driver() else { return };

    let id = driver.create_buffer().unwrap();
    driver.upload_full(id, 16, None, DriverUsageHint::Dynamic).unwrap();
    driver.delete_buffer(id).unwrap();
    assert_eq!(driver.buffer_count(), 0);
    assert_eq!(driver.buffer_size(id), None);

    // Deleting twice is tolerated
    assert!(driver.delete_buffer(id).is_ok());
}
