//! List available audio input devices.

use crate::recording::{list_input_devices, InputDeviceInfo};

/// Lists all available audio input devices on the system.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let devices = list_input_devices()?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!();
    println!("Available audio input devices:");
    println!();
    for device in &devices {
        print!("{}", describe_device(device));
    }

    Ok(())
}

fn describe_device(device: &InputDeviceInfo) -> String {
    let default_indicator = if device.is_default { " [DEFAULT]" } else { "" };
    let config_info = match device.default_config {
        Some((sample_rate, channels)) => format!(" ({sample_rate}Hz, {channels} channels)"),
        None => " (configuration unavailable)".to_string(),
    };

    format!(
        "  ID: {}\n    Name: {}{}\n    Config:{}\n\n",
        device.index, device.name, default_indicator, config_info
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_default_device() {
        let device = InputDeviceInfo {
            index: 0,
            name: "USB Mic".to_string(),
            is_default: true,
            default_config: Some((48_000, 2)),
        };
        assert_eq!(
            describe_device(&device),
            "  ID: 0\n    Name: USB Mic [DEFAULT]\n    Config: (48000Hz, 2 channels)\n\n"
        );
    }

    #[test]
    fn test_describe_device_without_config() {
        let device = InputDeviceInfo {
            index: 3,
            name: "Loopback".to_string(),
            is_default: false,
            default_config: None,
        };
        assert!(describe_device(&device).contains("Name: Loopback\n"));
        assert!(describe_device(&device).contains("(configuration unavailable)"));
    }
}
