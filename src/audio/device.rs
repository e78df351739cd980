//! Audio device location by name match

use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

/// Find an input device whose name contains `name_match` (case-insensitive)
///
/// Returns `None` when no matching device with input channels exists. The
/// caller decides whether that is fatal; the dialogue worker treats a missing
/// input device as its only unrecoverable error.
#[must_use]
pub fn find_input_device(name_match: &str) -> Option<Device> {
    let host = cpal::default_host();
    let needle = name_match.to_lowercase();

    if let Ok(devices) = host.input_devices() {
        for device in devices {
            let name = device.name().unwrap_or_default();
            if name.to_lowercase().contains(&needle) {
                tracing::info!(device = %name, "audio input device");
                return Some(device);
            }
        }
    }

    None
}

/// Find an output device whose name contains `name_match` (case-insensitive)
///
/// Falls back to the default output device; playback is best-effort so a
/// `None` here only disables spoken responses.
#[must_use]
pub fn find_output_device(name_match: &str) -> Option<Device> {
    let host = cpal::default_host();
    let needle = name_match.to_lowercase();

    if let Ok(devices) = host.output_devices() {
        for device in devices {
            let name = device.name().unwrap_or_default();
            if name.to_lowercase().contains(&needle) {
                tracing::info!(device = %name, "audio output device");
                return Some(device);
            }
        }
    }

    tracing::warn!(name_match, "no matching output device, trying default");
    host.default_output_device()
}
