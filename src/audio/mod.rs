//! Audio capture and playback
//!
//! Thin wrappers over cpal streams. Device selection matches the configured
//! headset by name substring, falling back to the system default.

mod capture;
mod device;
mod playback;

pub use capture::{AudioCapture, samples_to_wav};
pub use device::{find_input_device, find_output_device};
pub use playback::AudioPlayback;
