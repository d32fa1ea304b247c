// Audio devices - enumeration and lookup of cpal input/output devices

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// All output devices of the default host
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        match self.host.output_devices() {
            Ok(devices) => describe(devices, "audio_out", &default_name),
            Err(e) => {
                log::warn!("[AUDIO] Cannot enumerate output devices: {}", e);
                Vec::new()
            }
        }
    }

    /// All input (microphone) devices of the default host
    pub fn list_input_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        match self.host.input_devices() {
            Ok(devices) => describe(devices, "audio_in", &default_name),
            Err(e) => {
                log::warn!("[AUDIO] Cannot enumerate input devices: {}", e);
                Vec::new()
            }
        }
    }

    pub fn default_output_device(&self) -> Option<Device> {
        self.host.default_output_device()
    }

    pub fn default_input_device(&self) -> Option<Device> {
        self.host.default_input_device()
    }

    /// Output device by exact name
    pub fn output_device_by_name(&self, device_name: &str) -> Option<Device> {
        self.host
            .output_devices()
            .ok()?
            .find(|device| device.name().is_ok_and(|name| name == device_name))
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(
    devices: impl Iterator<Item = Device>,
    prefix: &str,
    default_name: &str,
) -> Vec<AudioDeviceInfo> {
    devices
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device.name().ok()?;
            Some(AudioDeviceInfo {
                id: format!("{}_{}", prefix, index),
                is_default: name == default_name,
                name,
            })
        })
        .collect()
}
