//! Device enumeration and lookup via cpal.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

/// Fallback rate reported when a device will not say.
const UNKNOWN_SAMPLE_RATE: u32 = 48000;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub default_channels: u16,
}

/// List all available audio devices on the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDevice> = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                let (sample_rate, channels) = device
                    .default_input_config()
                    .map(|c| (c.sample_rate(), c.channels()))
                    .unwrap_or((UNKNOWN_SAMPLE_RATE, 0));
                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output: device.default_output_config().is_ok(),
                    default_sample_rate: sample_rate,
                    default_channels: channels,
                });
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let (sample_rate, channels) = device
                    .default_output_config()
                    .map(|c| (c.sample_rate(), c.channels()))
                    .unwrap_or((UNKNOWN_SAMPLE_RATE, 0));
                devices.push(AudioDevice {
                    name,
                    is_input: false,
                    is_output: true,
                    default_sample_rate: sample_rate,
                    default_channels: channels,
                });
            }
        }
    }

    Ok(devices)
}

/// Default `(input, output)` devices, either of which may be absent.
pub fn default_device() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host.default_input_device().and_then(|d| {
        device_name(&d).ok().map(|name| {
            let (rate, channels) = d
                .default_input_config()
                .map(|c| (c.sample_rate(), c.channels()))
                .unwrap_or((UNKNOWN_SAMPLE_RATE, 0));
            AudioDevice {
                name,
                is_input: true,
                is_output: false,
                default_sample_rate: rate,
                default_channels: channels,
            }
        })
    });

    let output = host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| {
            let (rate, channels) = d
                .default_output_config()
                .map(|c| (c.sample_rate(), c.channels()))
                .unwrap_or((UNKNOWN_SAMPLE_RATE, 0));
            AudioDevice {
                name,
                is_input: false,
                is_output: true,
                default_sample_rate: rate,
                default_channels: channels,
            }
        })
    });

    Ok((input, output))
}

/// Resolve the input device for `name_or_index`, or the host default.
pub(crate) fn find_input_device(host: &Host, name_or_index: Option<&str>) -> Result<Device> {
    let Some(search) = name_or_index else {
        return host.default_input_device().ok_or(Error::NoDevice);
    };
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();
    let names: Vec<_> = devices.iter().map(|d| device_name(d).ok()).collect();
    let index = find_device_index(&names, search, "input")?;
    Ok(devices[index].clone())
}

/// Resolve the output device for `name_or_index`, or the host default.
pub(crate) fn find_output_device(host: &Host, name_or_index: Option<&str>) -> Result<Device> {
    let Some(search) = name_or_index else {
        return host.default_output_device().ok_or(Error::NoDevice);
    };
    let devices: Vec<_> = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();
    let names: Vec<_> = devices.iter().map(|d| device_name(d).ok()).collect();
    let index = find_device_index(&names, search, "output")?;
    Ok(devices[index].clone())
}

/// Pick a device by numeric index, exact name, or case-insensitive partial
/// name, in that order. Unnamed devices are only reachable by index.
fn find_device_index(names: &[Option<String>], name_or_index: &str, kind: &str) -> Result<usize> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        return if index < names.len() {
            Ok(index)
        } else {
            Err(Error::DeviceNotFound(format!(
                "{} device index {} (only {} devices available)",
                kind,
                index,
                names.len()
            )))
        };
    }

    if let Some(index) = names
        .iter()
        .position(|n| n.as_deref() == Some(name_or_index))
    {
        return Ok(index);
    }

    let search_lower = name_or_index.to_lowercase();
    let matches: Vec<(usize, &str)> = names
        .iter()
        .enumerate()
        .filter_map(|(i, n)| {
            n.as_deref()
                .filter(|name| name.to_lowercase().contains(&search_lower))
                .map(|name| (i, name))
        })
        .collect();

    match matches.as_slice() {
        [] => Err(Error::DeviceNotFound(format!(
            "no {} device matching '{}'",
            kind, name_or_index
        ))),
        [(index, _)] => Ok(*index),
        [(index, first), ..] => {
            let all: Vec<_> = matches.iter().map(|(_, n)| *n).collect();
            tracing::warn!(
                search = name_or_index,
                kind,
                matches = ?all,
                chosen = first,
                "ambiguous device name; using first match"
            );
            Ok(*index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<Option<String>> {
        list.iter().map(|n| Some((*n).to_string())).collect()
    }

    #[test]
    fn test_list_devices() {
        // Device availability depends on the system; this only checks it
        // does not panic.
        assert!(list_devices().is_ok());
    }

    #[test]
    fn test_default_device() {
        assert!(default_device().is_ok());
    }

    #[test]
    fn lookup_by_index() {
        let n = names(&["Built-in", "USB Audio"]);
        assert_eq!(find_device_index(&n, "1", "output").unwrap(), 1);
        let err = find_device_index(&n, "5", "output").unwrap_err();
        assert!(err.to_string().contains("only 2 devices"));
    }

    #[test]
    fn exact_name_wins_over_partial() {
        let n = names(&["USB Audio Pro", "USB Audio"]);
        assert_eq!(find_device_index(&n, "USB Audio", "input").unwrap(), 1);
    }

    #[test]
    fn partial_match_is_case_insensitive() {
        let mut n = names(&["Built-in Microphone", "Scarlett 2i2"]);
        n.insert(0, None);
        assert_eq!(find_device_index(&n, "scarlett", "input").unwrap(), 2);
        assert_eq!(find_device_index(&n, "BUILT", "input").unwrap(), 1);
    }

    #[test]
    fn ambiguous_match_takes_first() {
        let n = names(&["Speakers A", "Speakers B"]);
        assert_eq!(find_device_index(&n, "speakers", "output").unwrap(), 0);
    }

    #[test]
    fn no_match_is_device_not_found() {
        let n = names(&["Built-in"]);
        assert!(matches!(
            find_device_index(&n, "usb", "output"),
            Err(Error::DeviceNotFound(_))
        ));
    }
}
