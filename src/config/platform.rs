// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform and per-device configuration as loaded by the host.

use serde::{Deserialize, Serialize};

/// How the host reaches devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Local network only. Cloud-side reporting requests are skipped.
    Lan,
    /// Cloud only.
    Wan,
    /// Local network with cloud fallback.
    #[default]
    Auto,
}

/// Per-device logging override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingOverride {
    /// State changes only.
    Standard,
    /// State changes and debug detail.
    Debug,
    /// Nothing.
    Disable,
}

/// What a relay linked to a contact sensor is shown as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowAs {
    /// Plain switch.
    Switch,
    /// Simulated lock.
    Lock,
    /// Simulated garage door.
    Garage,
}

/// Options for one device, keyed by its protocol device id.
///
/// Every field is optional; [`DeviceOptions`](super::DeviceOptions) fills in
/// the defaults.
///
/// # Examples
///
/// ```
/// use accessory_sync::config::{DeviceConfig, ShowAs};
///
/// let config = DeviceConfig::new("1000abcd")
///     .with_show_as(ShowAs::Lock)
///     .with_sensor_id("1000ffff")
///     .with_operation_time(30);
/// assert_eq!(config.operation_time, Some(30));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    /// Protocol device id this entry applies to.
    pub device_id: String,
    /// Logging override.
    pub override_logging: Option<LoggingOverride>,
    /// Temperature offset, or factor when `offset_factor` is set.
    pub offset: Option<f64>,
    /// Treat `offset` as a multiplier.
    pub offset_factor: bool,
    /// Humidity offset (truncated to an integer), or factor.
    pub humidity_offset: Option<f64>,
    /// Treat `humidity_offset` as a multiplier.
    pub humidity_offset_factor: bool,
    /// Lowest selectable heater target.
    pub min_target: Option<f64>,
    /// Highest selectable heater target.
    pub max_target: Option<f64>,
    /// Lock operation time in tenths of a second.
    pub operation_time: Option<u64>,
    /// Device id of a contact sensor confirming the lock position.
    pub sensor_id: Option<String>,
    /// How a linked relay is shown.
    pub show_as: Option<ShowAs>,
    /// Hide the fan light.
    pub hide_light: bool,
    /// Hide the ambient sensor relay.
    pub hide_switch: bool,
    /// Only report single presses on stateless buttons.
    pub hide_long_double: bool,
    /// Power draw in watts above which an outlet is in use.
    pub in_use_power_threshold: Option<f64>,
    /// Battery percentage below which the battery is reported low.
    pub low_batt_threshold: Option<f64>,
    /// Seconds after which a sensor trigger is stale.
    pub sensor_time_difference: Option<u64>,
    /// Multiply percent battery readings by ten.
    pub scale_battery: bool,
}

impl DeviceConfig {
    /// Creates an entry with no overrides.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// Sets the logging override.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingOverride) -> Self {
        self.override_logging = Some(logging);
        self
    }

    /// Sets an additive temperature offset.
    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self.offset_factor = false;
        self
    }

    /// Sets a multiplicative temperature factor.
    #[must_use]
    pub fn with_offset_factor(mut self, factor: f64) -> Self {
        self.offset = Some(factor);
        self.offset_factor = true;
        self
    }

    /// Sets an additive humidity offset.
    #[must_use]
    pub fn with_humidity_offset(mut self, offset: f64) -> Self {
        self.humidity_offset = Some(offset);
        self.humidity_offset_factor = false;
        self
    }

    /// Sets the heater target bounds.
    #[must_use]
    pub fn with_target_range(mut self, min: f64, max: f64) -> Self {
        self.min_target = Some(min);
        self.max_target = Some(max);
        self
    }

    /// Sets the lock operation time in tenths of a second.
    #[must_use]
    pub fn with_operation_time(mut self, deciseconds: u64) -> Self {
        self.operation_time = Some(deciseconds);
        self
    }

    /// Links a contact sensor.
    #[must_use]
    pub fn with_sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    /// Sets how the relay is shown.
    #[must_use]
    pub fn with_show_as(mut self, show_as: ShowAs) -> Self {
        self.show_as = Some(show_as);
        self
    }

    /// Hides the fan light.
    #[must_use]
    pub fn with_hidden_light(mut self) -> Self {
        self.hide_light = true;
        self
    }

    /// Hides the ambient sensor relay.
    #[must_use]
    pub fn with_hidden_switch(mut self) -> Self {
        self.hide_switch = true;
        self
    }

    /// Restricts stateless buttons to single presses.
    #[must_use]
    pub fn with_hidden_long_double(mut self) -> Self {
        self.hide_long_double = true;
        self
    }

    /// Sets the in-use power threshold in watts.
    #[must_use]
    pub fn with_in_use_power_threshold(mut self, watts: f64) -> Self {
        self.in_use_power_threshold = Some(watts);
        self
    }

    /// Sets the low battery threshold in percent.
    #[must_use]
    pub fn with_low_batt_threshold(mut self, percent: f64) -> Self {
        self.low_batt_threshold = Some(percent);
        self
    }

    /// Sets the sensor freshness window in seconds.
    #[must_use]
    pub fn with_sensor_time_difference(mut self, seconds: u64) -> Self {
        self.sensor_time_difference = Some(seconds);
        self
    }

    /// Enables ×10 battery scaling.
    #[must_use]
    pub fn with_scaled_battery(mut self) -> Self {
        self.scale_battery = true;
        self
    }

    /// Returns `true` if this relay is driven by the given contact sensor.
    #[must_use]
    pub fn is_linked_to(&self, sensor_id: &str) -> bool {
        self.sensor_id.as_deref() == Some(sensor_id)
            && matches!(self.show_as, Some(ShowAs::Lock | ShowAs::Garage))
    }
}

/// Settings shared by every adapter on the platform.
///
/// # Examples
///
/// ```
/// use accessory_sync::config::{ConnectionMode, PlatformConfig};
///
/// let config: PlatformConfig = serde_json::from_str(
///     r#"{"mode":"lan","debug":true,"devices":[{"deviceId":"1000aa","hideLight":true}]}"#,
/// ).unwrap();
/// assert_eq!(config.mode, ConnectionMode::Lan);
/// assert!(config.device("1000aa").unwrap().hide_light);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    /// Turn off state-change logging for all devices.
    pub disable_device_logging: bool,
    /// Turn on debug logging for all devices.
    pub debug: bool,
    /// Serve reads from cache even while a device is offline.
    pub disable_no_response: bool,
    /// How devices are reached.
    pub mode: ConnectionMode,
    /// Per-device overrides.
    pub devices: Vec<DeviceConfig>,
}

impl PlatformConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables debug logging platform-wide.
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Disables the offline read check.
    #[must_use]
    pub fn with_disable_no_response(mut self) -> Self {
        self.disable_no_response = true;
        self
    }

    /// Adds a device override, replacing any existing entry for that id.
    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.retain(|d| d.device_id != device.device_id);
        self.devices.push(device);
        self
    }

    /// Returns the override for a device id.
    #[must_use]
    pub fn device(&self, device_id: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    /// Returns the entries whose relay is driven by the given contact sensor.
    pub fn linked_to<'a>(&'a self, sensor_id: &'a str) -> impl Iterator<Item = &'a DeviceConfig> {
        self.devices.iter().filter(move |d| d.is_linked_to(sensor_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_overrides() {
        let config: DeviceConfig = serde_json::from_str(
            r#"{"deviceId":"1000aa","overrideLogging":"debug","offsetFactor":true,
                "offset":1.5,"showAs":"garage","sensorId":"1000bb"}"#,
        )
        .unwrap();
        assert_eq!(config.override_logging, Some(LoggingOverride::Debug));
        assert!(config.offset_factor);
        assert!(config.is_linked_to("1000bb"));
        assert!(!config.is_linked_to("1000cc"));
    }

    #[test]
    fn switch_show_as_is_not_linked() {
        let config = DeviceConfig::new("1000aa")
            .with_sensor_id("1000bb")
            .with_show_as(ShowAs::Switch);
        assert!(!config.is_linked_to("1000bb"));
    }

    #[test]
    fn with_device_replaces_existing_entry() {
        let config = PlatformConfig::new()
            .with_device(DeviceConfig::new("a").with_operation_time(5))
            .with_device(DeviceConfig::new("a").with_operation_time(9));
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.device("a").unwrap().operation_time, Some(9));
    }

    #[test]
    fn linked_to_filters_by_sensor() {
        let config = PlatformConfig::new()
            .with_device(
                DeviceConfig::new("lock1")
                    .with_sensor_id("s1")
                    .with_show_as(ShowAs::Lock),
            )
            .with_device(DeviceConfig::new("lock2").with_sensor_id("s2").with_show_as(ShowAs::Lock));
        let linked: Vec<_> = config.linked_to("s1").map(|d| d.device_id.as_str()).collect();
        assert_eq!(linked, ["lock1"]);
    }

    #[test]
    fn mode_defaults_to_auto() {
        let config: PlatformConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.mode, ConnectionMode::Auto);
        assert!(config.devices.is_empty());
    }
}
