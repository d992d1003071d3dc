// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of per-device options against platform defaults.

use std::time::Duration;

use serde::Serialize;

use super::platform::{ConnectionMode, DeviceConfig, LoggingOverride, PlatformConfig};
use crate::normalize::LinearTransform;
use crate::types::TargetRange;

/// Default lock operation time, in tenths of a second.
pub const DEFAULT_OPERATION_TIME: u64 = 20;

/// Default in-use power threshold in watts.
pub const DEFAULT_IN_USE_POWER_THRESHOLD: f64 = 0.0;

/// Default low battery threshold in percent.
pub const DEFAULT_LOW_BATT_THRESHOLD: f64 = 25.0;

/// Default sensor freshness window in seconds.
pub const DEFAULT_SENSOR_TIME_DIFFERENCE: u64 = 120;

/// Whether an adapter logs, and how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogPolicy {
    /// Log state changes at `info`.
    pub enabled: bool,
    /// Log extra detail at `debug`.
    pub debug: bool,
}

impl LogPolicy {
    /// Combines the platform switches with a device override.
    #[must_use]
    pub fn resolve(platform: &PlatformConfig, over: Option<LoggingOverride>) -> Self {
        match over {
            Some(LoggingOverride::Standard) => Self {
                enabled: true,
                debug: false,
            },
            Some(LoggingOverride::Debug) => Self {
                enabled: true,
                debug: true,
            },
            Some(LoggingOverride::Disable) => Self {
                enabled: false,
                debug: false,
            },
            None => Self {
                enabled: !platform.disable_device_logging,
                debug: platform.debug,
            },
        }
    }

    /// Label used when reporting options.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.enabled {
            "standard"
        } else {
            "disable"
        }
    }

    /// Returns `true` if a push-originated change should be logged.
    #[must_use]
    pub const fn logs_push(&self, device_originated: bool) -> bool {
        self.enabled && device_originated
    }
}

/// Fully resolved options for one adapter.
///
/// Built once at adapter construction; nothing re-reads the raw
/// configuration afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceOptions {
    /// Logging policy.
    pub log: LogPolicy,
    /// Temperature correction.
    pub temperature: LinearTransform,
    /// Humidity correction.
    pub humidity: LinearTransform,
    /// Heater target window.
    pub target_range: TargetRange,
    /// Lock operation time in tenths of a second.
    pub operation_time: u64,
    /// Confirmation sensor device id.
    pub sensor_id: Option<String>,
    /// Fan light hidden.
    pub hide_light: bool,
    /// Ambient relay hidden.
    pub hide_switch: bool,
    /// Only single presses on stateless buttons.
    pub hide_long_double: bool,
    /// Outlet in-use threshold in watts.
    pub in_use_power_threshold: f64,
    /// Low battery threshold in percent.
    pub low_batt_threshold: f64,
    /// Sensor freshness window in seconds.
    pub sensor_time_difference: u64,
    /// ×10 battery scaling.
    pub scale_battery: bool,
    /// Reads are served even while offline.
    pub disable_no_response: bool,
    /// Platform connection mode.
    pub mode: ConnectionMode,
}

impl DeviceOptions {
    /// Resolves the options for `device_id`.
    ///
    /// # Examples
    ///
    /// ```
    /// use accessory_sync::config::{DeviceConfig, DeviceOptions, PlatformConfig};
    ///
    /// let platform = PlatformConfig::new()
    ///     .with_device(DeviceConfig::new("1000aa").with_target_range(16.0, 16.0));
    /// let options = DeviceOptions::resolve(&platform, "1000aa");
    /// assert_eq!(options.target_range.max(), 17.0);
    /// assert_eq!(options.operation_time, 20);
    /// ```
    #[must_use]
    pub fn resolve(platform: &PlatformConfig, device_id: &str) -> Self {
        let fallback = DeviceConfig::default();
        let dev = platform.device(device_id).unwrap_or(&fallback);

        let min_target = dev.min_target.unwrap_or(TargetRange::DEFAULT_MIN);
        let max_target = dev
            .max_target
            .unwrap_or(TargetRange::DEFAULT_MAX)
            .max(min_target + 1.0);
        let target_range = TargetRange::new(min_target, max_target).unwrap_or_default();

        Self {
            log: LogPolicy::resolve(platform, dev.override_logging),
            temperature: LinearTransform::new(dev.offset.unwrap_or(0.0), dev.offset_factor),
            humidity: LinearTransform::new(
                dev.humidity_offset.map_or(0.0, f64::trunc),
                dev.humidity_offset_factor,
            ),
            target_range,
            operation_time: dev
                .operation_time
                .filter(|t| *t > 0)
                .unwrap_or(DEFAULT_OPERATION_TIME),
            sensor_id: dev.sensor_id.clone().filter(|s| !s.is_empty()),
            hide_light: dev.hide_light,
            hide_switch: dev.hide_switch,
            hide_long_double: dev.hide_long_double,
            in_use_power_threshold: dev
                .in_use_power_threshold
                .unwrap_or(DEFAULT_IN_USE_POWER_THRESHOLD),
            low_batt_threshold: dev
                .low_batt_threshold
                .filter(|t| *t > 0.0)
                .map_or(DEFAULT_LOW_BATT_THRESHOLD, |t| t.min(100.0)),
            sensor_time_difference: dev
                .sensor_time_difference
                .filter(|t| *t > 0)
                .unwrap_or(DEFAULT_SENSOR_TIME_DIFFERENCE),
            scale_battery: dev.scale_battery,
            disable_no_response: platform.disable_no_response,
            mode: platform.mode,
        }
    }

    /// Lock relock delay when no confirmation sensor is configured.
    #[must_use]
    pub fn unconfirmed_relock_delay(&self) -> Duration {
        Duration::from_millis((self.operation_time * 100).max(1000))
    }

    /// Lock relock delay when a confirmation sensor is configured.
    #[must_use]
    pub fn confirmed_relock_delay(&self) -> Duration {
        Duration::from_millis(self.operation_time * 100 + 50)
    }

    /// Returns `true` if cloud-side reporting requests make sense.
    #[must_use]
    pub fn polls_cloud(&self) -> bool {
        self.mode != ConnectionMode::Lan
    }
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self::resolve(&PlatformConfig::default(), "")
    }
}

/// Options summary logged when an adapter starts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptionsSummary<'a> {
    pub logging: &'static str,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub name: &'a str,
}

impl<'a> OptionsSummary<'a> {
    pub(crate) fn new(name: &'a str, log: LogPolicy) -> Self {
        Self {
            logging: log.label(),
            extra: serde_json::Map::new(),
            name,
        }
    }

    #[must_use]
    pub(crate) fn with(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.extra.insert(key.to_string(), value);
        }
        self
    }

    /// Logs the summary at `info`.
    pub(crate) fn emit(&self) {
        let opts = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(accessory = %self.name, options = %opts, "initialised with options");
    }
}
