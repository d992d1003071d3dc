// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration types.
//!
//! The host deserializes a [`PlatformConfig`] (usually from JSON) and hands it
//! to every adapter. Each adapter resolves its own [`DeviceOptions`] once, at
//! construction, filling unset fields with defaults.
//!
//! # Examples
//!
//! ```
//! use accessory_sync::config::{DeviceConfig, DeviceOptions, PlatformConfig};
//!
//! let platform = PlatformConfig::new()
//!     .with_device(DeviceConfig::new("1000aa").with_offset(-0.5));
//! let options = DeviceOptions::resolve(&platform, "1000aa");
//! assert_eq!(options.temperature.apply(21.0), 20.5);
//! ```

mod migration;
mod options;
mod platform;

pub use migration::{DEFAULT_HEATER_TARGET, Migration, ensure_simulation};
pub(crate) use options::OptionsSummary;
pub use options::{
    DEFAULT_IN_USE_POWER_THRESHOLD, DEFAULT_LOW_BATT_THRESHOLD, DEFAULT_OPERATION_TIME,
    DEFAULT_SENSOR_TIME_DIFFERENCE, DeviceOptions, LogPolicy,
};
pub use platform::{ConnectionMode, DeviceConfig, LoggingOverride, PlatformConfig, ShowAs};
