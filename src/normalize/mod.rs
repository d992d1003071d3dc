// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion of pushed readings into characteristic values.
//!
//! Each device adapter decides which of these to apply to which field; this
//! module only holds the arithmetic.
//!
//! - [`LinearTransform`] - user offset or factor for temperature and humidity
//! - [`BatteryScale`] / [`BatteryStatus`] - voltage or percent to a clamped level
//! - [`is_fresh`] - discards sensor triggers older than the configured window

mod battery;
mod freshness;
mod transform;

pub use battery::{BatteryScale, BatteryStatus};
pub use freshness::{epoch_secs, is_fresh, is_fresh_now};
pub use transform::{LinearTransform, humidity_percent};
