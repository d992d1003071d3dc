// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery level scaling.

/// How a device reports its battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryScale {
    /// Cell voltage between 2.0 V (empty) and 3.0 V (full).
    Voltage2To3,
    /// A percentage, optionally reported in tenths (×10 to recover it).
    Percent {
        /// Multiply the raw value by ten.
        times_ten: bool,
    },
}

impl BatteryScale {
    /// Converts a raw reading to a percentage in `[0, 100]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use accessory_sync::normalize::BatteryScale;
    ///
    /// assert_eq!(BatteryScale::Voltage2To3.percent(2.5), 50);
    /// assert_eq!(BatteryScale::Percent { times_ten: true }.percent(45.0), 100);
    /// assert_eq!(BatteryScale::Percent { times_ten: false }.percent(-3.0), 0);
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn percent(&self, raw: f64) -> i64 {
        let scaled = match *self {
            Self::Voltage2To3 => ((raw.clamp(2.0, 3.0) - 2.0) * 100.0).round(),
            Self::Percent { times_ten: true } => raw * 10.0,
            Self::Percent { times_ten: false } => raw,
        };
        scaled.clamp(0.0, 100.0) as i64
    }
}

/// A normalized battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Level in percent.
    pub level: i64,
    /// Whether the level is below the configured threshold.
    pub low: bool,
}

impl BatteryStatus {
    /// Scales a raw reading and compares it against `low_threshold`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_raw(raw: f64, scale: BatteryScale, low_threshold: f64) -> Self {
        let level = scale.percent(raw);
        Self {
            level,
            low: (level as f64) < low_threshold,
        }
    }

    /// Returns the `StatusLowBattery` characteristic value.
    #[must_use]
    pub fn low_flag(&self) -> i64 {
        i64::from(self.low)
    }
}
