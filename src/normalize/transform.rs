// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linear correction of sensor readings.

use serde::Serialize;

/// A user-configured correction applied to a raw reading.
///
/// # Examples
///
/// ```
/// use accessory_sync::normalize::LinearTransform;
///
/// assert_eq!(LinearTransform::Offset(-1.5).apply(21.0), 19.5);
/// assert_eq!(LinearTransform::Factor(2.0).apply(21.0), 42.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearTransform {
    /// Add this amount.
    Offset(f64),
    /// Multiply by this amount.
    Factor(f64),
}

impl LinearTransform {
    /// The identity correction.
    pub const NONE: Self = Self::Offset(0.0);

    /// Builds a transform from an amount and a "treat as factor" flag.
    #[must_use]
    pub fn new(amount: f64, as_factor: bool) -> Self {
        if as_factor {
            Self::Factor(amount)
        } else {
            Self::Offset(amount)
        }
    }

    /// Applies the correction.
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Self::Offset(amount) => value + amount,
            Self::Factor(amount) => value * amount,
        }
    }
}

impl Default for LinearTransform {
    fn default() -> Self {
        Self::NONE
    }
}

/// Converts a raw humidity reading to a clamped integer percentage.
///
/// The reading is truncated before the correction and again after it.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn humidity_percent(raw: i64, transform: LinearTransform) -> i64 {
    #[allow(clippy::cast_precision_loss)]
    let corrected = transform.apply(raw as f64).trunc() as i64;
    corrected.clamp(0, 100)
}
