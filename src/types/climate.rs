// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater states and target temperature bounds.

use std::fmt;

use crate::error::ValueError;

/// Reported heater activity (`CurrentHeaterCoolerState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaterState {
    /// The heater is switched off.
    Inactive,
    /// The heater is on but the room is warm enough.
    Idle,
    /// The relay is closed and the heater is heating.
    Heating,
}

impl HeaterState {
    /// Returns the characteristic value.
    #[must_use]
    pub const fn as_num(&self) -> i64 {
        match self {
            Self::Inactive => 0,
            Self::Idle => 1,
            Self::Heating => 2,
        }
    }

    /// Derives the state from the active flag and the heat decision.
    #[must_use]
    pub const fn from_flags(active: bool, heating: bool) -> Self {
        match (active, heating) {
            (false, _) => Self::Inactive,
            (true, false) => Self::Idle,
            (true, true) => Self::Heating,
        }
    }
}

impl fmt::Display for HeaterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Inactive => "off",
            Self::Idle => "idle",
            Self::Heating => "heating",
        };
        write!(f, "{label}")
    }
}

/// Allowed target temperature window for a simulated heater.
///
/// # Examples
///
/// ```
/// use accessory_sync::types::TargetRange;
///
/// let range = TargetRange::new(10.0, 30.0).unwrap();
/// assert_eq!(range.clamp(35.0), 30.0);
/// assert!(TargetRange::new(20.0, 20.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TargetRange {
    min: f64,
    max: f64,
}

impl TargetRange {
    /// Default lower bound in degrees Celsius.
    pub const DEFAULT_MIN: f64 = 10.0;

    /// Default upper bound in degrees Celsius.
    pub const DEFAULT_MAX: f64 = 30.0;

    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `max` is not at least one degree
    /// above `min`.
    pub fn new(min: f64, max: f64) -> Result<Self, ValueError> {
        if max < min + 1.0 {
            return Err(ValueError::OutOfRange {
                min: min + 1.0,
                max: f64::INFINITY,
                actual: max,
            });
        }
        Ok(Self { min, max })
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Clamps a temperature into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Default for TargetRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_state_from_flags() {
        assert_eq!(HeaterState::from_flags(false, true), HeaterState::Inactive);
        assert_eq!(HeaterState::from_flags(true, false).as_num(), 1);
        assert_eq!(HeaterState::from_flags(true, true).as_num(), 2);
    }

    #[test]
    fn range_requires_one_degree_gap() {
        assert!(TargetRange::new(10.0, 11.0).is_ok());
        assert!(TargetRange::new(10.0, 10.9).is_err());
    }

    #[test]
    fn range_clamps() {
        let range = TargetRange::default();
        assert!((range.clamp(5.0) - 10.0).abs() < f64::EPSILON);
        assert!((range.clamp(22.5) - 22.5).abs() < f64::EPSILON);
    }
}
