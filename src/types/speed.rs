// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Three-step fan speed.
//!
//! The controller exposes rotation speed as a percentage slider, while the
//! hardware drives two "speed tap" relays. [`FanSpeed`] quantizes between the
//! two representations.

use std::fmt;

use super::SwitchState;

/// A quantized fan speed: off, low (33), medium (66) or high (99).
///
/// # Examples
///
/// ```
/// use accessory_sync::types::FanSpeed;
///
/// assert_eq!(FanSpeed::quantize(10.0), FanSpeed::LOW);
/// assert_eq!(FanSpeed::quantize(50.0), FanSpeed::MEDIUM);
/// assert_eq!(FanSpeed::quantize(67.0), FanSpeed::HIGH);
/// assert_eq!(FanSpeed::quantize(0.0), FanSpeed::OFF);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FanSpeed(u8);

impl FanSpeed {
    /// Speed 0: the slider was dragged to the bottom.
    pub const OFF: Self = Self(0);

    /// Low speed, both taps open.
    pub const LOW: Self = Self(33);

    /// Medium speed, tap 2 closed.
    pub const MEDIUM: Self = Self(66);

    /// High speed, tap 3 closed.
    pub const HIGH: Self = Self(99);

    /// Slider step advertised to the controller.
    pub const STEP: u8 = 33;

    /// Snaps a slider percentage to the nearest supported step.
    #[must_use]
    pub fn quantize(percent: f64) -> Self {
        if percent <= 0.0 {
            Self::OFF
        } else if percent <= 33.0 {
            Self::LOW
        } else if percent <= 66.0 {
            Self::MEDIUM
        } else {
            Self::HIGH
        }
    }

    /// Decodes the two speed-tap relays (outlets 2 and 3).
    ///
    /// Anything other than exactly one closed tap reads as low.
    #[must_use]
    pub fn from_taps(tap2: SwitchState, tap3: SwitchState) -> Self {
        match (tap2, tap3) {
            (SwitchState::On, SwitchState::Off) => Self::MEDIUM,
            (SwitchState::Off, SwitchState::On) => Self::HIGH,
            _ => Self::LOW,
        }
    }

    /// Decodes the 1-3 speed index used by LAN fan controllers.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::LOW),
            2 => Some(Self::MEDIUM),
            3 => Some(Self::HIGH),
            _ => None,
        }
    }

    /// Returns the tap relay states `(outlet 2, outlet 3)` for this speed.
    #[must_use]
    pub fn taps(self) -> (SwitchState, SwitchState) {
        (
            SwitchState::from(self == Self::MEDIUM),
            SwitchState::from(self == Self::HIGH),
        )
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns a human readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self.0 {
            0 => "off",
            1..=33 => "low",
            34..=66 => "medium",
            _ => "high",
        }
    }
}

impl Default for FanSpeed {
    fn default() -> Self {
        Self::LOW
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_boundaries() {
        assert_eq!(FanSpeed::quantize(0.0), FanSpeed::OFF);
        assert_eq!(FanSpeed::quantize(1.0), FanSpeed::LOW);
        assert_eq!(FanSpeed::quantize(33.0), FanSpeed::LOW);
        assert_eq!(FanSpeed::quantize(34.0), FanSpeed::MEDIUM);
        assert_eq!(FanSpeed::quantize(66.0), FanSpeed::MEDIUM);
        assert_eq!(FanSpeed::quantize(100.0), FanSpeed::HIGH);
    }

    #[test]
    fn taps_decode() {
        use SwitchState::{Off, On};
        assert_eq!(FanSpeed::from_taps(Off, Off), FanSpeed::LOW);
        assert_eq!(FanSpeed::from_taps(On, Off), FanSpeed::MEDIUM);
        assert_eq!(FanSpeed::from_taps(Off, On), FanSpeed::HIGH);
        assert_eq!(FanSpeed::from_taps(On, On), FanSpeed::LOW);
    }

    #[test]
    fn taps_encode() {
        assert_eq!(FanSpeed::HIGH.taps(), (SwitchState::Off, SwitchState::On));
        assert_eq!(FanSpeed::LOW.taps(), (SwitchState::Off, SwitchState::Off));
    }

    #[test]
    fn labels() {
        assert_eq!(FanSpeed::OFF.label(), "off");
        assert_eq!(FanSpeed::MEDIUM.to_string(), "medium");
        assert_eq!(FanSpeed::from_index(4), None);
    }
}
