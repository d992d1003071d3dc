// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay switch state as carried on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// The state of a relay channel.
///
/// Serialized as the lowercase strings `"on"` and `"off"`.
///
/// # Examples
///
/// ```
/// use accessory_sync::types::SwitchState;
///
/// assert_eq!(SwitchState::from(true), SwitchState::On);
/// assert_eq!(SwitchState::Off.as_str(), "off");
/// assert!(SwitchState::On.is_on());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    /// The relay is open.
    #[default]
    Off,
    /// The relay is closed.
    On,
}

impl SwitchState {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }

    /// Returns `true` for [`SwitchState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SwitchState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "0" | "false" => Ok(Self::Off),
            "on" | "1" | "true" => Ok(Self::On),
            _ => Err(ValueError::InvalidSwitchState(s.to_string())),
        }
    }
}

impl From<bool> for SwitchState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<SwitchState> for bool {
    fn from(value: SwitchState) -> Self {
        value.is_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("ON".parse::<SwitchState>().unwrap(), SwitchState::On);
        assert_eq!("off".parse::<SwitchState>().unwrap(), SwitchState::Off);
        assert!("maybe".parse::<SwitchState>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SwitchState::On).unwrap(), "\"on\"");
        let state: SwitchState = serde_json::from_str("\"off\"").unwrap();
        assert_eq!(state, SwitchState::Off);
    }

    #[test]
    fn bool_conversions() {
        assert!(bool::from(SwitchState::On));
        assert_eq!(SwitchState::from(false), SwitchState::Off);
    }
}
