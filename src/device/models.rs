// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware model (`uiid`) families.

use crate::protocol::DeviceParams;
use crate::types::SwitchState;

/// Single-relay hardware using the `switch` field.
pub const SWITCH_SINGLE: &[u32] = &[1, 6, 14, 24, 27, 112, 1009, 1256];

/// Single-relay hardware reporting power.
pub const SWITCH_SINGLE_POWER: &[u32] = &[5, 32, 182, 190];

/// Single-channel hardware that uses the multi-channel `switches` format.
pub const SWITCH_SCM: &[u32] = &[77, 78, 81, 107, 138, 160, 1010];

/// Multi-relay hardware.
pub const SWITCH_MULTI: &[u32] = &[
    2, 3, 4, 7, 8, 9, 29, 30, 31, 41, 82, 83, 84, 113, 114, 139, 140, 141, 161, 162,
];

/// Multi-relay hardware reporting per-channel power.
pub const SWITCH_MULTI_POWER: &[u32] = &[126, 165];

/// Door sensors reporting a 2.0-3.0 V battery.
pub const CONTACT_VOLTAGE_BATTERY: &[u32] = &[102];

/// Model reporting power only.
pub const POWER_ONLY: u32 = 5;

/// Model reporting power, voltage and current.
pub const POWER_VOLTAGE_CURRENT: u32 = 32;

/// How a relay is addressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayLayout {
    /// `{"switch": "on"}`
    Single,
    /// `{"switches": [{"switch": "on", "outlet": 0}]}`
    Outlets,
}

impl RelayLayout {
    /// Picks the layout for a hardware model.
    #[must_use]
    pub fn for_uiid(uiid: u32) -> Self {
        if SWITCH_SCM.contains(&uiid) || is_multi(uiid) {
            Self::Outlets
        } else {
            Self::Single
        }
    }
}

impl RelayLayout {
    /// Builds the command driving the relay (outlet 0 for [`Self::Outlets`]).
    #[must_use]
    pub fn command(self, state: SwitchState) -> DeviceParams {
        match self {
            Self::Single => DeviceParams::with_switch(state),
            Self::Outlets => DeviceParams::with_outlets([(0, state)]),
        }
    }

    /// Reads the relay state from a push.
    #[must_use]
    pub fn state_of(self, params: &DeviceParams) -> Option<SwitchState> {
        match self {
            Self::Single => params.switch,
            Self::Outlets => params.outlet_state(0),
        }
    }
}

/// Returns `true` for multi-relay hardware.
#[must_use]
pub fn is_multi(uiid: u32) -> bool {
    SWITCH_MULTI.contains(&uiid) || SWITCH_MULTI_POWER.contains(&uiid)
}

/// Returns `true` for hardware that reports power readings.
#[must_use]
pub fn reports_power(uiid: u32) -> bool {
    SWITCH_SINGLE_POWER.contains(&uiid) || SWITCH_MULTI_POWER.contains(&uiid)
}

/// Returns `true` for hardware with per-channel power reporting.
#[must_use]
pub fn is_multi_power(uiid: u32) -> bool {
    SWITCH_MULTI_POWER.contains(&uiid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts() {
        assert_eq!(RelayLayout::for_uiid(1), RelayLayout::Single);
        assert_eq!(RelayLayout::for_uiid(5), RelayLayout::Single);
        assert_eq!(RelayLayout::for_uiid(77), RelayLayout::Outlets);
        assert_eq!(RelayLayout::for_uiid(126), RelayLayout::Outlets);
    }

    #[test]
    fn outlet_layout_addresses_outlet_zero() {
        let params = RelayLayout::Outlets.command(SwitchState::On);
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({"switches": [{"switch": "on", "outlet": 0}]})
        );
        assert_eq!(RelayLayout::Outlets.state_of(&params), Some(SwitchState::On));
        assert_eq!(RelayLayout::Single.state_of(&params), None);
    }

    #[test]
    fn power_families() {
        assert!(reports_power(32));
        assert!(reports_power(126));
        assert!(!reports_power(1));
        assert!(is_multi_power(165));
        assert!(!is_multi_power(5));
    }
}
