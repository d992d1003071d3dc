// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The channel/outlet parameter set exchanged with devices.
//!
//! The same structure is used for outbound commands and inbound pushes. Every
//! field is optional: a command sets only what it changes and a push carries
//! only what the device reported.
//!
//! # Examples
//!
//! ```
//! use accessory_sync::protocol::DeviceParams;
//! use accessory_sync::types::SwitchState;
//!
//! let push = DeviceParams::from_json_str(
//!     r#"{"switches":[{"switch":"on","outlet":0},{"switch":"off","outlet":1}]}"#,
//! ).unwrap();
//! assert_eq!(push.outlet_state(0), Some(SwitchState::On));
//! assert_eq!(push.outlet_state(1), Some(SwitchState::Off));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PushError;
use crate::types::SwitchState;

/// State of one outlet in a multi-channel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletSwitch {
    /// Relay state.
    pub switch: SwitchState,
    /// Outlet index, when the payload names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet: Option<u8>,
}

impl OutletSwitch {
    /// Creates an entry for a specific outlet.
    #[must_use]
    pub const fn new(outlet: u8, switch: SwitchState) -> Self {
        Self {
            switch,
            outlet: Some(outlet),
        }
    }
}

/// A reading that devices send either as a JSON number or as a string.
///
/// The string `"unavailable"` (or anything else that is not numeric) reads
/// as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A JSON number.
    Number(f64),
    /// A JSON string.
    Text(String),
}

impl RawValue {
    /// Returns the reading as a float, if it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|n| n.is_finite())
    }

    /// Returns the reading truncated to an integer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.trunc() as i64)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The `uiActive` polling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiActive {
    /// Report for this many seconds.
    Seconds(u64),
    /// Report one outlet for a number of seconds.
    Outlet {
        /// Outlet to report.
        outlet: u8,
        /// Reporting window in seconds.
        time: u64,
    },
}

/// Where a push came from.
///
/// Present only on device-originated pushes. Pushes synthesised by the host
/// (for example on reconnect) leave it unset and are not logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateSource {
    /// Local network.
    Lan,
    /// Cloud websocket.
    Ws,
    /// Any other tagged source.
    #[serde(other)]
    Other,
}

/// The flat parameter set understood by the device protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceParams {
    /// Single relay state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchState>,
    /// Per-outlet relay states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switches: Option<Vec<OutletSwitch>>,
    /// Master relay state for thermostat-style hardware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_switch: Option<SwitchState>,
    /// Thermostat control mode, `"normal"` for manual relay control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,

    /// Light relay of a LAN fan controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<SwitchState>,
    /// Fan relay of a LAN fan controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan: Option<SwitchState>,
    /// Speed index (1-3) of a LAN fan controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,

    /// Battery voltage or percentage, depending on hardware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<RawValue>,
    /// Temperature in degrees Celsius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<RawValue>,
    /// Relative humidity in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_humidity: Option<RawValue>,
    /// Motion flag (1 = motion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<i64>,
    /// Epoch milliseconds of the last sensor trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trig_time: Option<RawValue>,
    /// Button press kind (0 single, 1 double, 2 long).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<i64>,
    /// Door lock flag (1 = open).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<i64>,

    /// Active power in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<RawValue>,
    /// Voltage in volts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<RawValue>,
    /// Current in amperes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<RawValue>,
    /// Active power of channel 0, in hundredths of a watt.
    #[serde(rename = "actPow_00", skip_serializing_if = "Option::is_none")]
    pub act_pow_00: Option<RawValue>,
    /// Voltage of channel 0, in hundredths of a volt.
    #[serde(rename = "voltage_00", skip_serializing_if = "Option::is_none")]
    pub voltage_00: Option<RawValue>,
    /// Current of channel 0, in hundredths of an ampere.
    #[serde(rename = "current_00", skip_serializing_if = "Option::is_none")]
    pub current_00: Option<RawValue>,
    /// Usage history; `"get"` requests it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hundred_days_kwh: Option<String>,

    /// Reporting request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_active: Option<UiActive>,
    /// RF command (`"transmit"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// RF channel to transmit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rf_chl: Option<u8>,

    /// Set on device-originated pushes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_source: Option<UpdateSource>,
}

impl DeviceParams {
    /// Parses a pushed payload.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Json` if the payload does not match the expected
    /// shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, PushError> {
        serde_json::from_value(value).map_err(Into::into)
    }

    /// Parses a pushed payload from text.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Json` if the text is not a valid payload.
    pub fn from_json_str(text: &str) -> Result<Self, PushError> {
        serde_json::from_str(text).map_err(Into::into)
    }

    /// Creates a single-relay command.
    #[must_use]
    pub fn with_switch(state: SwitchState) -> Self {
        Self {
            switch: Some(state),
            ..Self::default()
        }
    }

    /// Creates a multi-outlet command.
    #[must_use]
    pub fn with_outlets(outlets: impl IntoIterator<Item = (u8, SwitchState)>) -> Self {
        Self {
            switches: Some(
                outlets
                    .into_iter()
                    .map(|(outlet, state)| OutletSwitch::new(outlet, state))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Creates a thermostat relay command in manual mode.
    #[must_use]
    pub fn with_main_switch(state: SwitchState) -> Self {
        Self {
            switch: Some(state),
            main_switch: Some(state),
            device_type: Some("normal".to_string()),
            ..Self::default()
        }
    }

    /// Creates a reporting request.
    #[must_use]
    pub fn with_ui_active(ui_active: UiActive) -> Self {
        Self {
            ui_active: Some(ui_active),
            ..Self::default()
        }
    }

    /// Creates an RF transmit command for a learned remote channel.
    #[must_use]
    pub fn rf_transmit(channel: u8) -> Self {
        Self {
            cmd: Some("transmit".to_string()),
            rf_chl: Some(channel),
            ..Self::default()
        }
    }

    /// Returns the state of an outlet.
    ///
    /// Entries carrying an explicit outlet index win; otherwise the entry at
    /// that position in the array is used.
    #[must_use]
    pub fn outlet_state(&self, outlet: u8) -> Option<SwitchState> {
        let switches = self.switches.as_ref()?;
        switches
            .iter()
            .find(|s| s.outlet == Some(outlet))
            .or_else(|| {
                switches
                    .get(usize::from(outlet))
                    .filter(|s| s.outlet.is_none())
            })
            .map(|s| s.switch)
    }

    /// Returns `true` if the push was device-originated.
    #[must_use]
    pub fn is_device_originated(&self) -> bool {
        self.update_source.is_some()
    }
}
