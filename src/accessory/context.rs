// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted per-accessory context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The kind of device a plain relay is simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimulationKind {
    /// Heater driven by a temperature sensor.
    Heater,
    /// Electric door lock.
    Lock,
    /// Garage door opener.
    Garage,
    /// Four-zone irrigation controller.
    ValveFour,
}

/// Fields the host persists with each accessory.
///
/// Adapters read the hardware identity from here and write back only the
/// fields they own (`cache_type`, `cache_target`, `contact_detected`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryContext {
    /// Protocol device id.
    pub device_id: String,
    /// Hardware model id.
    pub uiid: u32,
    /// Reported sensor probe type (for example `DS18B20`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    /// Simulation the accessory was last set up as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_type: Option<SimulationKind>,
    /// Persisted heater target temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_target: Option<f64>,
    /// Whether a linked contact sensor last reported closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_detected: Option<bool>,
    /// RF remote buttons, keyed by RF channel.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buttons: BTreeMap<u8, String>,
}

impl AccessoryContext {
    /// Creates a context for a device.
    #[must_use]
    pub fn new(device_id: impl Into<String>, uiid: u32) -> Self {
        Self {
            device_id: device_id.into(),
            uiid,
            ..Self::default()
        }
    }

    /// Sets the sensor probe type.
    #[must_use]
    pub fn with_sensor_type(mut self, sensor_type: impl Into<String>) -> Self {
        self.sensor_type = Some(sensor_type.into());
        self
    }

    /// Adds an RF remote button.
    #[must_use]
    pub fn with_button(mut self, channel: u8, name: impl Into<String>) -> Self {
        self.buttons.insert(channel, name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_camel_case_keys() {
        let mut ctx = AccessoryContext::new("1000abcd", 15).with_sensor_type("DS18B20");
        ctx.cache_type = Some(SimulationKind::Heater);
        ctx.cache_target = Some(21.0);

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["deviceId"], "1000abcd");
        assert_eq!(json["cacheType"], "heater");
        assert_eq!(json["sensorType"], "DS18B20");

        let back: AccessoryContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn missing_optional_fields_default() {
        let ctx: AccessoryContext =
            serde_json::from_str(r#"{"deviceId":"1000abcd","uiid":1}"#).unwrap();
        assert_eq!(ctx.cache_target, None);
        assert!(ctx.buttons.is_empty());
    }
}
