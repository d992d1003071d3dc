// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Services, characteristics and their values.

use std::fmt;

/// Kind of service exposed on an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    /// Fan with on/off and rotation speed.
    Fan,
    /// Light bulb.
    Lightbulb,
    /// Generic switch.
    Switch,
    /// Power outlet.
    Outlet,
    /// Temperature sensor.
    TemperatureSensor,
    /// Humidity sensor.
    HumiditySensor,
    /// Heater/cooler.
    HeaterCooler,
    /// Lock mechanism.
    LockMechanism,
    /// Irrigation valve.
    Valve,
    /// Contact sensor.
    ContactSensor,
    /// Leak sensor.
    LeakSensor,
    /// Motion sensor.
    MotionSensor,
    /// Battery.
    Battery,
    /// Stateless programmable switch.
    StatelessProgrammableSwitch,
}

impl ServiceKind {
    /// Returns the snapshot key for this service.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Lightbulb => "light",
            Self::Switch => "switch",
            Self::Outlet => "outlet",
            Self::TemperatureSensor => "temperature",
            Self::HumiditySensor => "humidity",
            Self::HeaterCooler => "heater",
            Self::LockMechanism => "lock",
            Self::Valve => "valve",
            Self::ContactSensor => "contact",
            Self::LeakSensor => "leak",
            Self::MotionSensor => "motion",
            Self::Battery => "battery",
            Self::StatelessProgrammableSwitch => "button",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one service instance on an accessory.
///
/// Accessories with several services of the same kind (the four valves of an
/// irrigation controller, the buttons of an RF remote) tell them apart by
/// subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId {
    kind: ServiceKind,
    subtype: Option<String>,
}

impl ServiceId {
    /// Creates the primary service of a kind.
    #[must_use]
    pub const fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            subtype: None,
        }
    }

    /// Creates a service distinguished by subtype.
    #[must_use]
    pub fn with_subtype(kind: ServiceKind, subtype: impl Into<String>) -> Self {
        Self {
            kind,
            subtype: Some(subtype.into()),
        }
    }

    /// Returns the service kind.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Returns the subtype, if any.
    #[must_use]
    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            Some(sub) => write!(f, "{}/{sub}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A characteristic on a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Characteristic {
    /// Power state.
    On,
    /// Fan rotation speed in percent.
    RotationSpeed,
    /// Active flag (heaters, valves).
    Active,
    /// Current heater state (0 inactive, 1 idle, 2 heating).
    CurrentHeaterCoolerState,
    /// Target heater mode.
    TargetHeaterCoolerState,
    /// Temperature in degrees Celsius.
    CurrentTemperature,
    /// Heating target temperature.
    HeatingThresholdTemperature,
    /// Relative humidity in percent.
    CurrentRelativeHumidity,
    /// Lock current state.
    LockCurrentState,
    /// Lock target state.
    LockTargetState,
    /// Valve water flowing.
    InUse,
    /// Valve type (1 = irrigation).
    ValveType,
    /// Configured run duration in seconds.
    SetDuration,
    /// Remaining run duration in seconds.
    RemainingDuration,
    /// Contact state (0 closed, 1 open).
    ContactSensorState,
    /// Leak detected flag.
    LeakDetected,
    /// Motion detected flag.
    MotionDetected,
    /// Battery level in percent.
    BatteryLevel,
    /// Low battery flag.
    StatusLowBattery,
    /// Button press event (0 single, 1 double, 2 long).
    ProgrammableSwitchEvent,
    /// Outlet is drawing power.
    OutletInUse,
    /// Power consumption in watts.
    CurrentConsumption,
    /// Voltage in volts.
    Voltage,
    /// Current in amperes.
    ElectricCurrent,
    /// Number of times a contact sensor opened.
    TimesOpened,
    /// Epoch seconds of the last activation.
    LastActivation,
    /// Resets [`Characteristic::TimesOpened`].
    ResetTotal,
}

/// A characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum CharValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
}

impl CharValue {
    /// Returns the value as a boolean; numbers are true when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
            Self::Float(f) => f != 0.0,
        }
    }

    /// Returns the value as an integer, rounding floats.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Bool(b) => i64::from(b),
            Self::Int(i) => i,
            Self::Float(f) => f.round() as i64,
        }
    }

    /// Returns the value as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl From<bool> for CharValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CharValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CharValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for CharValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_value_coercions() {
        assert!(CharValue::Int(1).as_bool());
        assert!(!CharValue::Float(0.0).as_bool());
        assert_eq!(CharValue::Float(32.6).as_i64(), 33);
        assert!((CharValue::Bool(true).as_f64() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn service_id_display() {
        assert_eq!(ServiceId::new(ServiceKind::Fan).to_string(), "fan");
        assert_eq!(
            ServiceId::with_subtype(ServiceKind::Valve, "B").to_string(),
            "valve/B"
        );
    }

    #[test]
    fn char_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&CharValue::Int(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&CharValue::Bool(true)).unwrap(), "true");
    }
}
