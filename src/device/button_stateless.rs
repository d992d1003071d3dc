// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wireless buttons that report presses but hold no state.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use super::BatteryReporter;
use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::OptionsSummary;
use crate::error::Result;
use crate::manager::Platform;
use crate::normalize::{BatteryScale, is_fresh_now};
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::CommandPipeline;

/// A press reported by the button (`key` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonPress {
    /// `key: 0`
    Single,
    /// `key: 1`
    Double,
    /// `key: 2`
    Long,
}

impl ButtonPress {
    /// Parses the `key` field.
    #[must_use]
    pub const fn from_key(key: i64) -> Option<Self> {
        match key {
            0 => Some(Self::Single),
            1 => Some(Self::Double),
            2 => Some(Self::Long),
            _ => None,
        }
    }

    /// Returns the `ProgrammableSwitchEvent` value.
    #[must_use]
    pub const fn event(self) -> i64 {
        match self {
            Self::Single => 0,
            Self::Double => 1,
            Self::Long => 2,
        }
    }
}

impl fmt::Display for ButtonPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Single => "single press",
            Self::Double => "double press",
            Self::Long => "long press",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Trigger,
    Battery,
}

/// Adapter for a stateless button.
#[derive(Debug)]
pub struct ButtonStatelessAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    service: ServiceId,
    battery: BatteryReporter,
    single_only: bool,
    freshness_window: u64,
}

impl<T: Transport> ButtonStatelessAdapter<T> {
    /// Sets up the programmable switch and battery services.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        let service = ServiceId::new(ServiceKind::StatelessProgrammableSwitch);
        accessory.ensure_service(&service);
        let battery = BatteryReporter::new(
            &pipeline,
            Channel::Battery,
            BatteryScale::Percent { times_ten: false },
            options.low_batt_threshold,
        );

        OptionsSummary::new(accessory.name(), options.log)
            .with("hideLongDouble", options.hide_long_double)
            .with("lowBattThreshold", options.low_batt_threshold)
            .with("sensorTimeDifference", options.sensor_time_difference)
            .emit();

        Arc::new(Self {
            pipeline,
            service,
            battery,
            single_only: options.hide_long_double,
            freshness_window: options.sensor_time_difference,
        })
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Returns the presses the controller may see.
    #[must_use]
    pub fn valid_presses(&self) -> &'static [ButtonPress] {
        if self.single_only {
            &[ButtonPress::Single]
        } else {
            &[ButtonPress::Single, ButtonPress::Double, ButtonPress::Long]
        }
    }

    /// Reads a battery characteristic.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while offline.
    pub fn get(&self, characteristic: Characteristic) -> Result<CharValue> {
        self.pipeline.read(self.battery.service(), characteristic)
    }

    /// Applies a push from the button.
    ///
    /// A press is emitted once per trigger time, and only while fresh.
    pub fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());
        self.battery
            .apply(&self.pipeline, Channel::Battery, params.battery.as_ref(), logs);

        let (Some(press), Some(trig)) = (
            params.key.and_then(ButtonPress::from_key),
            params.trig_time.as_ref().and_then(|t| t.as_i64()),
        ) else {
            return;
        };
        if !self.valid_presses().contains(&press) || !is_fresh_now(trig, self.freshness_window) {
            return;
        }
        if !self.pipeline.commit(Channel::Trigger, trig) {
            return;
        }
        self.pipeline.update(
            &self.service,
            Characteristic::ProgrammableSwitchEvent,
            press.event(),
        );
        if logs {
            tracing::info!(accessory = %self.pipeline.name(), %press, "current state");
        }
    }

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the battery.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        StateSnapshot::new().with_service(
            ServiceKind::Battery.as_str(),
            json!({"level": self.battery.level(self.accessory())}),
        )
    }

    /// Nothing runs in the background for buttons.
    pub fn shutdown(&self) {}
}
