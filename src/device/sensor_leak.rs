// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contact sensor wired as a water leak detector.
//!
//! The probe closes the contact while dry, so `switch: on` means no leak.

use std::sync::Arc;

use serde_json::json;

use super::BatteryReporter;
use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::OptionsSummary;
use crate::error::Result;
use crate::event::HistoryEntry;
use crate::manager::Platform;
use crate::normalize::{BatteryScale, epoch_secs};
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::CommandPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Leak,
    Battery,
}

/// Adapter for a leak sensor.
#[derive(Debug)]
pub struct SensorLeakAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    service: ServiceId,
    battery: BatteryReporter,
}

impl<T: Transport> SensorLeakAdapter<T> {
    /// Sets up the leak and battery services.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        accessory.remove_service(&ServiceId::new(ServiceKind::ContactSensor));
        let service = ServiceId::new(ServiceKind::LeakSensor);
        accessory.ensure_service(&service);
        accessory.set_default(&service, Characteristic::LeakDetected, 0_i64);
        accessory.set_default(&service, Characteristic::LastActivation, 0_i64);
        pipeline.seed(Channel::Leak, &service, Characteristic::LeakDetected);
        let battery = BatteryReporter::new(
            &pipeline,
            Channel::Battery,
            BatteryScale::Voltage2To3,
            options.low_batt_threshold,
        );

        OptionsSummary::new(accessory.name(), options.log)
            .with("lowBattThreshold", options.low_batt_threshold)
            .with("showAs", "sensor_leak")
            .emit();

        Arc::new(Self {
            pipeline,
            service,
            battery,
        })
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Reads a leak or battery characteristic.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while offline.
    pub fn get(&self, characteristic: Characteristic) -> Result<CharValue> {
        let service = match characteristic {
            Characteristic::BatteryLevel | Characteristic::StatusLowBattery => {
                self.battery.service()
            }
            _ => &self.service,
        };
        self.pipeline.read(service, characteristic)
    }

    /// Applies a push from the sensor.
    pub fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());
        self.battery
            .apply(&self.pipeline, Channel::Battery, params.battery.as_ref(), logs);

        let Some(switch) = params.switch else {
            return;
        };
        let leak = !switch.is_on();
        if !self.pipeline.commit(Channel::Leak, i64::from(leak)) {
            return;
        }
        self.pipeline
            .update(&self.service, Characteristic::LeakDetected, i64::from(leak));
        if leak {
            self.pipeline
                .update(&self.service, Characteristic::LastActivation, epoch_secs());
        }
        self.accessory().record_history(HistoryEntry::Status(leak));
        if logs {
            tracing::info!(
                accessory = %self.pipeline.name(),
                state = if leak { "leak detected" } else { "no leak" },
                "current state"
            );
        }
    }

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the leak state and battery.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let leak = accessory
            .value(&self.service, Characteristic::LeakDetected)
            .is_some_and(|v| v.as_i64() == 1);
        StateSnapshot::new()
            .with_service(ServiceKind::LeakSensor.as_str(), json!({"leak": leak}))
            .with_service(
                ServiceKind::Battery.as_str(),
                json!({"level": self.battery.level(accessory)}),
            )
    }

    /// Nothing runs in the background for sensors.
    pub fn shutdown(&self) {}
}
