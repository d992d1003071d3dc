// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door and window contact sensors.
//!
//! A contact change is forwarded to every lock configured with this sensor
//! as its confirmation sensor.

use std::sync::Arc;

use serde_json::json;

use super::BatteryReporter;
use super::models::CONTACT_VOLTAGE_BATTERY;
use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::{OptionsSummary, PlatformConfig};
use crate::error::Result;
use crate::event::HistoryEntry;
use crate::manager::{LinkTable, Platform};
use crate::normalize::{BatteryScale, epoch_secs, is_fresh_now};
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::CommandPipeline;

/// `ContactSensorState` when the contact is broken.
const OPEN: i64 = 1;
const CLOSED: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Contact,
    Battery,
}

/// Adapter for a contact sensor.
#[derive(Debug)]
pub struct SensorContactAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    service: ServiceId,
    battery: BatteryReporter,
    config: Arc<PlatformConfig>,
    links: Arc<LinkTable>,
    device_id: String,
    freshness_window: u64,
}

impl<T: Transport> SensorContactAdapter<T> {
    /// Sets up the contact and battery services.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        accessory.remove_service(&ServiceId::new(ServiceKind::LeakSensor));
        let service = ServiceId::new(ServiceKind::ContactSensor);
        accessory.ensure_service(&service);
        accessory.set_default(&service, Characteristic::ContactSensorState, CLOSED);
        accessory.set_default(&service, Characteristic::TimesOpened, 0_i64);
        accessory.set_default(&service, Characteristic::LastActivation, 0_i64);
        pipeline.seed(Channel::Contact, &service, Characteristic::ContactSensorState);

        let scale = if CONTACT_VOLTAGE_BATTERY.contains(&accessory.uiid()) {
            BatteryScale::Voltage2To3
        } else {
            BatteryScale::Percent {
                times_ten: options.scale_battery,
            }
        };
        let battery =
            BatteryReporter::new(&pipeline, Channel::Battery, scale, options.low_batt_threshold);

        OptionsSummary::new(accessory.name(), options.log)
            .with("lowBattThreshold", options.low_batt_threshold)
            .with("scaleBattery", options.scale_battery)
            .emit();

        Arc::new(Self {
            pipeline,
            service,
            battery,
            config: Arc::clone(platform.config()),
            links: Arc::clone(platform.links()),
            device_id: accessory.device_id(),
            freshness_window: options.sensor_time_difference,
        })
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Handles a `ResetTotal` write by zeroing the open counter.
    pub fn reset_total(&self) {
        self.pipeline
            .update(&self.service, Characteristic::TimesOpened, 0_i64);
    }

    /// Reads a contact or battery characteristic.
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

    // ========== Pushes ==========

    /// Applies a push from the sensor.
    pub fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());
        self.battery
            .apply(&self.pipeline, Channel::Battery, params.battery.as_ref(), logs);

        let open = match (params.switch, params.lock) {
            (Some(switch), _) => switch.is_on(),
            (None, Some(lock)) => lock != 0,
            (None, None) => return,
        };
        if let Some(trig) = params.trig_time.as_ref().and_then(|t| t.as_i64())
            && !is_fresh_now(trig, self.freshness_window)
        {
            if self.pipeline.log().debug {
                tracing::debug!(accessory = %self.pipeline.name(), trig, "discarding stale contact event");
            }
            return;
        }

        let state = if open { OPEN } else { CLOSED };
        if !self.pipeline.commit(Channel::Contact, state) {
            return;
        }
        self.pipeline
            .update(&self.service, Characteristic::ContactSensorState, state);
        if open {
            self.pipeline
                .update(&self.service, Characteristic::LastActivation, epoch_secs());
            let opened = self
                .accessory()
                .value(&self.service, Characteristic::TimesOpened)
                .map_or(0, |v| v.as_i64());
            self.pipeline
                .update(&self.service, Characteristic::TimesOpened, opened + 1);
        }
        self.accessory().record_history(HistoryEntry::Status(open));
        if logs {
            tracing::info!(
                accessory = %self.pipeline.name(),
                state = if open { "open" } else { "closed" },
                "current state"
            );
        }

        self.notify_linked(open, params.is_device_originated());
    }

    fn notify_linked(&self, open: bool, log_change: bool) {
        for entry in self.config.linked_to(&self.device_id) {
            let Some(target) = self.links.get(&entry.device_id) else {
                continue;
            };
            target.contact_changed(open, log_change);
        }
    }

    // ========== Status ==========

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the contact and battery.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let read = |characteristic| {
            accessory
                .value(&self.service, characteristic)
                .map_or(0, |v| v.as_i64())
        };
        StateSnapshot::new()
            .with_service(
                ServiceKind::ContactSensor.as_str(),
                json!({
                    "state": if read(Characteristic::ContactSensorState) == OPEN { "open" } else { "closed" },
                    "timesOpened": read(Characteristic::TimesOpened),
                }),
            )
            .with_service(
                ServiceKind::Battery.as_str(),
                json!({"level": self.battery.level(accessory)}),
            )
    }

    /// Nothing runs in the background for sensors.
    pub fn shutdown(&self) {}
}
