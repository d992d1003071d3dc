// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery-powered occupancy sensors.

use std::sync::Arc;

use serde_json::json;

use super::BatteryReporter;
use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::OptionsSummary;
use crate::error::Result;
use crate::event::HistoryEntry;
use crate::manager::Platform;
use crate::normalize::{BatteryScale, epoch_secs, is_fresh_now};
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::CommandPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Motion,
    Trigger,
    Detected,
    Battery,
}

/// Adapter for a motion sensor.
#[derive(Debug)]
pub struct SensorMotionAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    service: ServiceId,
    battery: BatteryReporter,
    freshness_window: u64,
}

impl<T: Transport> SensorMotionAdapter<T> {
    /// Sets up the motion and battery services.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        let service = ServiceId::new(ServiceKind::MotionSensor);
        accessory.ensure_service(&service);
        accessory.set_default(&service, Characteristic::MotionDetected, false);
        accessory.set_default(&service, Characteristic::LastActivation, 0_i64);
        pipeline.seed(Channel::Detected, &service, Characteristic::MotionDetected);
        let battery = BatteryReporter::new(
            &pipeline,
            Channel::Battery,
            BatteryScale::Percent { times_ten: false },
            options.low_batt_threshold,
        );

        OptionsSummary::new(accessory.name(), options.log)
            .with("lowBattThreshold", options.low_batt_threshold)
            .with("sensorTimeDifference", options.sensor_time_difference)
            .emit();

        Arc::new(Self {
            pipeline,
            service,
            battery,
            freshness_window: options.sensor_time_difference,
        })
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Reads a motion or battery characteristic.
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
    ///
    /// Motion is reported only for a fresh `motion: 1` sent by the device
    /// itself; replays and stale events clear it instead.
    pub fn external_update(&self, params: &DeviceParams) {
        let device_originated = params.is_device_originated();
        let logs = self.pipeline.log().logs_push(device_originated);
        self.battery
            .apply(&self.pipeline, Channel::Battery, params.battery.as_ref(), logs);

        let (Some(motion), Some(trig)) = (
            params.motion,
            params.trig_time.as_ref().and_then(|t| t.as_i64()),
        ) else {
            return;
        };
        let motion_changed = self.pipeline.commit(Channel::Motion, motion);
        let trig_changed = self.pipeline.commit(Channel::Trigger, trig);
        if !motion_changed && !trig_changed {
            return;
        }

        let detected =
            device_originated && motion == 1 && is_fresh_now(trig, self.freshness_window);
        if !self.pipeline.commit(Channel::Detected, detected) {
            return;
        }
        self.pipeline
            .update(&self.service, Characteristic::MotionDetected, detected);
        if detected {
            self.pipeline
                .update(&self.service, Characteristic::LastActivation, epoch_secs());
        }
        self.accessory().record_history(HistoryEntry::Status(detected));
        if logs {
            tracing::info!(
                accessory = %self.pipeline.name(),
                state = if detected { "motion detected" } else { "clear" },
                "current state"
            );
        }
    }

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the motion state and battery.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let detected = accessory
            .value(&self.service, Characteristic::MotionDetected)
            .is_some_and(|v| v.as_bool());
        StateSnapshot::new()
            .with_service(ServiceKind::MotionSensor.as_str(), json!({"motion": detected}))
            .with_service(
                ServiceKind::Battery.as_str(),
                json!({"level": self.battery.level(accessory)}),
            )
    }

    /// Nothing runs in the background for sensors.
    pub fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::AccessoryContext;
    use crate::config::PlatformConfig;
    use crate::protocol::RecordingTransport;

    fn setup() -> Arc<SensorMotionAdapter<RecordingTransport>> {
        let platform = Platform::new(Arc::new(RecordingTransport::new()), PlatformConfig::new());
        let accessory = Arc::new(Accessory::new("Hall", AccessoryContext::new("1000pir", 1770)));
        SensorMotionAdapter::new(&platform, accessory)
    }

    fn push(motion: i64, trig_ms: i64) -> DeviceParams {
        DeviceParams::from_json(json!({
            "motion": motion,
            "trigTime": trig_ms.to_string(),
            "updateSource": "WS",
        }))
        .unwrap()
    }

    fn detected(adapter: &SensorMotionAdapter<RecordingTransport>) -> bool {
        adapter.get(Characteristic::MotionDetected).unwrap().as_bool()
    }

    #[test]
    fn fresh_motion_is_detected() {
        let adapter = setup();
        adapter.external_update(&push(1, epoch_secs() * 1000));
        assert!(detected(&adapter));
        adapter.external_update(&push(0, epoch_secs() * 1000 + 1));
        assert!(!detected(&adapter));
    }

    #[test]
    fn stale_motion_is_ignored() {
        let adapter = setup();
        adapter.external_update(&push(1, (epoch_secs() - 300) * 1000));
        assert!(!detected(&adapter));
    }

    #[test]
    fn replayed_state_without_source_is_not_motion() {
        let adapter = setup();
        let params = DeviceParams::from_json(json!({
            "motion": 1,
            "trigTime": epoch_secs() * 1000,
        }))
        .unwrap();
        adapter.external_update(&params);
        assert!(!detected(&adapter));
    }

    #[test]
    fn percent_battery_is_clamped() {
        let adapter = setup();
        adapter.external_update(&DeviceParams::from_json(json!({"battery": 130})).unwrap());
        assert_eq!(adapter.get(Characteristic::BatteryLevel).unwrap(), CharValue::Int(100));
    }
}
