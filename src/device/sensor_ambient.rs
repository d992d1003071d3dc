// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat relays with an attached temperature (and humidity) probe.

use std::sync::Arc;

use serde_json::json;

use super::reports_humidity;
use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::{ConnectionMode, OptionsSummary};
use crate::error::Result;
use crate::event::HistoryEntry;
use crate::manager::Platform;
use crate::normalize::{LinearTransform, humidity_percent};
use crate::protocol::{DeviceParams, Transport, UiActive};
use crate::state::StateSnapshot;
use crate::sync::{Binding, CommandPipeline, Poller};
use crate::types::SwitchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Relay,
    Temperature,
    Humidity,
}

/// Adapter for a relay with an ambient probe.
#[derive(Debug)]
pub struct SensorAmbientAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    poller: Poller,
    relay: Option<ServiceId>,
    temperature: ServiceId,
    humidity: Option<ServiceId>,
    temperature_transform: LinearTransform,
    humidity_transform: LinearTransform,
}

impl<T: Transport> SensorAmbientAdapter<T> {
    /// Sets up the sensor services and starts polling unless in LAN mode or
    /// with the relay hidden.
    ///
    /// When polling, must be called from within a tokio runtime.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        accessory.remove_service(&ServiceId::new(ServiceKind::HeaterCooler));

        let switch = ServiceId::new(ServiceKind::Switch);
        let relay = if options.hide_switch {
            accessory.remove_service(&switch);
            None
        } else {
            accessory.ensure_service(&switch);
            accessory.set_default(&switch, Characteristic::On, false);
            pipeline.seed(Channel::Relay, &switch, Characteristic::On);
            Some(switch)
        };

        let temperature = ServiceId::new(ServiceKind::TemperatureSensor);
        accessory.ensure_service(&temperature);
        pipeline.seed(Channel::Temperature, &temperature, Characteristic::CurrentTemperature);

        let humidity_service = ServiceId::new(ServiceKind::HumiditySensor);
        let humidity = if reports_humidity(&accessory) {
            accessory.ensure_service(&humidity_service);
            pipeline.seed(
                Channel::Humidity,
                &humidity_service,
                Characteristic::CurrentRelativeHumidity,
            );
            Some(humidity_service)
        } else {
            accessory.remove_service(&humidity_service);
            None
        };

        OptionsSummary::new(accessory.name(), options.log)
            .with("hideSwitch", options.hide_switch)
            .with("offset", options.temperature)
            .with("humidityOffset", options.humidity)
            .with("showAs", "default")
            .emit();

        let adapter = Arc::new(Self {
            pipeline,
            poller: Poller::new(),
            relay,
            temperature,
            humidity,
            temperature_transform: options.temperature,
            humidity_transform: options.humidity,
        });
        if options.mode != ConnectionMode::Lan && !options.hide_switch {
            adapter.poller.start(
                adapter.pipeline.clone(),
                DeviceParams::with_ui_active(UiActive::Seconds(120)),
            );
        }
        adapter
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Switches the relay in manual mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the device did not accept the
    /// command. Does nothing when the relay is hidden.
    pub async fn set_on(&self, on: bool) -> Result<()> {
        let Some(relay) = &self.relay else {
            return Ok(());
        };
        self.accessory().set_value(relay, Characteristic::On, on);
        if self.pipeline.is_cached(&Channel::Relay, on) {
            return Ok(());
        }

        let state = SwitchState::from(on);
        self.pipeline
            .dispatch_or_rollback(
                &DeviceParams::with_main_switch(state),
                &[Binding::new(Channel::Relay, relay.clone(), Characteristic::On)],
            )
            .await?;

        self.pipeline.commit(Channel::Relay, on);
        if self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), %state, "current state");
        }
        Ok(())
    }

    /// Reads a characteristic.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while offline.
    pub fn get(&self, service: &ServiceId, characteristic: Characteristic) -> Result<CharValue> {
        self.pipeline.read(service, characteristic)
    }

    /// Applies a push from the device.
    pub fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());

        if let (Some(relay), Some(state)) = (&self.relay, params.switch)
            && self.pipeline.commit(Channel::Relay, state.is_on())
        {
            self.pipeline.update(relay, Characteristic::On, state.is_on());
            self.accessory()
                .record_history(HistoryEntry::Status(state.is_on()));
            if logs {
                tracing::info!(accessory = %self.pipeline.name(), %state, "current state");
            }
        }

        if let Some(raw) = params.current_temperature.as_ref().and_then(|v| v.as_f64()) {
            let celsius = self.temperature_transform.apply(raw);
            if self.pipeline.commit(Channel::Temperature, celsius) {
                self.pipeline
                    .update(&self.temperature, Characteristic::CurrentTemperature, celsius);
                self.accessory()
                    .record_history(HistoryEntry::Temperature(celsius));
                if logs {
                    tracing::info!(accessory = %self.pipeline.name(), celsius, "current temperature");
                }
            }
        }

        if let Some(service) = &self.humidity
            && let Some(raw) = params.current_humidity.as_ref().and_then(|v| v.as_i64())
        {
            let percent = humidity_percent(raw, self.humidity_transform);
            if self.pipeline.commit(Channel::Humidity, percent) {
                self.pipeline
                    .update(service, Characteristic::CurrentRelativeHumidity, percent);
                #[allow(clippy::cast_precision_loss)]
                let sample = percent as f64;
                self.accessory().record_history(HistoryEntry::Humidity(sample));
                if logs {
                    tracing::info!(accessory = %self.pipeline.name(), percent, "current humidity");
                }
            }
        }
    }

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the readings.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let mut snapshot = StateSnapshot::new().with_service(
            ServiceKind::TemperatureSensor.as_str(),
            json!({"current": accessory.value(&self.temperature, Characteristic::CurrentTemperature)}),
        );
        if let Some(service) = &self.humidity {
            snapshot.insert(
                ServiceKind::HumiditySensor.as_str(),
                json!({"current": accessory.value(service, Characteristic::CurrentRelativeHumidity)}),
            );
        }
        snapshot
    }

    /// Stops polling.
    pub fn shutdown(&self) {
        self.poller.stop();
    }
}
