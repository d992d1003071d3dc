// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater simulated on a thermostat relay.
//!
//! The relay is closed while the heater is active and the measured
//! temperature is below the target. Every new reading re-evaluates that
//! decision; the relay is only switched when the decision changes.

use std::sync::Arc;

use serde_json::json;

use super::reports_humidity;
use crate::accessory::{
    Accessory, CharValue, Characteristic, ServiceId, ServiceKind, SimulationKind,
};
use crate::config::{ConnectionMode, Migration, OptionsSummary, ensure_simulation};
use crate::error::Result;
use crate::event::HistoryEntry;
use crate::manager::Platform;
use crate::normalize::{LinearTransform, humidity_percent};
use crate::protocol::{DeviceParams, Transport, UiActive};
use crate::state::StateSnapshot;
use crate::sync::{Binding, CommandPipeline, Poller};
use crate::types::{HeaterState, SwitchState, TargetRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Active,
    Heat,
    Target,
    Temperature,
    Humidity,
}

/// Adapter for a simulated heater.
#[derive(Debug)]
pub struct HeaterAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    poller: Poller,
    heater: ServiceId,
    humidity: Option<ServiceId>,
    range: TargetRange,
    temperature_transform: LinearTransform,
    humidity_transform: LinearTransform,
}

impl<T: Transport> HeaterAdapter<T> {
    /// Sets up the heater service, repairing persisted context first.
    ///
    /// Must be called from within a tokio runtime unless the platform is in
    /// LAN mode.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);
        let heater = ServiceId::new(ServiceKind::HeaterCooler);

        let migration = accessory.update_context(|ctx| ensure_simulation(ctx, SimulationKind::Heater));
        if let Migration::Reset { from } = migration {
            accessory.remove_service(&heater);
            if options.log.debug {
                tracing::debug!(accessory = %accessory.name(), ?from, "reset simulation context");
            }
        }
        accessory.remove_service(&ServiceId::new(ServiceKind::Switch));
        accessory.remove_service(&ServiceId::new(ServiceKind::TemperatureSensor));

        accessory.ensure_service(&heater);
        accessory.set_default(&heater, Characteristic::Active, 0_i64);
        accessory.set_default(&heater, Characteristic::CurrentHeaterCoolerState, 0_i64);
        accessory.set_default(&heater, Characteristic::TargetHeaterCoolerState, 0_i64);
        let target = options
            .target_range
            .clamp(accessory.context().cache_target.unwrap_or_default());
        accessory.set_value(&heater, Characteristic::HeatingThresholdTemperature, target);

        pipeline.seed(Channel::Active, &heater, Characteristic::Active);
        pipeline.store(Channel::Target, target);
        pipeline.seed(Channel::Temperature, &heater, Characteristic::CurrentTemperature);
        let heating = accessory
            .value(&heater, Characteristic::CurrentHeaterCoolerState)
            .is_some_and(|v| v.as_i64() == HeaterState::Heating.as_num());
        pipeline.store(Channel::Heat, heating);

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
            .with("offset", options.temperature)
            .with("humidityOffset", options.humidity)
            .with("minTarget", options.target_range.min())
            .with("maxTarget", options.target_range.max())
            .with("showAs", "heater")
            .emit();

        let adapter = Arc::new(Self {
            pipeline,
            poller: Poller::new(),
            heater,
            humidity,
            range: options.target_range,
            temperature_transform: options.temperature,
            humidity_transform: options.humidity,
        });
        if options.mode != ConnectionMode::Lan {
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

    fn is_active(&self) -> bool {
        self.pipeline
            .cached(&Channel::Active)
            .is_some_and(|v| v.as_bool())
    }

    fn is_heating(&self) -> bool {
        self.pipeline
            .cached(&Channel::Heat)
            .is_some_and(|v| v.as_bool())
    }

    fn target(&self) -> f64 {
        self.pipeline
            .cached(&Channel::Target)
            .map_or(self.range.min(), |v| v.as_f64())
    }

    /// Returns `true` if the relay should be closed at `target`.
    fn wants_heat(&self, target: f64) -> bool {
        self.pipeline
            .cached(&Channel::Temperature)
            .is_some_and(|t| t.as_f64() < target)
    }

    fn report(&self, active: bool, heating: bool) {
        let state = HeaterState::from_flags(active, heating);
        self.pipeline.update(
            &self.heater,
            Characteristic::CurrentHeaterCoolerState,
            state.as_num(),
        );
    }

    fn commit_heat(&self, heating: bool) {
        if self.pipeline.commit(Channel::Heat, heating) && self.pipeline.log().enabled {
            tracing::info!(
                accessory = %self.pipeline.name(),
                heating = %SwitchState::from(heating),
                "current heating"
            );
        }
    }

    // ========== Controller writes ==========

    /// Switches the heater on or off.
    ///
    /// Turning on closes the relay only if the room is below target;
    /// turning off opens it only if it was closed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the relay command failed; `Active`
    /// reverts after two seconds.
    pub async fn set_active(&self, active: bool) -> Result<()> {
        self.accessory()
            .set_value(&self.heater, Characteristic::Active, i64::from(active));

        let heat = active && self.wants_heat(self.target());
        if (!active && self.is_heating()) || (active && heat) {
            self.pipeline
                .dispatch_or_rollback(
                    &DeviceParams::with_main_switch(SwitchState::from(heat)),
                    &[Binding::new(Channel::Active, self.heater.clone(), Characteristic::Active)],
                )
                .await?;
        }

        if self.pipeline.commit(Channel::Active, i64::from(active)) && self.pipeline.log().enabled {
            tracing::info!(
                accessory = %self.pipeline.name(),
                state = %SwitchState::from(active),
                "current state"
            );
        }
        self.commit_heat(heat);
        self.report(active, heat);
        Ok(())
    }

    /// Changes the target temperature, clamped to the configured range.
    ///
    /// While active, the heat decision is re-evaluated against the new
    /// target. The target is persisted once the relay has followed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the relay command failed; the target
    /// reverts after two seconds.
    pub async fn set_target(&self, celsius: f64) -> Result<()> {
        let target = self.range.clamp(celsius);
        self.accessory().set_value(
            &self.heater,
            Characteristic::HeatingThresholdTemperature,
            target,
        );
        if self.pipeline.is_cached(&Channel::Target, target) {
            return Ok(());
        }

        let active = self.is_active();
        let heat = self.wants_heat(target);
        if active && heat != self.is_heating() {
            self.pipeline
                .dispatch_or_rollback(
                    &DeviceParams::with_main_switch(SwitchState::from(heat)),
                    &[Binding::new(
                        Channel::Target,
                        self.heater.clone(),
                        Characteristic::HeatingThresholdTemperature,
                    )],
                )
                .await?;
            self.commit_heat(heat);
            self.report(true, heat);
        }

        self.pipeline.commit(Channel::Target, target);
        self.accessory()
            .update_context(|ctx| ctx.cache_target = Some(target));
        if self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), target, "current target");
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

    // ========== Pushes ==========

    /// Applies a push from the device; a new temperature re-evaluates the
    /// heat decision.
    pub async fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());

        if let Some(raw) = params.current_temperature.as_ref().and_then(|v| v.as_f64()) {
            let celsius = self.temperature_transform.apply(raw);
            if self.pipeline.commit(Channel::Temperature, celsius) {
                self.pipeline
                    .update(&self.heater, Characteristic::CurrentTemperature, celsius);
                self.accessory()
                    .record_history(HistoryEntry::Temperature(celsius));
                if logs {
                    tracing::info!(accessory = %self.pipeline.name(), celsius, "current temperature");
                }
                self.reevaluate().await;
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

    async fn reevaluate(&self) {
        if !self.is_active() {
            return;
        }
        let heat = self.wants_heat(self.target());
        if heat == self.is_heating() {
            return;
        }
        let params = DeviceParams::with_main_switch(SwitchState::from(heat));
        if self.pipeline.dispatch(&params).await.is_ok() {
            self.commit_heat(heat);
            self.report(true, heat);
        }
    }

    // ========== Status ==========

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the heater.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let value = |c| accessory.value(&self.heater, c);
        let active = value(Characteristic::Active).is_some_and(|v| v.as_bool());
        let mut snapshot = StateSnapshot::new().with_service(
            ServiceKind::HeaterCooler.as_str(),
            json!({
                "state": SwitchState::from(active),
                "current": value(Characteristic::CurrentTemperature),
                "target": value(Characteristic::HeatingThresholdTemperature),
            }),
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

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::accessory::AccessoryContext;
    use crate::config::{DeviceConfig, PlatformConfig};
    use crate::protocol::RecordingTransport;

    fn setup(config: PlatformConfig) -> (Arc<RecordingTransport>, Arc<HeaterAdapter<RecordingTransport>>) {
        let transport = Arc::new(RecordingTransport::new());
        let platform = Platform::new(Arc::clone(&transport), config.with_mode(ConnectionMode::Lan));
        let accessory = Arc::new(Accessory::new("Heater", AccessoryContext::new("1000he", 15)));
        (transport, HeaterAdapter::new(&platform, accessory))
    }

    fn heater() -> ServiceId {
        ServiceId::new(ServiceKind::HeaterCooler)
    }

    fn state(adapter: &HeaterAdapter<RecordingTransport>) -> i64 {
        adapter
            .accessory()
            .value(&heater(), Characteristic::CurrentHeaterCoolerState)
            .unwrap()
            .as_i64()
    }

    fn temperature(celsius: f64) -> DeviceParams {
        DeviceParams::from_json(json!({"currentTemperature": celsius})).unwrap()
    }

    #[test]
    #[should_panic(expected = "no reactor running")]
    fn polling_heater_requires_runtime() {
        let platform = Platform::new(Arc::new(RecordingTransport::new()), PlatformConfig::new());
        let accessory = Arc::new(Accessory::new("Heater", AccessoryContext::new("1000he", 15)));
        let _ = HeaterAdapter::new(&platform, accessory);
    }

    #[test]
    fn new_heater_gets_default_target() {
        let (_, adapter) = setup(PlatformConfig::new());
        let ctx = adapter.accessory().context();
        assert_eq!(ctx.cache_type, Some(SimulationKind::Heater));
        assert_eq!(ctx.cache_target, Some(20.0));
        assert!(!adapter.accessory().has_service(&ServiceId::new(ServiceKind::Switch)));
    }

    #[tokio::test]
    async fn activation_without_reading_stays_idle() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.set_active(true).await.unwrap();
        assert_eq!(transport.count(), 0);
        assert_eq!(state(&adapter), HeaterState::Idle.as_num());

        adapter.set_active(false).await.unwrap();
        assert_eq!(transport.count(), 0);
        assert_eq!(state(&adapter), HeaterState::Inactive.as_num());
    }

    #[tokio::test]
    async fn activation_below_target_heats() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.external_update(&temperature(18.0)).await;
        adapter.set_active(true).await.unwrap();
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_main_switch(SwitchState::On)
        );
        assert_eq!(state(&adapter), HeaterState::Heating.as_num());

        adapter.set_active(false).await.unwrap();
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_main_switch(SwitchState::Off)
        );
    }

    #[tokio::test]
    async fn target_is_clamped_and_persisted() {
        let config = PlatformConfig::new()
            .with_device(DeviceConfig::new("1000he").with_target_range(15.0, 25.0));
        let (transport, adapter) = setup(config);
        adapter.set_target(40.0).await.unwrap();
        assert_eq!(adapter.accessory().context().cache_target, Some(25.0));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_target_change_reverts() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.external_update(&temperature(21.0)).await;
        adapter.set_active(true).await.unwrap();
        assert_eq!(state(&adapter), HeaterState::Idle.as_num());

        transport.set_failing(true);
        assert!(adapter.set_target(25.0).await.is_err());
        assert_eq!(adapter.accessory().context().cache_target, Some(20.0));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(
            adapter
                .accessory()
                .value(&heater(), Characteristic::HeatingThresholdTemperature),
            Some(CharValue::Float(20.0))
        );
    }

    #[tokio::test]
    async fn reevaluation_failure_is_swallowed() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.set_active(true).await.unwrap();
        transport.set_failing(true);
        adapter.external_update(&temperature(15.0)).await;
        assert_eq!(state(&adapter), HeaterState::Idle.as_num());

        transport.set_failing(false);
        adapter.external_update(&temperature(15.5)).await;
        assert_eq!(state(&adapter), HeaterState::Heating.as_num());
    }
}
