// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ceiling fan with light (four-outlet fan controller).
//!
//! Outlet 0 drives the light, outlet 1 the fan motor, and outlets 2 and 3
//! the speed taps.

use std::sync::Arc;

use serde_json::json;

use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::OptionsSummary;
use crate::error::{PushError, Result};
use crate::manager::Platform;
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::{Binding, CommandPipeline, DebounceGate, ROLLBACK_DELAY};
use crate::types::{FanSpeed, SwitchState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Power,
    Speed,
    Light,
}

/// Adapter for a fan controller.
#[derive(Debug)]
pub struct FanAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    debounce: DebounceGate,
    fan: ServiceId,
    light: Option<ServiceId>,
}

impl<T: Transport> FanAdapter<T> {
    /// Sets up the fan service, and the light service unless hidden.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        let fan = ServiceId::new(ServiceKind::Fan);
        accessory.ensure_service(&fan);
        accessory.set_default(&fan, Characteristic::On, false);
        pipeline.seed(Channel::Power, &fan, Characteristic::On);
        let speed = accessory.set_default(
            &fan,
            Characteristic::RotationSpeed,
            i64::from(FanSpeed::OFF.value()),
        );
        pipeline.store(
            Channel::Speed,
            i64::from(FanSpeed::quantize(speed.as_f64()).value()),
        );

        let light_service = ServiceId::new(ServiceKind::Lightbulb);
        let light = if options.hide_light {
            accessory.remove_service(&light_service);
            None
        } else {
            accessory.ensure_service(&light_service);
            accessory.set_default(&light_service, Characteristic::On, false);
            pipeline.seed(Channel::Light, &light_service, Characteristic::On);
            Some(light_service)
        };

        OptionsSummary::new(accessory.name(), options.log)
            .with("hideLight", options.hide_light)
            .emit();

        Arc::new(Self {
            pipeline,
            debounce: DebounceGate::default(),
            fan,
            light,
        })
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    fn cached_speed(&self) -> FanSpeed {
        self.pipeline
            .cached(&Channel::Speed)
            .map_or(FanSpeed::LOW, |v| FanSpeed::quantize(v.as_f64()))
    }

    // ========== Controller writes ==========

    /// Turns the fan on or off. Turning on restores the cached speed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the device did not accept the
    /// command; the switch reverts after two seconds.
    pub async fn set_on(&self, on: bool) -> Result<()> {
        self.accessory().set_value(&self.fan, Characteristic::On, on);
        if self.pipeline.is_cached(&Channel::Power, on) {
            return Ok(());
        }

        let state = SwitchState::from(on);
        let mut outlets = vec![(1, state)];
        if on {
            let (tap2, tap3) = self.cached_speed().taps();
            outlets.extend([(2, tap2), (3, tap3)]);
        }
        self.pipeline
            .dispatch_or_rollback(
                &DeviceParams::with_outlets(outlets),
                &[Binding::new(Channel::Power, self.fan.clone(), Characteristic::On)],
            )
            .await?;

        self.pipeline.commit(Channel::Power, on);
        if self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), %state, "current state");
        }
        Ok(())
    }

    /// Sets the rotation speed.
    ///
    /// Rapid calls are debounced; only the last one in a burst is sent.
    /// Speed 0 switches the fan off and the slider returns to the previous
    /// speed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the device did not accept the
    /// command.
    pub async fn set_rotation_speed(&self, percent: f64) -> Result<()> {
        self.accessory()
            .set_value(&self.fan, Characteristic::RotationSpeed, percent);
        if !self.debounce.settle().await {
            return Ok(());
        }

        let speed = FanSpeed::quantize(percent);
        let speed_value = i64::from(speed.value());
        let on = speed != FanSpeed::OFF;
        if self.pipeline.is_cached(&Channel::Speed, speed_value)
            && self.pipeline.is_cached(&Channel::Power, on)
        {
            return Ok(());
        }

        let (tap2, tap3) = speed.taps();
        let binding = Binding::new(
            Channel::Speed,
            self.fan.clone(),
            Characteristic::RotationSpeed,
        );
        self.pipeline
            .dispatch_or_rollback(
                &DeviceParams::with_outlets([(1, SwitchState::from(on)), (2, tap2), (3, tap3)]),
                std::slice::from_ref(&binding),
            )
            .await?;

        if self.pipeline.commit(Channel::Power, on) {
            self.pipeline.update(&self.fan, Characteristic::On, on);
            if self.pipeline.log().enabled {
                tracing::info!(
                    accessory = %self.pipeline.name(),
                    state = %SwitchState::from(on),
                    "current state"
                );
            }
        }

        if !on {
            self.pipeline.restore_after(ROLLBACK_DELAY, binding);
            return Ok(());
        }

        self.pipeline.commit(Channel::Speed, speed_value);
        if self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), %speed, "current speed");
        }
        Ok(())
    }

    /// Turns the light on or off.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the device did not accept the
    /// command. Does nothing when the light is hidden.
    pub async fn set_light(&self, on: bool) -> Result<()> {
        let Some(light) = &self.light else {
            return Ok(());
        };
        self.accessory().set_value(light, Characteristic::On, on);
        if self.pipeline.is_cached(&Channel::Light, on) {
            return Ok(());
        }

        let state = SwitchState::from(on);
        self.pipeline
            .dispatch_or_rollback(
                &DeviceParams::with_outlets([(0, state)]),
                &[Binding::new(Channel::Light, light.clone(), Characteristic::On)],
            )
            .await?;

        self.pipeline.commit(Channel::Light, on);
        if self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), light = %state, "current light");
        }
        Ok(())
    }

    // ========== Controller reads ==========

    /// Reads a characteristic.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while offline.
    pub fn get(&self, service: &ServiceId, characteristic: Characteristic) -> Result<CharValue> {
        self.pipeline.read(service, characteristic)
    }

    // ========== Pushes ==========

    /// Applies a push from the device.
    pub fn external_update(&self, params: &DeviceParams) {
        if let Err(err) = self.apply_push(params) {
            tracing::warn!(accessory = %self.pipeline.name(), error = %err, "ignoring push");
        }
    }

    fn apply_push(&self, params: &DeviceParams) -> std::result::Result<(), PushError> {
        let lan;
        let params = match (params.light, params.fan, params.speed) {
            (Some(light), Some(fan), Some(index)) => {
                let Some(speed) = FanSpeed::from_index(index) else {
                    return Ok(());
                };
                let (tap2, tap3) = speed.taps();
                lan = DeviceParams {
                    update_source: params.update_source,
                    ..DeviceParams::with_outlets([(0, light), (1, fan), (2, tap2), (3, tap3)])
                };
                &lan
            }
            _ => params,
        };
        if params.switches.is_none() {
            return Ok(());
        }

        let outlet = |n| params.outlet_state(n).ok_or(PushError::MissingOutlet(n));
        let power = outlet(1)?;
        let speed = FanSpeed::from_taps(outlet(2)?, outlet(3)?);
        let light = outlet(0)?;
        let logs = self.pipeline.log().logs_push(params.is_device_originated());

        if self.pipeline.commit(Channel::Power, power.is_on()) {
            self.pipeline.update(&self.fan, Characteristic::On, power.is_on());
            if logs {
                tracing::info!(accessory = %self.pipeline.name(), state = %power, "current state");
            }
        }

        let speed_value = i64::from(speed.value());
        if power.is_on() && self.pipeline.commit(Channel::Speed, speed_value) {
            self.pipeline
                .update(&self.fan, Characteristic::RotationSpeed, speed_value);
            if logs {
                tracing::info!(accessory = %self.pipeline.name(), %speed, "current speed");
            }
        }

        if let Some(service) = &self.light
            && self.pipeline.commit(Channel::Light, light.is_on())
        {
            self.pipeline.update(service, Characteristic::On, light.is_on());
            if logs {
                tracing::info!(accessory = %self.pipeline.name(), light = %light, "current light");
            }
        }
        Ok(())
    }

    // ========== Status ==========

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the fan and light.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let on = |service| {
            SwitchState::from(
                accessory
                    .value(service, Characteristic::On)
                    .is_some_and(|v| v.as_bool()),
            )
        };
        let speed = accessory
            .value(&self.fan, Characteristic::RotationSpeed)
            .map_or(FanSpeed::OFF, |v| FanSpeed::quantize(v.as_f64()));

        let mut snapshot = StateSnapshot::new().with_service(
            ServiceKind::Fan.as_str(),
            json!({"state": on(&self.fan), "speed": speed.label()}),
        );
        if let Some(light) = &self.light {
            snapshot.insert(ServiceKind::Lightbulb.as_str(), json!({"state": on(light)}));
        }
        snapshot
    }

    /// Nothing runs in the background for fans.
    pub fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::accessory::AccessoryContext;
    use crate::config::{DeviceConfig, PlatformConfig};
    use crate::protocol::RecordingTransport;

    fn setup(config: PlatformConfig) -> (Arc<RecordingTransport>, Arc<FanAdapter<RecordingTransport>>) {
        let transport = Arc::new(RecordingTransport::new());
        let platform = Platform::new(Arc::clone(&transport), config);
        let accessory = Arc::new(Accessory::new("Fan", AccessoryContext::new("1000fa", 34)));
        (transport, FanAdapter::new(&platform, accessory))
    }

    fn fan() -> ServiceId {
        ServiceId::new(ServiceKind::Fan)
    }

    #[tokio::test]
    async fn turning_on_sends_cached_speed_taps() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.set_on(true).await.unwrap();
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_outlets([
                (1, SwitchState::On),
                (2, SwitchState::Off),
                (3, SwitchState::Off)
            ])
        );

        adapter.set_on(true).await.unwrap();
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_zero_turns_off_and_restores_slider() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.set_rotation_speed(60.0).await.unwrap();
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::On),
            Some(CharValue::Bool(true))
        );

        adapter.set_rotation_speed(0.0).await.unwrap();
        assert_eq!(
            transport.last().unwrap().outlet_state(1),
            Some(SwitchState::Off)
        );
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::RotationSpeed),
            Some(CharValue::Int(66))
        );
    }

    #[test]
    fn lan_push_is_converted() {
        let (_, adapter) = setup(PlatformConfig::new());
        let push = DeviceParams::from_json(json!({"light": "on", "fan": "on", "speed": 3})).unwrap();
        adapter.external_update(&push);

        let snapshot = adapter.current_state().to_json();
        assert_eq!(snapshot["fan"], json!({"state": "on", "speed": "high"}));
        assert_eq!(snapshot["light"], json!({"state": "on"}));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_speed_write_reverts_slider() {
        let (transport, adapter) = setup(PlatformConfig::new());
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::RotationSpeed),
            Some(CharValue::Int(0))
        );

        transport.set_failing(true);
        assert!(adapter.set_rotation_speed(80.0).await.is_err());
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::RotationSpeed),
            Some(CharValue::Float(80.0))
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::RotationSpeed),
            Some(CharValue::Int(0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cached_speed_still_turns_fan_on() {
        let (transport, adapter) = setup(PlatformConfig::new());
        adapter.set_rotation_speed(60.0).await.unwrap();
        adapter.set_on(false).await.unwrap();

        adapter.set_rotation_speed(60.0).await.unwrap();
        assert_eq!(transport.count(), 3);
        assert_eq!(
            transport.last().unwrap().outlet_state(1),
            Some(SwitchState::On)
        );
    }

    #[test]
    fn speed_push_ignored_while_off() {
        let (_, adapter) = setup(PlatformConfig::new());
        let push = DeviceParams::with_outlets([
            (0, SwitchState::Off),
            (1, SwitchState::Off),
            (2, SwitchState::On),
            (3, SwitchState::Off),
        ]);
        adapter.external_update(&push);
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::RotationSpeed),
            Some(CharValue::Int(0))
        );
    }

    #[test]
    fn incomplete_push_changes_nothing() {
        let (_, adapter) = setup(PlatformConfig::new());
        adapter.external_update(&DeviceParams::with_outlets([(1, SwitchState::On)]));
        assert_eq!(
            adapter.accessory().value(&fan(), Characteristic::On),
            Some(CharValue::Bool(false))
        );
    }

    #[test]
    fn hidden_light_removes_service() {
        let config = PlatformConfig::new().with_device(DeviceConfig::new("1000fa").with_hidden_light());
        let (_, adapter) = setup(config);
        assert!(!adapter
            .accessory()
            .has_service(&ServiceId::new(ServiceKind::Lightbulb)));
        assert_eq!(adapter.current_state().services(), ["fan"]);
    }
}
