// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-relay switches, optionally reporting power.

use std::sync::Arc;

use serde_json::json;

use super::models::{POWER_ONLY, POWER_VOLTAGE_CURRENT, RelayLayout};
use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::OptionsSummary;
use crate::error::Result;
use crate::event::HistoryEntry;
use crate::manager::Platform;
use crate::protocol::{DeviceParams, Transport, UiActive};
use crate::state::StateSnapshot;
use crate::sync::{Binding, CommandPipeline, Poller};
use crate::types::SwitchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Relay,
    InUse,
    Power,
    Voltage,
    Current,
}

/// Which electrical readings a model reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readings {
    None,
    Power,
    Full,
}

impl Readings {
    fn for_uiid(uiid: u32) -> Self {
        match uiid {
            POWER_ONLY => Self::Power,
            POWER_VOLTAGE_CURRENT => Self::Full,
            _ => Self::None,
        }
    }
}

/// Adapter for a single-relay switch.
#[derive(Debug)]
pub struct SwitchSingleAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    poller: Poller,
    service: ServiceId,
    layout: RelayLayout,
    readings: Readings,
    in_use_threshold: f64,
}

impl<T: Transport> SwitchSingleAdapter<T> {
    /// Sets up the switch service and, for power models, starts polling.
    ///
    /// Power models must be created from within a tokio runtime.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);
        let uiid = accessory.uiid();
        let readings = Readings::for_uiid(uiid);

        accessory.remove_service(&ServiceId::new(ServiceKind::Outlet));
        let service = ServiceId::new(ServiceKind::Switch);
        accessory.ensure_service(&service);
        accessory.set_default(&service, Characteristic::On, false);
        pipeline.seed(Channel::Relay, &service, Characteristic::On);

        let mut seeded = vec![];
        if readings != Readings::None {
            seeded.extend([
                (Channel::InUse, Characteristic::OutletInUse),
                (Channel::Power, Characteristic::CurrentConsumption),
            ]);
        }
        if readings == Readings::Full {
            seeded.extend([
                (Channel::Voltage, Characteristic::Voltage),
                (Channel::Current, Characteristic::ElectricCurrent),
            ]);
        }
        for (channel, characteristic) in seeded {
            pipeline.seed(channel, &service, characteristic);
        }

        OptionsSummary::new(accessory.name(), options.log)
            .with("inUsePowerThreshold", options.in_use_power_threshold)
            .with("showAs", "default")
            .emit();

        let adapter = Arc::new(Self {
            pipeline,
            poller: Poller::new(),
            service,
            layout: RelayLayout::for_uiid(uiid),
            readings,
            in_use_threshold: options.in_use_power_threshold,
        });
        if readings != Readings::None {
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

    /// Switches the relay.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the device did not accept the
    /// command; the switch reverts after two seconds.
    pub async fn set_on(&self, on: bool) -> Result<()> {
        self.accessory()
            .set_value(&self.service, Characteristic::On, on);
        if self.pipeline.is_cached(&Channel::Relay, on) {
            return Ok(());
        }

        let state = SwitchState::from(on);
        self.pipeline
            .dispatch_or_rollback(
                &self.layout.command(state),
                &[Binding::new(Channel::Relay, self.service.clone(), Characteristic::On)],
            )
            .await?;

        self.pipeline.commit(Channel::Relay, on);
        self.accessory().record_history(HistoryEntry::Status(on));
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
    pub fn get(&self, characteristic: Characteristic) -> Result<CharValue> {
        self.pipeline.read(&self.service, characteristic)
    }

    /// Applies a push from the device.
    pub fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());

        if let Some(state) = self.layout.state_of(params)
            && self.pipeline.commit(Channel::Relay, state.is_on())
        {
            self.pipeline
                .update(&self.service, Characteristic::On, state.is_on());
            self.accessory()
                .record_history(HistoryEntry::Status(state.is_on()));
            if logs {
                tracing::info!(accessory = %self.pipeline.name(), %state, "current state");
            }
        }

        if self.readings == Readings::None {
            return;
        }

        let power = params.power.as_ref().and_then(|v| v.as_f64());
        let (voltage, current) = if self.readings == Readings::Full {
            (
                params.voltage.as_ref().and_then(|v| v.as_f64()),
                params.current.as_ref().and_then(|v| v.as_f64()),
            )
        } else {
            (None, None)
        };

        let mut changed = false;
        if let Some(watts) = power {
            changed |= self.apply_reading(Channel::Power, Characteristic::CurrentConsumption, watts);
            let relay_on = self
                .pipeline
                .cached(&Channel::Relay)
                .is_some_and(|v| v.as_bool());
            let in_use = relay_on && watts > self.in_use_threshold;
            if self.pipeline.commit(Channel::InUse, in_use) {
                self.pipeline
                    .update(&self.service, Characteristic::OutletInUse, in_use);
            }
        }
        if let Some(volts) = voltage {
            changed |= self.apply_reading(Channel::Voltage, Characteristic::Voltage, volts);
        }
        if let Some(amps) = current {
            changed |= self.apply_reading(Channel::Current, Characteristic::ElectricCurrent, amps);
        }
        if let Some(watts) = power
            && changed
        {
            self.accessory().record_history(HistoryEntry::Power(watts));
        }
        if changed && logs {
            tracing::info!(
                accessory = %self.pipeline.name(),
                power = ?power,
                voltage = ?voltage,
                current = ?current,
                "current readings"
            );
        }
    }

    fn apply_reading(&self, channel: Channel, characteristic: Characteristic, value: f64) -> bool {
        let changed = self.pipeline.commit(channel, value);
        if changed {
            self.pipeline.update(&self.service, characteristic, value);
        }
        changed
    }

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot; power models also query the usage history.
    pub async fn current_state(&self) -> StateSnapshot {
        let on = self
            .accessory()
            .value(&self.service, Characteristic::On)
            .is_some_and(|v| v.as_bool());
        let mut snapshot = StateSnapshot::new().with_service(
            ServiceKind::Switch.as_str(),
            json!({"state": SwitchState::from(on)}),
        );

        if self.readings != Readings::None {
            let request = DeviceParams {
                hundred_days_kwh: Some("get".to_string()),
                ..DeviceParams::default()
            };
            if let Some(ack) = self.pipeline.query(&request).await {
                snapshot.insert("power", json!({"state": ack.body()}));
            }
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
    use super::*;
    use crate::accessory::AccessoryContext;
    use crate::config::{DeviceConfig, PlatformConfig};
    use crate::event::AccessoryEvent;
    use crate::protocol::RecordingTransport;

    fn setup(
        uiid: u32,
        config: PlatformConfig,
    ) -> (Arc<RecordingTransport>, Arc<SwitchSingleAdapter<RecordingTransport>>) {
        let transport = Arc::new(RecordingTransport::new());
        let platform = Platform::new(Arc::clone(&transport), config);
        let accessory = Arc::new(Accessory::new("Plug", AccessoryContext::new("1000sw", uiid)));
        (transport, SwitchSingleAdapter::new(&platform, accessory))
    }

    fn switch() -> ServiceId {
        ServiceId::new(ServiceKind::Switch)
    }

    #[tokio::test]
    async fn scm_models_address_outlet_zero() {
        let (transport, adapter) = setup(77, PlatformConfig::new());
        adapter.set_on(true).await.unwrap();
        assert_eq!(transport.last().unwrap().outlet_state(0), Some(SwitchState::On));
    }

    #[tokio::test]
    async fn write_records_history() {
        let (transport, adapter) = setup(1, PlatformConfig::new());
        let mut events = adapter.accessory().subscribe();
        adapter.set_on(true).await.unwrap();

        assert_eq!(transport.last().unwrap(), DeviceParams::with_switch(SwitchState::On));
        let event = events.try_recv().unwrap();
        assert!(matches!(
            event,
            AccessoryEvent::HistoryEntry {
                entry: HistoryEntry::Status(true),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn in_use_requires_relay_on_and_threshold() {
        let config = PlatformConfig::new()
            .with_device(DeviceConfig::new("1000sw").with_in_use_power_threshold(5.0));
        let (_, adapter) = setup(32, config);

        adapter.external_update(&DeviceParams::from_json(json!({"power": "12.5"})).unwrap());
        assert_eq!(
            adapter.get(Characteristic::OutletInUse).unwrap(),
            CharValue::Bool(false)
        );

        adapter.external_update(
            &DeviceParams::from_json(json!({"switch": "on", "power": 12.5, "voltage": 230})).unwrap(),
        );
        assert_eq!(
            adapter.get(Characteristic::OutletInUse).unwrap(),
            CharValue::Bool(true)
        );
        assert_eq!(
            adapter.get(Characteristic::Voltage).unwrap(),
            CharValue::Float(230.0)
        );
        adapter.shutdown();
    }

    #[tokio::test]
    async fn plain_models_ignore_readings() {
        let (_, adapter) = setup(1, PlatformConfig::new());
        adapter.external_update(&DeviceParams::from_json(json!({"power": 100})).unwrap());
        assert!(adapter
            .accessory()
            .value(&switch(), Characteristic::CurrentConsumption)
            .is_none());
    }

    #[tokio::test]
    async fn snapshot_includes_usage_query() {
        let (transport, adapter) = setup(5, PlatformConfig::new());
        transport.set_reply(json!({"hundredDaysKwh": "000102"}));
        let snapshot = adapter.current_state().await.to_json();
        assert_eq!(snapshot["services"], json!(["switch", "power"]));
        assert_eq!(snapshot["power"]["state"]["hundredDaysKwh"], "000102");

        transport.set_failing(true);
        let snapshot = adapter.current_state().await.to_json();
        assert_eq!(snapshot["services"], json!(["switch"]));
        adapter.shutdown();
    }
}
