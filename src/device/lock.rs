// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Electric strike lock simulated on a relay.
//!
//! Unlocking energizes the relay; the lock reports locked again after the
//! configured operation time. With a contact sensor linked, relocking waits
//! for the sensor to report the door closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;

use super::models::{self, POWER_VOLTAGE_CURRENT, RelayLayout};
use crate::accessory::{
    Accessory, CharValue, Characteristic, ServiceId, ServiceKind, SimulationKind,
};
use crate::config::{ConnectionMode, OptionsSummary, ensure_simulation};
use crate::error::Result;
use crate::manager::{ContactLinked, Platform};
use crate::protocol::{DeviceParams, RawValue, Transport, UiActive};
use crate::state::StateSnapshot;
use crate::sync::{ArmedTimer, CommandPipeline, Poller, ROLLBACK_DELAY};
use crate::types::{LockState, SwitchState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Power,
    Voltage,
    Current,
}

/// Prefers the hundredths-scaled per-channel field over the plain one.
fn metered(scaled: Option<&RawValue>, plain: Option<&RawValue>) -> Option<f64> {
    match scaled.and_then(RawValue::as_f64) {
        Some(hundredths) => Some(hundredths.trunc() / 100.0),
        None => plain.and_then(RawValue::as_f64),
    }
}

/// Adapter for a simulated lock.
#[derive(Debug)]
pub struct LockAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    poller: Poller,
    timer: ArmedTimer,
    service: ServiceId,
    layout: RelayLayout,
    meters: Vec<(Channel, Characteristic)>,
    in_use: Arc<AtomicBool>,
    confirmed: bool,
    confirmed_delay: Duration,
    unconfirmed_delay: Duration,
}

impl<T: Transport> LockAdapter<T> {
    /// Sets up the lock service. The lock always starts locked.
    ///
    /// Power-reading models start polling, so they must be created from
    /// within a tokio runtime.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);
        let uiid = accessory.uiid();

        accessory.update_context(|ctx| {
            ensure_simulation(ctx, SimulationKind::Lock);
            ctx.contact_detected = Some(true);
        });
        accessory.remove_service(&ServiceId::new(ServiceKind::Switch));

        let service = ServiceId::new(ServiceKind::LockMechanism);
        accessory.ensure_service(&service);
        let locked = LockState::Locked.as_num();
        accessory.update_characteristic(&service, Characteristic::LockCurrentState, locked);
        accessory.update_characteristic(&service, Characteristic::LockTargetState, locked);

        let mut meters = vec![];
        if models::reports_power(uiid) {
            meters.push((Channel::Power, Characteristic::CurrentConsumption));
            if uiid == POWER_VOLTAGE_CURRENT || models::is_multi_power(uiid) {
                meters.extend([
                    (Channel::Voltage, Characteristic::Voltage),
                    (Channel::Current, Characteristic::ElectricCurrent),
                ]);
            }
        }
        for &(channel, characteristic) in &meters {
            pipeline.seed(channel, &service, characteristic);
        }

        OptionsSummary::new(accessory.name(), options.log)
            .with("operationTime", options.operation_time)
            .with("sensorId", &options.sensor_id)
            .with("showAs", "lock")
            .emit();

        let multi_power = models::is_multi_power(uiid);
        let adapter = Arc::new(Self {
            pipeline,
            poller: Poller::new(),
            timer: ArmedTimer::new(),
            service,
            layout: RelayLayout::for_uiid(uiid),
            meters,
            in_use: Arc::new(AtomicBool::new(false)),
            confirmed: options.sensor_id.is_some(),
            confirmed_delay: options.confirmed_relock_delay(),
            unconfirmed_delay: options.unconfirmed_relock_delay(),
        });
        if !adapter.meters.is_empty() && !(multi_power && options.mode == ConnectionMode::Lan) {
            let request = if multi_power {
                UiActive::Outlet { outlet: 0, time: 120 }
            } else {
                UiActive::Seconds(120)
            };
            adapter
                .poller
                .start(adapter.pipeline.clone(), DeviceParams::with_ui_active(request));
        }
        adapter
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Returns `true` while an unlock cycle is running.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    // ========== Relock timers ==========

    fn report(&self, state: LockState, target_too: bool) {
        self.pipeline
            .update(&self.service, Characteristic::LockCurrentState, state.as_num());
        if target_too {
            self.pipeline
                .update(&self.service, Characteristic::LockTargetState, state.as_num());
        }
    }

    async fn relock(
        pipeline: CommandPipeline<T, Channel>,
        service: ServiceId,
        in_use: Arc<AtomicBool>,
        only_if_closed: bool,
        log: bool,
    ) {
        if only_if_closed && pipeline.accessory().context().contact_detected != Some(true) {
            return;
        }
        let locked = LockState::Locked.as_num();
        pipeline.update(&service, Characteristic::LockTargetState, locked);
        pipeline.update(&service, Characteristic::LockCurrentState, locked);
        in_use.store(false, Ordering::SeqCst);
        if log {
            tracing::info!(accessory = %pipeline.name(), state = %LockState::Locked, "current state");
        }
    }

    fn arm_relock(&self, delay: Duration, only_if_closed: bool, log: bool) {
        self.timer.arm(
            delay,
            Self::relock(
                self.pipeline.clone(),
                self.service.clone(),
                Arc::clone(&self.in_use),
                only_if_closed,
                log,
            ),
        );
    }

    fn arm_sensor_check(&self, log: bool) {
        self.arm_relock(self.confirmed_delay, true, log);
    }

    fn arm_timed_relock(&self, log: bool) {
        self.arm_relock(self.unconfirmed_delay, false, log);
    }

    // ========== Controller writes ==========

    /// Handles a `LockTargetState` write.
    ///
    /// Unlocking energizes the relay and schedules the relock. Without a
    /// linked sensor, a second unlock while a cycle is running is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the relay command failed; the target
    /// returns to locked after two seconds.
    pub async fn set_target(&self, target: LockState) -> Result<()> {
        self.accessory()
            .set_value(&self.service, Characteristic::LockTargetState, target.as_num());
        if target == LockState::Locked {
            self.report(LockState::Locked, false);
            return Ok(());
        }
        if !self.confirmed && self.is_in_use() {
            return Ok(());
        }

        self.in_use.store(true, Ordering::SeqCst);
        if let Err(err) = self.pipeline.dispatch(&self.layout.command(SwitchState::On)).await {
            self.in_use.store(false, Ordering::SeqCst);
            self.pipeline.update_after(
                ROLLBACK_DELAY,
                self.service.clone(),
                Characteristic::LockTargetState,
                LockState::Locked.as_num(),
            );
            return Err(err);
        }

        self.report(LockState::Unlocked, false);
        let log = self.pipeline.log().enabled;
        if log {
            tracing::info!(accessory = %self.pipeline.name(), state = %LockState::Unlocked, "current state");
        }
        if self.confirmed {
            self.arm_sensor_check(log);
        } else {
            self.arm_timed_relock(log);
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

    // ========== Pushes ==========

    /// Applies a push from the device.
    ///
    /// A relay switching on outside an unlock cycle runs the same cycle, so
    /// external triggers are reflected.
    pub fn external_update(&self, params: &DeviceParams) {
        let logs = self.pipeline.log().logs_push(params.is_device_originated());

        if !self.is_in_use() && self.layout.state_of(params) == Some(SwitchState::On) {
            if self.confirmed {
                self.arm_sensor_check(logs);
            } else {
                self.in_use.store(true, Ordering::SeqCst);
                self.report(LockState::Unlocked, true);
                if logs {
                    tracing::info!(accessory = %self.pipeline.name(), state = %LockState::Unlocked, "current state");
                }
                self.arm_timed_relock(logs);
            }
        }

        if self.meters.is_empty() {
            return;
        }
        let readings = [
            (
                Channel::Power,
                metered(params.act_pow_00.as_ref(), params.power.as_ref()),
            ),
            (
                Channel::Voltage,
                metered(params.voltage_00.as_ref(), params.voltage.as_ref()),
            ),
            (
                Channel::Current,
                metered(params.current_00.as_ref(), params.current.as_ref()),
            ),
        ];
        for (channel, reading) in readings {
            let Some(value) = reading else { continue };
            let Some(&(_, characteristic)) = self.meters.iter().find(|(c, _)| *c == channel) else {
                continue;
            };
            if self.pipeline.commit(channel, value) {
                self.pipeline.update(&self.service, characteristic, value);
                if logs {
                    tracing::info!(accessory = %self.pipeline.name(), ?channel, value, "current reading");
                }
            }
        }
    }

    // ========== Status ==========

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of the lock.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let state = self
            .accessory()
            .value(&self.service, Characteristic::LockCurrentState)
            .map_or(LockState::Locked, |v| LockState::from_num(v.as_i64()));
        StateSnapshot::new().with_service(
            ServiceKind::LockMechanism.as_str(),
            json!({"state": state.as_str()}),
        )
    }

    /// Cancels the relock timer and stops polling.
    pub fn shutdown(&self) {
        self.timer.cancel();
        self.poller.stop();
    }
}

impl<T: Transport> ContactLinked for LockAdapter<T> {
    fn contact_changed(&self, open: bool, log_change: bool) {
        let state = if open {
            LockState::Unlocked
        } else {
            LockState::Locked
        };
        self.report(state, true);
        self.accessory()
            .update_context(|ctx| ctx.contact_detected = Some(!open));
        if !open {
            self.in_use.store(false, Ordering::SeqCst);
        }
        if log_change && self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), %state, "current state");
        }
    }
}
