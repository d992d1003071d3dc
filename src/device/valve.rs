// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Four-valve irrigation controller simulated on a four-channel relay.
//!
//! Each valve closes itself once its set duration runs out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::accessory::{
    Accessory, CharValue, Characteristic, ServiceId, ServiceKind, SimulationKind,
};
use crate::config::{OptionsSummary, ensure_simulation};
use crate::error::Result;
use crate::manager::Platform;
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::{ArmedTimer, Binding, CommandPipeline};
use crate::types::SwitchState;

/// Default watering time in seconds.
pub const DEFAULT_DURATION: i64 = 120;

/// Generic valve type (`ValveType` 1 is irrigation).
const IRRIGATION: i64 = 1;

/// One of the four valves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValveSlot {
    /// Outlet 0.
    A,
    /// Outlet 1.
    B,
    /// Outlet 2.
    C,
    /// Outlet 3.
    D,
}

impl ValveSlot {
    /// All valves in outlet order.
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Returns the relay outlet that drives this valve.
    #[must_use]
    pub const fn outlet(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    /// Returns the service subtype, e.g. `valvea`.
    #[must_use]
    pub const fn subtype(self) -> &'static str {
        match self {
            Self::A => "valvea",
            Self::B => "valveb",
            Self::C => "valvec",
            Self::D => "valved",
        }
    }

    /// Returns the service for this valve.
    #[must_use]
    pub fn service(self) -> ServiceId {
        ServiceId::with_subtype(ServiceKind::Valve, self.subtype())
    }
}

impl fmt::Display for ValveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        };
        write!(f, "Valve {letter}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Channel(ValveSlot);

#[derive(Debug)]
struct Valve {
    slot: ValveSlot,
    service: ServiceId,
    timer: ArmedTimer,
}

/// Adapter for a four-valve controller.
#[derive(Debug)]
pub struct ValveAdapter<T> {
    pipeline: CommandPipeline<T, Channel>,
    valves: Vec<Valve>,
}

impl<T: Transport> ValveAdapter<T> {
    /// Sets up the four valve services, all closed.
    #[must_use]
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Arc<Self> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);
        accessory.update_context(|ctx| ensure_simulation(ctx, SimulationKind::ValveFour));

        let valves = ValveSlot::ALL
            .into_iter()
            .map(|slot| {
                let service = slot.service();
                accessory.ensure_service(&service);
                accessory.set_default(&service, Characteristic::ValveType, IRRIGATION);
                accessory.set_default(&service, Characteristic::SetDuration, DEFAULT_DURATION);
                // Countdowns do not survive a restart.
                for characteristic in [
                    Characteristic::Active,
                    Characteristic::InUse,
                    Characteristic::RemainingDuration,
                ] {
                    accessory.update_characteristic(&service, characteristic, 0_i64);
                }
                pipeline.store(Channel(slot), 0_i64);
                Valve {
                    slot,
                    service,
                    timer: ArmedTimer::new(),
                }
            })
            .collect();

        OptionsSummary::new(accessory.name(), options.log)
            .with("showAs", "valve_four")
            .emit();

        Arc::new(Self { pipeline, valves })
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    fn valve(&self, slot: ValveSlot) -> &Valve {
        &self.valves[usize::from(slot.outlet())]
    }

    fn duration(&self, valve: &Valve) -> i64 {
        self.accessory()
            .value(&valve.service, Characteristic::SetDuration)
            .map_or(DEFAULT_DURATION, |v| v.as_i64())
    }

    fn report(&self, valve: &Valve, open: bool, remaining: i64) {
        let active = i64::from(open);
        self.pipeline
            .update(&valve.service, Characteristic::Active, active);
        self.pipeline.update(&valve.service, Characteristic::InUse, active);
        self.pipeline
            .update(&valve.service, Characteristic::RemainingDuration, remaining);
    }

    fn arm_shutoff(&self, valve: &Valve, seconds: i64) {
        let pipeline = self.pipeline.clone();
        let service = valve.service.clone();
        let slot = valve.slot;
        let delay = Duration::from_secs(u64::try_from(seconds).unwrap_or(0));
        valve.timer.arm(delay, async move {
            for characteristic in [
                Characteristic::Active,
                Characteristic::InUse,
                Characteristic::RemainingDuration,
            ] {
                pipeline.update(&service, characteristic, 0_i64);
            }
            pipeline.store(Channel(slot), 0_i64);
            if pipeline.log().enabled {
                tracing::info!(accessory = %pipeline.name(), valve = %slot, "current state: closed");
            }
            let off = DeviceParams::with_outlets([(slot.outlet(), SwitchState::Off)]);
            if pipeline.dispatch(&off).await.is_err() {
                tracing::warn!(accessory = %pipeline.name(), valve = %slot, "automatic shut-off was not acknowledged");
            }
        });
    }

    // ========== Controller writes ==========

    /// Opens or closes a valve.
    ///
    /// Opening starts the countdown from the valve's set duration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the device did not accept the
    /// command; `Active` reverts after two seconds.
    pub async fn set_active(&self, slot: ValveSlot, open: bool) -> Result<()> {
        let valve = self.valve(slot);
        let active = i64::from(open);
        self.accessory()
            .set_value(&valve.service, Characteristic::Active, active);
        if self.pipeline.is_cached(&Channel(slot), active) {
            return Ok(());
        }

        self.pipeline
            .dispatch_or_rollback(
                &DeviceParams::with_outlets([(slot.outlet(), SwitchState::from(open))]),
                &[Binding::new(
                    Channel(slot),
                    valve.service.clone(),
                    Characteristic::Active,
                )],
            )
            .await?;

        self.pipeline.commit(Channel(slot), active);
        if open {
            let duration = self.duration(valve);
            self.report(valve, true, duration);
            self.arm_shutoff(valve, duration);
        } else {
            valve.timer.cancel();
            self.report(valve, false, 0);
        }
        if self.pipeline.log().enabled {
            tracing::info!(
                accessory = %self.pipeline.name(),
                valve = %slot,
                state = if open { "open" } else { "closed" },
                "current state"
            );
        }
        Ok(())
    }

    /// Changes a valve's watering time.
    ///
    /// While the valve is open the countdown restarts from the new value.
    /// Nothing is sent to the device.
    pub fn set_duration(&self, slot: ValveSlot, seconds: i64) {
        let valve = self.valve(slot);
        self.accessory()
            .set_value(&valve.service, Characteristic::SetDuration, seconds);
        let in_use = self
            .accessory()
            .value(&valve.service, Characteristic::InUse)
            .is_some_and(|v| v.as_i64() == 1);
        if in_use {
            self.pipeline
                .update(&valve.service, Characteristic::RemainingDuration, seconds);
            self.arm_shutoff(valve, seconds);
        }
    }

    /// Reads a characteristic of one valve.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while offline.
    pub fn get(&self, slot: ValveSlot, characteristic: Characteristic) -> Result<CharValue> {
        self.pipeline.read(&self.valve(slot).service, characteristic)
    }

    /// Returns `true` while a valve's countdown is running.
    #[must_use]
    pub fn is_counting_down(&self, slot: ValveSlot) -> bool {
        self.valve(slot).timer.is_armed()
    }

    // ========== Pushes ==========

    /// Applies a push from the device.
    ///
    /// An externally opened valve starts its own countdown.
    pub fn external_update(&self, params: &DeviceParams) {
        if params.switches.is_none() {
            return;
        }
        let logs = self.pipeline.log().logs_push(params.is_device_originated());

        for valve in &self.valves {
            let Some(state) = params.outlet_state(valve.slot.outlet()) else {
                continue;
            };
            if !self.pipeline.commit(Channel(valve.slot), i64::from(state.is_on())) {
                continue;
            }
            if state.is_on() {
                let duration = self.duration(valve);
                self.report(valve, true, duration);
                self.arm_shutoff(valve, duration);
            } else {
                valve.timer.cancel();
                self.report(valve, false, 0);
            }
            if logs {
                tracing::info!(accessory = %self.pipeline.name(), valve = %valve.slot, %state, "current state");
            }
        }
    }

    // ========== Status ==========

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot of all four valves.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let accessory = self.accessory();
        let mut snapshot = StateSnapshot::new();
        for valve in &self.valves {
            let read = |characteristic| {
                accessory
                    .value(&valve.service, characteristic)
                    .map_or(0, |v| v.as_i64())
            };
            snapshot.insert(
                valve.slot.subtype(),
                json!({
                    "state": if read(Characteristic::Active) == 1 { "open" } else { "closed" },
                    "duration": read(Characteristic::SetDuration),
                    "remaining": read(Characteristic::RemainingDuration),
                }),
            );
        }
        snapshot
    }

    /// Cancels every countdown.
    pub fn shutdown(&self) {
        for valve in &self.valves {
            valve.timer.cancel();
        }
    }
}
