// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device adapters.
//!
//! Each adapter binds one [`Accessory`] to one physical device. It turns
//! controller writes into device commands and device pushes into
//! characteristic updates, and runs whatever local state machine the
//! hardware lacks.
//!
//! All adapters share the same shape:
//!
//! - `new(&Platform, Arc<Accessory>)` sets up services and resolves options
//! - controller writes are `async` and return [`Error::Unresponsive`] on
//!   failure, after scheduling a rollback
//! - `external_update(&DeviceParams)` applies a push
//! - `mark_status`, `current_state` and `shutdown`
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use accessory_sync::accessory::{Accessory, AccessoryContext, Characteristic};
//! use accessory_sync::config::PlatformConfig;
//! use accessory_sync::device::FanAdapter;
//! use accessory_sync::manager::Platform;
//! use accessory_sync::protocol::RecordingTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> accessory_sync::Result<()> {
//! let transport = Arc::new(RecordingTransport::new());
//! let platform = Platform::new(Arc::clone(&transport), PlatformConfig::new());
//! let accessory = Arc::new(Accessory::new("Ceiling", AccessoryContext::new("1000fan", 34)));
//!
//! let fan = FanAdapter::new(&platform, accessory);
//! fan.set_on(true).await?;
//! assert_eq!(transport.count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! [`Error::Unresponsive`]: crate::Error::Unresponsive

mod button_stateless;
mod fan;
mod heater;
mod lock;
pub mod models;
mod rf_button;
mod sensor_ambient;
mod sensor_contact;
mod sensor_leak;
mod sensor_motion;
mod switch_single;
mod valve;

use std::hash::Hash;

pub use button_stateless::{ButtonPress, ButtonStatelessAdapter};
pub use fan::FanAdapter;
pub use heater::HeaterAdapter;
pub use lock::LockAdapter;
pub use rf_button::RfButtonAdapter;
pub use sensor_ambient::SensorAmbientAdapter;
pub use sensor_contact::SensorContactAdapter;
pub use sensor_leak::SensorLeakAdapter;
pub use sensor_motion::SensorMotionAdapter;
pub use switch_single::SwitchSingleAdapter;
pub use valve::{DEFAULT_DURATION, ValveAdapter, ValveSlot};

use crate::accessory::{Accessory, Characteristic, ServiceId, ServiceKind};
use crate::normalize::{BatteryScale, BatteryStatus};
use crate::protocol::{RawValue, Transport};
use crate::sync::CommandPipeline;

/// Probe type that measures temperature only.
const TEMPERATURE_ONLY_PROBE: &str = "DS18B20";

/// Returns `false` for probes without a humidity sensor.
pub(crate) fn reports_humidity(accessory: &Accessory) -> bool {
    accessory.context().sensor_type.as_deref() != Some(TEMPERATURE_ONLY_PROBE)
}

/// The battery service of a battery-powered sensor.
#[derive(Debug, Clone)]
pub(crate) struct BatteryReporter {
    service: ServiceId,
    scale: BatteryScale,
    low_threshold: f64,
}

impl BatteryReporter {
    /// Adds the battery service and seeds `channel` from its level.
    pub(crate) fn new<T, K>(
        pipeline: &CommandPipeline<T, K>,
        channel: K,
        scale: BatteryScale,
        low_threshold: f64,
    ) -> Self
    where
        T: Transport,
        K: Eq + Hash + Clone + Send + 'static,
    {
        let service = ServiceId::new(ServiceKind::Battery);
        pipeline.accessory().ensure_service(&service);
        pipeline.seed(channel, &service, Characteristic::BatteryLevel);
        Self {
            service,
            scale,
            low_threshold,
        }
    }

    pub(crate) fn service(&self) -> &ServiceId {
        &self.service
    }

    /// Applies a raw reading. Only a changed level is reported.
    pub(crate) fn apply<T, K>(
        &self,
        pipeline: &CommandPipeline<T, K>,
        channel: K,
        raw: Option<&RawValue>,
        logs: bool,
    ) where
        T: Transport,
        K: Eq + Hash + Clone + Send + 'static,
    {
        let Some(raw) = raw.and_then(RawValue::as_f64) else {
            return;
        };
        let status = BatteryStatus::from_raw(raw, self.scale, self.low_threshold);
        if !pipeline.commit(channel, status.level) {
            return;
        }
        pipeline.update(&self.service, Characteristic::BatteryLevel, status.level);
        pipeline.update(&self.service, Characteristic::StatusLowBattery, status.low_flag());
        if logs {
            tracing::info!(accessory = %pipeline.name(), level = status.level, "current battery");
        }
    }

    /// Returns the reported level, if any.
    pub(crate) fn level(&self, accessory: &Accessory) -> Option<i64> {
        accessory
            .value(&self.service, Characteristic::BatteryLevel)
            .map(|v| v.as_i64())
    }
}
