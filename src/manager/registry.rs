// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry routing pushes and status changes to adapters by device id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Platform;
use crate::accessory::Accessory;
use crate::device::{
    ButtonStatelessAdapter, FanAdapter, HeaterAdapter, LockAdapter, RfButtonAdapter,
    SensorAmbientAdapter, SensorContactAdapter, SensorLeakAdapter, SensorMotionAdapter,
    SwitchSingleAdapter, ValveAdapter,
};
use crate::error::{ConfigError, Result};
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;

/// Which adapter to build for an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Fan controller with light.
    Fan,
    /// Relay simulating a heater.
    Heater,
    /// Relay simulating a lock.
    Lock,
    /// Four-channel relay simulating irrigation valves.
    Valve,
    /// Single relay, optionally with power readings.
    SwitchSingle,
    /// Relay with a temperature/humidity probe.
    SensorAmbient,
    /// Door/window sensor.
    SensorContact,
    /// Contact sensor used as a leak detector.
    SensorLeak,
    /// Motion sensor.
    SensorMotion,
    /// Stateless wireless button.
    ButtonStateless,
    /// RF bridge remote.
    RfButton,
}

/// An adapter of any kind.
pub enum DeviceAdapter<T> {
    /// See [`FanAdapter`].
    Fan(Arc<FanAdapter<T>>),
    /// See [`HeaterAdapter`].
    Heater(Arc<HeaterAdapter<T>>),
    /// See [`LockAdapter`].
    Lock(Arc<LockAdapter<T>>),
    /// See [`ValveAdapter`].
    Valve(Arc<ValveAdapter<T>>),
    /// See [`SwitchSingleAdapter`].
    SwitchSingle(Arc<SwitchSingleAdapter<T>>),
    /// See [`SensorAmbientAdapter`].
    SensorAmbient(Arc<SensorAmbientAdapter<T>>),
    /// See [`SensorContactAdapter`].
    SensorContact(Arc<SensorContactAdapter<T>>),
    /// See [`SensorLeakAdapter`].
    SensorLeak(Arc<SensorLeakAdapter<T>>),
    /// See [`SensorMotionAdapter`].
    SensorMotion(Arc<SensorMotionAdapter<T>>),
    /// See [`ButtonStatelessAdapter`].
    ButtonStateless(Arc<ButtonStatelessAdapter<T>>),
    /// See [`RfButtonAdapter`].
    RfButton(Arc<RfButtonAdapter<T>>),
}

macro_rules! each_adapter {
    ($value:expr, $adapter:ident => $body:expr) => {
        match $value {
            DeviceAdapter::Fan($adapter) => $body,
            DeviceAdapter::Heater($adapter) => $body,
            DeviceAdapter::Lock($adapter) => $body,
            DeviceAdapter::Valve($adapter) => $body,
            DeviceAdapter::SwitchSingle($adapter) => $body,
            DeviceAdapter::SensorAmbient($adapter) => $body,
            DeviceAdapter::SensorContact($adapter) => $body,
            DeviceAdapter::SensorLeak($adapter) => $body,
            DeviceAdapter::SensorMotion($adapter) => $body,
            DeviceAdapter::ButtonStateless($adapter) => $body,
            DeviceAdapter::RfButton($adapter) => $body,
        }
    };
}

impl<T: Transport> DeviceAdapter<T> {
    /// Builds the adapter of the given kind.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoButtons` for an RF remote without buttons.
    pub fn build(kind: AdapterKind, platform: &Platform<T>, accessory: Arc<Accessory>) -> Result<Self> {
        Ok(match kind {
            AdapterKind::Fan => Self::Fan(FanAdapter::new(platform, accessory)),
            AdapterKind::Heater => Self::Heater(HeaterAdapter::new(platform, accessory)),
            AdapterKind::Lock => Self::Lock(LockAdapter::new(platform, accessory)),
            AdapterKind::Valve => Self::Valve(ValveAdapter::new(platform, accessory)),
            AdapterKind::SwitchSingle => {
                Self::SwitchSingle(SwitchSingleAdapter::new(platform, accessory))
            }
            AdapterKind::SensorAmbient => {
                Self::SensorAmbient(SensorAmbientAdapter::new(platform, accessory))
            }
            AdapterKind::SensorContact => {
                Self::SensorContact(SensorContactAdapter::new(platform, accessory))
            }
            AdapterKind::SensorLeak => Self::SensorLeak(SensorLeakAdapter::new(platform, accessory)),
            AdapterKind::SensorMotion => {
                Self::SensorMotion(SensorMotionAdapter::new(platform, accessory))
            }
            AdapterKind::ButtonStateless => {
                Self::ButtonStateless(ButtonStatelessAdapter::new(platform, accessory))
            }
            AdapterKind::RfButton => Self::RfButton(RfButtonAdapter::new(platform, accessory)?),
        })
    }

    /// Returns the kind of this adapter.
    #[must_use]
    pub const fn kind(&self) -> AdapterKind {
        match self {
            Self::Fan(_) => AdapterKind::Fan,
            Self::Heater(_) => AdapterKind::Heater,
            Self::Lock(_) => AdapterKind::Lock,
            Self::Valve(_) => AdapterKind::Valve,
            Self::SwitchSingle(_) => AdapterKind::SwitchSingle,
            Self::SensorAmbient(_) => AdapterKind::SensorAmbient,
            Self::SensorContact(_) => AdapterKind::SensorContact,
            Self::SensorLeak(_) => AdapterKind::SensorLeak,
            Self::SensorMotion(_) => AdapterKind::SensorMotion,
            Self::ButtonStateless(_) => AdapterKind::ButtonStateless,
            Self::RfButton(_) => AdapterKind::RfButton,
        }
    }

    /// Returns the adapter's accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        each_adapter!(self, a => a.accessory())
    }

    /// Applies a push.
    pub async fn external_update(&self, params: &DeviceParams) {
        match self {
            Self::Fan(a) => a.external_update(params),
            Self::Heater(a) => a.external_update(params).await,
            Self::Lock(a) => a.external_update(params),
            Self::Valve(a) => a.external_update(params),
            Self::SwitchSingle(a) => a.external_update(params),
            Self::SensorAmbient(a) => a.external_update(params),
            Self::SensorContact(a) => a.external_update(params),
            Self::SensorLeak(a) => a.external_update(params),
            Self::SensorMotion(a) => a.external_update(params),
            Self::ButtonStateless(a) => a.external_update(params),
            Self::RfButton(a) => a.external_update(params),
        }
    }

    /// Marks the device online or offline.
    pub fn mark_status(&self, online: bool) {
        each_adapter!(self, a => a.mark_status(online));
    }

    /// Returns a snapshot of the device.
    pub async fn current_state(&self) -> StateSnapshot {
        match self {
            Self::Fan(a) => a.current_state(),
            Self::Heater(a) => a.current_state(),
            Self::Lock(a) => a.current_state(),
            Self::Valve(a) => a.current_state(),
            Self::SwitchSingle(a) => a.current_state().await,
            Self::SensorAmbient(a) => a.current_state(),
            Self::SensorContact(a) => a.current_state(),
            Self::SensorLeak(a) => a.current_state(),
            Self::SensorMotion(a) => a.current_state(),
            Self::ButtonStateless(a) => a.current_state(),
            Self::RfButton(a) => a.current_state(),
        }
    }

    /// Stops the adapter's timers and pollers.
    pub fn shutdown(&self) {
        each_adapter!(self, a => a.shutdown());
    }
}

impl<T> Clone for DeviceAdapter<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fan(a) => Self::Fan(Arc::clone(a)),
            Self::Heater(a) => Self::Heater(Arc::clone(a)),
            Self::Lock(a) => Self::Lock(Arc::clone(a)),
            Self::Valve(a) => Self::Valve(Arc::clone(a)),
            Self::SwitchSingle(a) => Self::SwitchSingle(Arc::clone(a)),
            Self::SensorAmbient(a) => Self::SensorAmbient(Arc::clone(a)),
            Self::SensorContact(a) => Self::SensorContact(Arc::clone(a)),
            Self::SensorLeak(a) => Self::SensorLeak(Arc::clone(a)),
            Self::SensorMotion(a) => Self::SensorMotion(Arc::clone(a)),
            Self::ButtonStateless(a) => Self::ButtonStateless(Arc::clone(a)),
            Self::RfButton(a) => Self::RfButton(Arc::clone(a)),
        }
    }
}

impl<T: Transport> fmt::Debug for DeviceAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAdapter")
            .field("kind", &self.kind())
            .field("accessory", &self.accessory().name())
            .finish()
    }
}

/// Owns every adapter of a platform, keyed by device id.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use accessory_sync::accessory::{Accessory, AccessoryContext};
/// use accessory_sync::config::PlatformConfig;
/// use accessory_sync::manager::{AdapterKind, AdapterRegistry, Platform};
/// use accessory_sync::protocol::RecordingTransport;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> accessory_sync::Result<()> {
/// let platform = Platform::new(Arc::new(RecordingTransport::new()), PlatformConfig::new());
/// let registry = AdapterRegistry::new(platform);
///
/// let door = Arc::new(Accessory::new("Door", AccessoryContext::new("1000dw", 102)));
/// registry.add(AdapterKind::SensorContact, door)?;
///
/// registry.push("1000dw", serde_json::json!({"switch": "on"})).await;
/// let state = registry.current_state("1000dw").await.unwrap();
/// assert_eq!(state.service("contact").unwrap()["state"], "open");
/// # Ok(())
/// # }
/// ```
pub struct AdapterRegistry<T> {
    platform: Platform<T>,
    adapters: RwLock<HashMap<String, DeviceAdapter<T>>>,
}

impl<T: Transport> AdapterRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(platform: Platform<T>) -> Self {
        Self {
            platform,
            adapters: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the platform adapters are built against.
    #[must_use]
    pub fn platform(&self) -> &Platform<T> {
        &self.platform
    }

    // ========== Registration ==========

    /// Builds an adapter for `accessory` and registers it.
    ///
    /// Adapters may start background tasks, so this must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateDevice` if the device id is taken, or
    /// the adapter's own construction error.
    pub fn add(&self, kind: AdapterKind, accessory: Arc<Accessory>) -> Result<DeviceAdapter<T>> {
        let device_id = accessory.device_id();
        if self.adapters.read().contains_key(&device_id) {
            return Err(ConfigError::DuplicateDevice(device_id).into());
        }
        let adapter = DeviceAdapter::build(kind, &self.platform, accessory)?;
        self.insert(adapter.clone())?;
        Ok(adapter)
    }

    /// Registers an already built adapter.
    ///
    /// Locks also become reachable by contact sensor fan-out.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateDevice` if the device id is taken.
    pub fn insert(&self, adapter: DeviceAdapter<T>) -> Result<()> {
        let device_id = adapter.accessory().device_id();
        let mut adapters = self.adapters.write();
        if adapters.contains_key(&device_id) {
            return Err(ConfigError::DuplicateDevice(device_id).into());
        }
        if let DeviceAdapter::Lock(lock) = &adapter {
            self.platform.links().register(device_id.clone(), lock);
        }
        tracing::debug!(%device_id, kind = ?adapter.kind(), "adapter registered");
        adapters.insert(device_id, adapter);
        Ok(())
    }

    /// Shuts down and removes an adapter. Returns `true` if it existed.
    pub fn remove(&self, device_id: &str) -> bool {
        let Some(adapter) = self.adapters.write().remove(device_id) else {
            return false;
        };
        adapter.shutdown();
        self.platform.links().unregister(device_id);
        true
    }

    /// Returns the adapter for a device id.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<DeviceAdapter<T>> {
        self.adapters.read().get(device_id).cloned()
    }

    /// Returns all registered device ids.
    #[must_use]
    pub fn device_ids(&self) -> Vec<String> {
        self.adapters.read().keys().cloned().collect()
    }

    /// Returns the number of adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.read().len()
    }

    /// Returns `true` if no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.read().is_empty()
    }

    // ========== Routing ==========

    /// Routes a raw push payload to its adapter.
    ///
    /// Payloads that do not parse are logged and dropped. Returns `true` if
    /// the payload reached an adapter.
    pub async fn push(&self, device_id: &str, payload: serde_json::Value) -> bool {
        let Some(adapter) = self.get(device_id) else {
            tracing::debug!(%device_id, "push for unknown device");
            return false;
        };
        match DeviceParams::from_json(payload) {
            Ok(params) => {
                adapter.external_update(&params).await;
                true
            }
            Err(err) => {
                tracing::warn!(
                    accessory = %adapter.accessory().name(),
                    error = %err,
                    "dropping malformed push"
                );
                false
            }
        }
    }

    /// Marks a device online or offline. Returns `false` for unknown ids.
    pub fn mark_status(&self, device_id: &str, online: bool) -> bool {
        let Some(adapter) = self.get(device_id) else {
            return false;
        };
        adapter.mark_status(online);
        true
    }

    /// Marks every device online or offline.
    pub fn mark_all_status(&self, online: bool) {
        for adapter in self.adapters.read().values() {
            adapter.mark_status(online);
        }
    }

    /// Returns a snapshot of one device.
    pub async fn current_state(&self, device_id: &str) -> Option<StateSnapshot> {
        let adapter = self.get(device_id)?;
        Some(adapter.current_state().await)
    }

    /// Stops every adapter's timers and pollers.
    pub fn shutdown_all(&self) {
        let adapters = self.adapters.read();
        for adapter in adapters.values() {
            adapter.shutdown();
        }
        tracing::debug!(count = adapters.len(), "all adapters shut down");
    }
}

impl<T: Transport> fmt::Debug for AdapterRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("platform", &self.platform)
            .field("devices", &self.device_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::accessory::{AccessoryContext, CharValue, Characteristic};
    use crate::config::{DeviceConfig, PlatformConfig, ShowAs};
    use crate::protocol::RecordingTransport;
    use crate::types::LockState;
    use serde_json::json;

    fn registry(config: PlatformConfig) -> AdapterRegistry<RecordingTransport> {
        AdapterRegistry::new(Platform::new(Arc::new(RecordingTransport::new()), config))
    }

    fn accessory(device_id: &str, uiid: u32) -> Arc<Accessory> {
        Arc::new(Accessory::new(device_id, AccessoryContext::new(device_id, uiid)))
    }

    #[tokio::test]
    async fn duplicate_device_is_rejected() {
        let registry = registry(PlatformConfig::new());
        registry.add(AdapterKind::SensorLeak, accessory("1000wl", 102)).unwrap();
        let err = registry
            .add(AdapterKind::SensorLeak, accessory("1000wl", 102))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::DuplicateDevice(_))));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn malformed_push_is_dropped() {
        let registry = registry(PlatformConfig::new());
        registry.add(AdapterKind::SensorLeak, accessory("1000wl", 102)).unwrap();
        assert!(!registry.push("1000wl", json!({"switch": 7})).await);
        assert!(!registry.push("nope", json!({"switch": "on"})).await);
        assert!(registry.push("1000wl", json!({"switch": "off"})).await);
    }

    #[tokio::test]
    async fn contact_push_drives_registered_lock() {
        let config = PlatformConfig::new().with_device(
            DeviceConfig::new("1000lk")
                .with_sensor_id("1000dw")
                .with_show_as(ShowAs::Lock),
        );
        let registry = registry(config);
        let DeviceAdapter::Lock(lock) = registry.add(AdapterKind::Lock, accessory("1000lk", 1)).unwrap()
        else {
            panic!("expected a lock adapter");
        };
        registry
            .add(AdapterKind::SensorContact, accessory("1000dw", 102))
            .unwrap();

        registry.push("1000dw", json!({"switch": "on"})).await;
        assert_eq!(
            lock.get(Characteristic::LockCurrentState).unwrap(),
            CharValue::Int(LockState::Unlocked.as_num())
        );
        assert_eq!(lock.accessory().context().contact_detected, Some(false));

        registry.push("1000dw", json!({"switch": "off"})).await;
        assert_eq!(
            lock.get(Characteristic::LockCurrentState).unwrap(),
            CharValue::Int(LockState::Locked.as_num())
        );
        registry.shutdown_all();
    }

    #[tokio::test]
    async fn removed_lock_is_unlinked() {
        let registry = registry(PlatformConfig::new());
        registry.add(AdapterKind::Lock, accessory("1000lk", 1)).unwrap();
        assert!(registry.platform().links().get("1000lk").is_some());
        assert!(registry.remove("1000lk"));
        assert!(registry.platform().links().get("1000lk").is_none());
    }

    #[tokio::test]
    async fn status_reaches_adapter() {
        let registry = registry(PlatformConfig::new());
        let DeviceAdapter::SensorLeak(leak) =
            registry.add(AdapterKind::SensorLeak, accessory("1000wl", 102)).unwrap()
        else {
            panic!("expected a leak adapter");
        };
        assert!(registry.mark_status("1000wl", false));
        assert!(leak.get(Characteristic::LeakDetected).unwrap_err().is_unresponsive());
        registry.mark_all_status(true);
        assert!(leak.get(Characteristic::LeakDetected).is_ok());
    }
}
