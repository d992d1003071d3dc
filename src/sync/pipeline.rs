// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Optimistic command pipeline.
//!
//! The controller updates its UI as soon as a write is issued. The pipeline
//! then dispatches the command; on success the adapter commits the new value
//! to its cache, on failure the characteristic is restored from the cache
//! after [`ROLLBACK_DELAY`] and the write fails with
//! [`Error::Unresponsive`].

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId};
use crate::config::LogPolicy;
use crate::error::{Error, Result, ValueError};
use crate::protocol::{DeviceAck, DeviceParams, Transport};
use crate::state::StateCache;

/// Delay before a failed write is visually reverted.
pub const ROLLBACK_DELAY: Duration = Duration::from_millis(2000);

/// An adapter cache shared with rollback tasks.
pub type SharedCache<K> = Arc<Mutex<StateCache<K, CharValue>>>;

/// Ties a cache channel to the characteristic it backs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<K> {
    /// Cache channel holding the confirmed value.
    pub channel: K,
    /// Service holding the characteristic.
    pub service: ServiceId,
    /// The characteristic to restore.
    pub characteristic: Characteristic,
}

impl<K> Binding<K> {
    /// Creates a binding.
    #[must_use]
    pub const fn new(channel: K, service: ServiceId, characteristic: Characteristic) -> Self {
        Self {
            channel,
            service,
            characteristic,
        }
    }
}

/// The write path and cache shared by one adapter's operations.
///
/// Cloning is cheap; clones share the transport, accessory, cache and online
/// flag, so spawned timer and polling tasks can hold one without referencing
/// the adapter itself.
pub struct CommandPipeline<T, K> {
    transport: Arc<T>,
    accessory: Arc<Accessory>,
    cache: SharedCache<K>,
    online: Arc<AtomicBool>,
    log: LogPolicy,
    serve_offline_reads: bool,
}

impl<T, K> CommandPipeline<T, K>
where
    T: Transport,
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Creates a pipeline with an empty cache, starting online.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        accessory: Arc<Accessory>,
        log: LogPolicy,
        serve_offline_reads: bool,
    ) -> Self {
        Self {
            transport,
            accessory,
            cache: Arc::new(Mutex::new(StateCache::new())),
            online: Arc::new(AtomicBool::new(true)),
            log,
            serve_offline_reads,
        }
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        &self.accessory
    }

    /// Returns the accessory display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.accessory.name()
    }

    /// Returns the logging policy.
    #[must_use]
    pub fn log(&self) -> LogPolicy {
        self.log
    }

    // ========== Cache ==========

    /// Returns the cached value of a channel.
    #[must_use]
    pub fn cached(&self, channel: &K) -> Option<CharValue> {
        self.cache.lock().get(channel)
    }

    /// Returns `true` if the cache already holds `value`.
    #[must_use]
    pub fn is_cached(&self, channel: &K, value: impl Into<CharValue>) -> bool {
        self.cache.lock().matches(channel, &value.into())
    }

    /// Stores a value if it changed; returns `true` on change.
    pub fn commit(&self, channel: K, value: impl Into<CharValue>) -> bool {
        self.cache.lock().apply(channel, value.into())
    }

    /// Stores a value unconditionally.
    pub fn store(&self, channel: K, value: impl Into<CharValue>) {
        self.cache.lock().set(channel, value.into());
    }

    /// Seeds a channel from the characteristic's current value, if it has one.
    pub fn seed(&self, channel: K, service: &ServiceId, characteristic: Characteristic) {
        if let Some(value) = self.accessory.value(service, characteristic) {
            self.store(channel, value);
        }
    }

    // ========== Characteristics ==========

    /// Pushes a value to the controller.
    pub fn update(
        &self,
        service: &ServiceId,
        characteristic: Characteristic,
        value: impl Into<CharValue>,
    ) {
        self.accessory
            .update_characteristic(service, characteristic, value);
    }

    /// Reads a characteristic for the controller.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while the device is offline (unless
    /// offline reads are allowed), or `ValueError::UnknownCharacteristic`
    /// if the accessory has no such value.
    pub fn read(&self, service: &ServiceId, characteristic: Characteristic) -> Result<CharValue> {
        if !self.serve_offline_reads && !self.is_online() {
            return Err(Error::Unresponsive);
        }
        self.accessory
            .value(service, characteristic)
            .ok_or_else(|| ValueError::UnknownCharacteristic(format!("{service}/{characteristic:?}")).into())
    }

    // ========== Reachability ==========

    /// Returns the online flag.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Sets the online flag. Returns `true` if it changed.
    pub fn mark_status(&self, online: bool) -> bool {
        let changed = self.online.swap(online, Ordering::SeqCst) != online;
        if changed {
            if self.log.debug {
                tracing::debug!(accessory = %self.name(), online, "reachability changed");
            }
            self.accessory.publish_status(online);
        }
        changed
    }

    // ========== Dispatch ==========

    /// Sends an update to the device.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the transport fails; the cause is
    /// logged at `warn`.
    pub async fn dispatch(&self, params: &DeviceParams) -> Result<DeviceAck> {
        if self.log.debug {
            tracing::debug!(accessory = %self.name(), ?params, "sending device update");
        }
        match self
            .transport
            .send_device_update(&self.accessory, params)
            .await
        {
            Ok(ack) => Ok(ack),
            Err(err) => {
                tracing::warn!(accessory = %self.name(), error = %err, "device update failed");
                Err(Error::Unresponsive)
            }
        }
    }

    /// Sends an update and, if it fails, reverts `bindings` after
    /// [`ROLLBACK_DELAY`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the transport fails.
    pub async fn dispatch_or_rollback(
        &self,
        params: &DeviceParams,
        bindings: &[Binding<K>],
    ) -> Result<DeviceAck> {
        let result = self.dispatch(params).await;
        if result.is_err() {
            for binding in bindings {
                self.rollback_later(binding.clone());
            }
        }
        result
    }

    /// Sends a request, swallowing any failure.
    pub async fn query(&self, params: &DeviceParams) -> Option<DeviceAck> {
        match self
            .transport
            .send_device_update(&self.accessory, params)
            .await
        {
            Ok(ack) => Some(ack),
            Err(err) => {
                if self.log.debug {
                    tracing::debug!(accessory = %self.name(), error = %err, "suppressed update failure");
                }
                None
            }
        }
    }

    /// Sends an update, swallowing any failure.
    ///
    /// Returns `true` if the device acknowledged it.
    pub async fn send_quiet(&self, params: &DeviceParams) -> bool {
        self.query(params).await.is_some()
    }

    // ========== Deferred updates ==========

    /// Restores a characteristic from the cache after [`ROLLBACK_DELAY`].
    ///
    /// The cache is read when the delay expires, so a later confirmed value
    /// wins over the one current at failure time.
    pub fn rollback_later(&self, binding: Binding<K>) {
        self.restore_after(ROLLBACK_DELAY, binding);
    }

    /// Restores a characteristic from the cache after `delay`.
    pub fn restore_after(&self, delay: Duration, binding: Binding<K>) {
        let accessory = Arc::clone(&self.accessory);
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let confirmed = cache.lock().get(&binding.channel);
            if let Some(value) = confirmed {
                accessory.update_characteristic(&binding.service, binding.characteristic, value);
            }
        });
    }

    /// Pushes a fixed value after `delay`.
    pub fn update_after(
        &self,
        delay: Duration,
        service: ServiceId,
        characteristic: Characteristic,
        value: impl Into<CharValue>,
    ) {
        let accessory = Arc::clone(&self.accessory);
        let value = value.into();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            accessory.update_characteristic(&service, characteristic, value);
        });
    }
}

impl<T, K> Clone for CommandPipeline<T, K> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            accessory: Arc::clone(&self.accessory),
            cache: Arc::clone(&self.cache),
            online: Arc::clone(&self.online),
            log: self.log,
            serve_offline_reads: self.serve_offline_reads,
        }
    }
}

impl<T, K> fmt::Debug for CommandPipeline<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPipeline")
            .field("accessory", &self.accessory.name())
            .field("online", &self.online.load(Ordering::SeqCst))
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{AccessoryContext, ServiceKind};
    use crate::protocol::RecordingTransport;
    use crate::types::SwitchState;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Channel {
        Relay,
    }

    fn pipeline() -> (Arc<RecordingTransport>, CommandPipeline<RecordingTransport, Channel>) {
        let transport = Arc::new(RecordingTransport::new());
        let accessory = Arc::new(Accessory::new("Test", AccessoryContext::new("1000aa", 1)));
        let pipeline = CommandPipeline::new(
            Arc::clone(&transport),
            accessory,
            LogPolicy::default(),
            false,
        );
        (transport, pipeline)
    }

    fn relay() -> Binding<Channel> {
        Binding::new(
            Channel::Relay,
            ServiceId::new(ServiceKind::Switch),
            Characteristic::On,
        )
    }

    #[test]
    fn seed_reads_existing_value() {
        let (_, pipeline) = pipeline();
        let binding = relay();
        pipeline
            .accessory()
            .set_value(&binding.service, Characteristic::On, true);
        pipeline.seed(Channel::Relay, &binding.service, Characteristic::On);
        assert_eq!(pipeline.cached(&Channel::Relay), Some(CharValue::Bool(true)));
    }

    #[test]
    fn offline_reads_fail() {
        let (_, pipeline) = pipeline();
        let binding = relay();
        pipeline
            .accessory()
            .set_value(&binding.service, Characteristic::On, true);
        assert!(pipeline.read(&binding.service, Characteristic::On).is_ok());
        assert!(pipeline.mark_status(false));
        assert!(!pipeline.mark_status(false));
        assert!(matches!(
            pipeline.read(&binding.service, Characteristic::On),
            Err(Error::Unresponsive)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rolls_back_after_delay() {
        let (transport, pipeline) = pipeline();
        let binding = relay();
        pipeline.store(Channel::Relay, false);
        pipeline.update(&binding.service, Characteristic::On, true);
        transport.set_failing(true);

        let result = pipeline
            .dispatch_or_rollback(&DeviceParams::with_switch(SwitchState::On), &[binding.clone()])
            .await;
        assert!(matches!(result, Err(Error::Unresponsive)));

        let value = || pipeline.accessory().value(&binding.service, Characteristic::On);
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(value(), Some(CharValue::Bool(true)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(value(), Some(CharValue::Bool(false)));
        assert_eq!(pipeline.cached(&Channel::Relay), Some(CharValue::Bool(false)));
    }

    #[tokio::test]
    async fn send_quiet_swallows_errors() {
        let (transport, pipeline) = pipeline();
        transport.set_failing(true);
        assert!(!pipeline.send_quiet(&DeviceParams::default()).await);
        transport.set_failing(false);
        assert!(pipeline.send_quiet(&DeviceParams::default()).await);
    }
}
