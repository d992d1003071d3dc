// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared platform context and cross-accessory links.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::accessory::Accessory;
use crate::config::{DeviceOptions, PlatformConfig};
use crate::protocol::Transport;
use crate::sync::CommandPipeline;

/// An accessory that follows a contact sensor.
///
/// Contact sensors call this on every open/close transition for each relay
/// configured with a matching `sensor_id` and `show_as` of lock or garage.
pub trait ContactLinked: Send + Sync {
    /// Applies a contact transition.
    ///
    /// # Arguments
    ///
    /// * `open` - `true` when the contact opened
    /// * `log_change` - Whether the sensor logged the transition itself
    fn contact_changed(&self, open: bool, log_change: bool);
}

/// Registry of accessories reachable by contact fan-out, keyed by device id.
///
/// Entries are weak so a dropped adapter simply stops being driven.
#[derive(Default)]
pub struct LinkTable {
    targets: RwLock<HashMap<String, Weak<dyn ContactLinked>>>,
}

impl LinkTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a target, replacing any previous one for the same id.
    pub fn register<L>(&self, device_id: impl Into<String>, target: &Arc<L>)
    where
        L: ContactLinked + 'static,
    {
        let weak = Arc::downgrade(target);
        let weak: Weak<dyn ContactLinked> = weak;
        self.targets.write().insert(device_id.into(), weak);
    }

    /// Removes a target. Returns `true` if one was registered.
    pub fn unregister(&self, device_id: &str) -> bool {
        self.targets.write().remove(device_id).is_some()
    }

    /// Returns the live target for a device id.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<Arc<dyn ContactLinked>> {
        self.targets.read().get(device_id).and_then(Weak::upgrade)
    }

    /// Returns the number of registered ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.read().is_empty()
    }
}

impl fmt::Debug for LinkTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self.targets.read();
        f.debug_struct("LinkTable")
            .field("targets", &targets.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything an adapter needs from its host: transport, configuration and
/// the shared link table.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use accessory_sync::config::PlatformConfig;
/// use accessory_sync::manager::Platform;
/// use accessory_sync::protocol::RecordingTransport;
///
/// let platform = Platform::new(Arc::new(RecordingTransport::new()), PlatformConfig::new());
/// assert!(platform.links().is_empty());
/// ```
pub struct Platform<T> {
    transport: Arc<T>,
    config: Arc<PlatformConfig>,
    links: Arc<LinkTable>,
}

impl<T: Transport> Platform<T> {
    /// Creates a platform with an empty link table.
    #[must_use]
    pub fn new(transport: Arc<T>, config: PlatformConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            links: Arc::new(LinkTable::new()),
        }
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns the platform configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<PlatformConfig> {
        &self.config
    }

    /// Returns the link table.
    #[must_use]
    pub fn links(&self) -> &Arc<LinkTable> {
        &self.links
    }

    /// Resolves the options for an accessory's device.
    #[must_use]
    pub fn options(&self, accessory: &Accessory) -> DeviceOptions {
        DeviceOptions::resolve(&self.config, &accessory.device_id())
    }

    pub(crate) fn pipeline<K>(
        &self,
        accessory: Arc<Accessory>,
        options: &DeviceOptions,
    ) -> CommandPipeline<T, K>
    where
        K: Eq + Hash + Clone + Send + 'static,
    {
        CommandPipeline::new(
            Arc::clone(&self.transport),
            accessory,
            options.log,
            options.disable_no_response,
        )
    }
}

impl<T> Clone for Platform<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            links: Arc::clone(&self.links),
        }
    }
}

impl<T> fmt::Debug for Platform<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("config", &self.config)
            .field("links", &self.links)
            .finish_non_exhaustive()
    }
}
