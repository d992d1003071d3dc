// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory accessory model.
//!
//! An [`Accessory`] is the controller-facing half of a device: a set of
//! services, each holding characteristic values, plus a persisted
//! [`AccessoryContext`]. Adapters write to it; the host observes it through
//! [`Accessory::subscribe`].
//!
//! # Examples
//!
//! ```
//! use accessory_sync::accessory::{
//!     Accessory, AccessoryContext, CharValue, Characteristic, ServiceId, ServiceKind,
//! };
//!
//! let accessory = Accessory::new("Desk Fan", AccessoryContext::new("1000aa", 34));
//! let fan = ServiceId::new(ServiceKind::Fan);
//! accessory.ensure_service(&fan);
//! accessory.update_characteristic(&fan, Characteristic::On, true);
//! assert_eq!(accessory.value(&fan, Characteristic::On), Some(CharValue::Bool(true)));
//! ```

mod context;
mod service;

pub use context::{AccessoryContext, SimulationKind};
pub use service::{CharValue, Characteristic, ServiceId, ServiceKind};

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::event::{AccessoryEvent, AccessoryId, EventBus, HistoryEntry};

type CharacteristicTable = BTreeMap<Characteristic, CharValue>;

/// A controller-facing accessory.
#[derive(Debug)]
pub struct Accessory {
    id: AccessoryId,
    name: String,
    context: RwLock<AccessoryContext>,
    services: RwLock<BTreeMap<ServiceId, CharacteristicTable>>,
    events: EventBus,
}

impl Accessory {
    /// Creates an accessory with no services.
    #[must_use]
    pub fn new(name: impl Into<String>, context: AccessoryContext) -> Self {
        Self::with_id(AccessoryId::new(), name, context)
    }

    /// Creates an accessory restored with a persisted id.
    #[must_use]
    pub fn with_id(id: AccessoryId, name: impl Into<String>, context: AccessoryContext) -> Self {
        Self {
            id,
            name: name.into(),
            context: RwLock::new(context),
            services: RwLock::new(BTreeMap::new()),
            events: EventBus::new(),
        }
    }

    /// Returns the accessory id.
    #[must_use]
    pub fn id(&self) -> AccessoryId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========== Context ==========

    /// Returns a copy of the persisted context.
    #[must_use]
    pub fn context(&self) -> AccessoryContext {
        self.context.read().clone()
    }

    /// Returns the protocol device id.
    #[must_use]
    pub fn device_id(&self) -> String {
        self.context.read().device_id.clone()
    }

    /// Returns the hardware model id.
    #[must_use]
    pub fn uiid(&self) -> u32 {
        self.context.read().uiid
    }

    /// Mutates the persisted context.
    pub fn update_context<R>(&self, f: impl FnOnce(&mut AccessoryContext) -> R) -> R {
        f(&mut self.context.write())
    }

    // ========== Services ==========

    /// Adds a service if missing. Returns `true` if it was added.
    pub fn ensure_service(&self, service: &ServiceId) -> bool {
        let mut services = self.services.write();
        if services.contains_key(service) {
            return false;
        }
        services.insert(service.clone(), CharacteristicTable::new());
        true
    }

    /// Removes a service. Returns `true` if it existed.
    pub fn remove_service(&self, service: &ServiceId) -> bool {
        self.services.write().remove(service).is_some()
    }

    /// Returns `true` if the service exists.
    #[must_use]
    pub fn has_service(&self, service: &ServiceId) -> bool {
        self.services.read().contains_key(service)
    }

    /// Returns the ids of all services, in stable order.
    #[must_use]
    pub fn services(&self) -> Vec<ServiceId> {
        self.services.read().keys().cloned().collect()
    }

    // ========== Characteristics ==========

    /// Returns the current value of a characteristic.
    #[must_use]
    pub fn value(&self, service: &ServiceId, characteristic: Characteristic) -> Option<CharValue> {
        self.services
            .read()
            .get(service)
            .and_then(|chars| chars.get(&characteristic).copied())
    }

    /// Stores a value without notifying the controller.
    ///
    /// Used for defaults and for values written by the controller itself.
    pub fn set_value(
        &self,
        service: &ServiceId,
        characteristic: Characteristic,
        value: impl Into<CharValue>,
    ) {
        self.services
            .write()
            .entry(service.clone())
            .or_default()
            .insert(characteristic, value.into());
    }

    /// Stores a value only if none is present. Returns the resulting value.
    pub fn set_default(
        &self,
        service: &ServiceId,
        characteristic: Characteristic,
        value: impl Into<CharValue>,
    ) -> CharValue {
        *self
            .services
            .write()
            .entry(service.clone())
            .or_default()
            .entry(characteristic)
            .or_insert(value.into())
    }

    /// Stores a value and pushes it to the controller.
    pub fn update_characteristic(
        &self,
        service: &ServiceId,
        characteristic: Characteristic,
        value: impl Into<CharValue>,
    ) {
        let value = value.into();
        self.set_value(service, characteristic, value);
        self.events.publish(AccessoryEvent::CharacteristicUpdated {
            accessory: self.id,
            service: service.clone(),
            characteristic,
            value,
        });
    }

    // ========== Events ==========

    /// Records a history sample stamped with the current time.
    pub fn record_history(&self, entry: HistoryEntry) {
        self.events.publish(AccessoryEvent::HistoryEntry {
            accessory: self.id,
            time: Utc::now(),
            entry,
        });
    }

    /// Announces an online/offline transition.
    pub fn publish_status(&self, online: bool) {
        self.events.publish(AccessoryEvent::StatusChanged {
            accessory: self.id,
            online,
        });
    }

    /// Subscribes to this accessory's events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AccessoryEvent> {
        self.events.subscribe()
    }

    /// Returns the accessory's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}
