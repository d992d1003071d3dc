// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory event types.

use chrono::{DateTime, Utc};

use super::AccessoryId;
use crate::accessory::{CharValue, Characteristic, ServiceId};

/// A history sample, as recorded by activity-logging sinks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryEntry {
    /// A binary status (switch on, contact open, motion, leak).
    Status(bool),
    /// A temperature sample in degrees Celsius.
    Temperature(f64),
    /// A humidity sample in percent.
    Humidity(f64),
    /// Combined climate sample.
    Climate {
        /// Temperature in degrees Celsius.
        temperature: f64,
        /// Relative humidity in percent.
        humidity: f64,
    },
    /// A power sample in watts.
    Power(f64),
}

/// Events emitted by an accessory.
///
/// The host observes these to push values to the controller and to feed
/// history sinks.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessoryEvent {
    /// A characteristic value was pushed to the controller.
    CharacteristicUpdated {
        /// The accessory that changed.
        accessory: AccessoryId,
        /// The service holding the characteristic.
        service: ServiceId,
        /// The characteristic that changed.
        characteristic: Characteristic,
        /// The new value.
        value: CharValue,
    },

    /// A history sample was recorded.
    HistoryEntry {
        /// The accessory that recorded it.
        accessory: AccessoryId,
        /// When the sample was taken.
        time: DateTime<Utc>,
        /// The sample.
        entry: HistoryEntry,
    },

    /// The device went online or offline.
    StatusChanged {
        /// The accessory whose device changed status.
        accessory: AccessoryId,
        /// Whether the device is now reachable.
        online: bool,
    },
}

impl AccessoryEvent {
    /// Returns the accessory ID associated with this event.
    #[must_use]
    pub fn accessory_id(&self) -> AccessoryId {
        match self {
            Self::CharacteristicUpdated { accessory, .. }
            | Self::HistoryEntry { accessory, .. }
            | Self::StatusChanged { accessory, .. } => *accessory,
        }
    }

    /// Returns the updated characteristic and value, if this is an update.
    #[must_use]
    pub fn as_update(&self) -> Option<(&ServiceId, Characteristic, CharValue)> {
        match self {
            Self::CharacteristicUpdated {
                service,
                characteristic,
                value,
                ..
            } => Some((service, *characteristic, *value)),
            _ => None,
        }
    }

    /// Returns `true` for history samples.
    #[must_use]
    pub fn is_history(&self) -> bool {
        matches!(self, Self::HistoryEntry { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::ServiceKind;

    #[test]
    fn accessory_id_is_exposed_for_every_variant() {
        let id = AccessoryId::new();
        let events = [
            AccessoryEvent::StatusChanged {
                accessory: id,
                online: false,
            },
            AccessoryEvent::HistoryEntry {
                accessory: id,
                time: Utc::now(),
                entry: HistoryEntry::Status(true),
            },
        ];
        for event in events {
            assert_eq!(event.accessory_id(), id);
        }
    }

    #[test]
    fn as_update_extracts_value() {
        let event = AccessoryEvent::CharacteristicUpdated {
            accessory: AccessoryId::new(),
            service: ServiceId::new(ServiceKind::Fan),
            characteristic: Characteristic::On,
            value: CharValue::Bool(true),
        };
        let (service, ch, value) = event.as_update().unwrap();
        assert_eq!(service.kind(), ServiceKind::Fan);
        assert_eq!(ch, Characteristic::On);
        assert_eq!(value, CharValue::Bool(true));
        assert!(!event.is_history());
    }
}
