// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for accessory events.

use tokio::sync::broadcast;

use super::AccessoryEvent;

/// Buffered events per subscriber before the oldest are dropped.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fans accessory events out to any number of observers.
///
/// Cloning the bus shares the underlying channel. Publishing never blocks and
/// never fails: with no subscribers the event is dropped, and a subscriber
/// that falls more than the channel capacity behind receives
/// `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use accessory_sync::event::{AccessoryEvent, AccessoryId, EventBus};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
/// bus.publish(AccessoryEvent::StatusChanged {
///     accessory: AccessoryId::new(),
///     online: false,
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AccessoryEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AccessoryEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: AccessoryEvent) {
        // No receivers is not an error here.
        let _ = self.sender.send(event);
    }

    /// Publishes an event and returns how many receivers got it.
    #[must_use]
    pub fn publish_counted(&self, event: AccessoryEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
