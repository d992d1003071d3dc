// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for accessory changes.
//!
//! Every characteristic update, history sample and online/offline transition
//! is published on the accessory's [`EventBus`]. The host subscribes to relay
//! values to the controller; tests subscribe to count updates.
//!
//! # Examples
//!
//! ```
//! use accessory_sync::accessory::{Accessory, AccessoryContext};
//!
//! let accessory = Accessory::new("Porch", AccessoryContext::new("1000aa", 1));
//! let mut rx = accessory.subscribe();
//! assert!(rx.try_recv().is_err());
//! ```

mod accessory_event;
mod accessory_id;
mod event_bus;

pub use accessory_event::{AccessoryEvent, HistoryEntry};
pub use accessory_id::AccessoryId;
pub use event_bus::EventBus;
