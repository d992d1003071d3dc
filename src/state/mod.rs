// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter state tracking.
//!
//! Every adapter keeps a [`StateCache`] of the last values it confirmed with
//! the device. Change detection goes through [`StateCache::apply`], which
//! returns `true` only when the value actually changed.
//!
//! # Examples
//!
//! ```
//! use accessory_sync::state::StateCache;
//! use accessory_sync::types::SwitchState;
//!
//! let mut cache = StateCache::new();
//! cache.set("relay", SwitchState::Off);
//!
//! // Applying the same value again is a no-op
//! assert!(!cache.apply("relay", SwitchState::Off));
//! assert!(cache.apply("relay", SwitchState::On));
//! ```

mod cache;
mod snapshot;

pub use cache::StateCache;
pub use snapshot::StateSnapshot;
