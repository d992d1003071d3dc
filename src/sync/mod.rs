// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timing and dispatch primitives shared by the device adapters.
//!
//! - [`CommandPipeline`]: optimistic writes with delayed rollback
//! - [`DebounceGate`]: last-writer-wins settling of rapid writes
//! - [`ArmedTimer`]: a cancellable, re-armable one-shot timer
//! - [`Poller`]: periodic reporting requests

mod debounce;
mod pipeline;
mod poll;
mod timer;

pub use debounce::{DEBOUNCE_WINDOW, DebounceGate, DebounceTicket};
pub use pipeline::{Binding, CommandPipeline, ROLLBACK_DELAY, SharedCache};
pub use poll::{POLL_DELAY, POLL_INTERVAL, Poller};
pub use timer::ArmedTimer;
