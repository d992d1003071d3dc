// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the device adapters.
//!
//! # Types
//!
//! - [`SwitchState`] - On/Off relay state as carried on the wire
//! - [`FanSpeed`] - Three-step fan speed (33/66/99)
//! - [`LockState`] - Locked/Unlocked for simulated locks
//! - [`HeaterState`] - Inactive/Idle/Heating for simulated heaters
//! - [`TargetRange`] - Allowed target temperature window

mod climate;
mod lock;
mod speed;
mod switch;

pub use climate::{HeaterState, TargetRange};
pub use lock::LockState;
pub use speed::FanSpeed;
pub use switch::SwitchState;
