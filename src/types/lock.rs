// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lock mechanism states.

use std::fmt;

/// Current and target state of a simulated lock.
///
/// The numeric values match the controller's `LockCurrentState` and
/// `LockTargetState` characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// The bolt is retracted.
    Unlocked,
    /// The bolt is engaged.
    Locked,
}

impl LockState {
    /// Returns the characteristic value (0 unsecured, 1 secured).
    #[must_use]
    pub const fn as_num(&self) -> i64 {
        match self {
            Self::Unlocked => 0,
            Self::Locked => 1,
        }
    }

    /// Reads a characteristic value; anything non-zero is locked.
    #[must_use]
    pub const fn from_num(value: i64) -> Self {
        if value == 0 { Self::Unlocked } else { Self::Locked }
    }

    /// Returns the label used in logs and snapshots.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
