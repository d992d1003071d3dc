// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory identifier type.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Stable identifier of an accessory.
///
/// Distinct from the protocol's device id string: the host persists it with
/// the accessory, so it survives restarts and re-pairing.
///
/// # Examples
///
/// ```
/// use accessory_sync::event::AccessoryId;
///
/// let id = AccessoryId::new();
/// let restored: AccessoryId = id.to_string().parse().unwrap();
/// assert_eq!(id, restored);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AccessoryId(Uuid);

impl AccessoryId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccessoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.0.simple().to_string();
        write!(f, "AccessoryId({}..)", &full[..8])
    }
}

impl fmt::Display for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for AccessoryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(AccessoryId::new(), AccessoryId::new());
    }

    #[test]
    fn debug_is_shortened() {
        let uuid = Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap();
        assert_eq!(format!("{:?}", AccessoryId::from(uuid)), "AccessoryId(a1a2a3a4..)");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<AccessoryId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let uuid = Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap();
        let json = serde_json::to_string(&AccessoryId::from(uuid)).unwrap();
        assert_eq!(json, "\"a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8\"");
    }
}
