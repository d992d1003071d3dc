// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-in-time view of an adapter, for external queries.

use serde::Serialize;
use serde_json::{Map, Value};

/// A snapshot of an adapter's visible state.
///
/// Serializes as `{"services": [...], "<service>": {...}, ...}`.
///
/// # Examples
///
/// ```
/// use accessory_sync::state::StateSnapshot;
/// use serde_json::json;
///
/// let snapshot = StateSnapshot::new()
///     .with_service("fan", json!({"state": "on", "speed": "low"}));
/// assert_eq!(
///     snapshot.to_json(),
///     json!({"services": ["fan"], "fan": {"state": "on", "speed": "low"}})
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateSnapshot {
    services: Vec<String>,
    #[serde(flatten)]
    sections: Map<String, Value>,
}

impl StateSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service section.
    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>, state: Value) -> Self {
        self.insert(name, state);
        self
    }

    /// Adds or replaces a service section.
    pub fn insert(&mut self, name: impl Into<String>, state: Value) {
        let name = name.into();
        if !self.services.contains(&name) {
            self.services.push(name.clone());
        }
        self.sections.insert(name, state);
    }

    /// Adds a field to an existing section, creating it if needed.
    pub fn set_field(&mut self, service: &str, field: &str, value: Value) {
        if !self.sections.contains_key(service) {
            self.insert(service, Value::Object(Map::new()));
        }
        if let Some(Value::Object(section)) = self.sections.get_mut(service) {
            section.insert(field.to_string(), value);
        }
    }

    /// Returns the service names in insertion order.
    #[must_use]
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Returns one service section.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Returns the snapshot as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
