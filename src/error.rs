// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the accessory synchronization layer.
//!
//! Only [`Error::Unresponsive`] ever reaches the controller. The other
//! variants exist so callers inside the crate can log the underlying cause
//! before collapsing it.

use thiserror::Error;

/// Host status code reported for an unresponsive accessory.
pub const STATUS_NOT_RESPONDING: i32 = -70402;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The device did not acknowledge a command, or it is marked offline.
    #[error("accessory is not responding")]
    Unresponsive,

    /// Error occurred while sending a device update.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while interpreting a pushed payload.
    #[error("push error: {0}")]
    Push(#[from] PushError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Configuration could not be used.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns `true` if this is the uniform "not responding" error.
    #[must_use]
    pub fn is_unresponsive(&self) -> bool {
        matches!(self, Self::Unresponsive)
    }

    /// Maps the error to the status code the host framework expects.
    ///
    /// Every variant collapses to [`STATUS_NOT_RESPONDING`], the only
    /// failure the controller understands.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn status_code(&self) -> i32 {
        STATUS_NOT_RESPONDING
    }
}

/// Errors produced by a [`Transport`](crate::protocol::Transport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device did not answer in time.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The device is known to be offline.
    #[error("device is offline")]
    Offline,

    /// The device answered with a non-zero error code.
    #[error("device rejected the update (code {0})")]
    Rejected(i64),

    /// The connection to the device or cloud failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// Errors raised while normalizing an inbound push.
///
/// These never surface to the controller; the push is logged and dropped.
#[derive(Debug, Error)]
pub enum PushError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the payload.
    #[error("missing field in payload: {0}")]
    MissingField(&'static str),

    /// The payload has no entry for the requested outlet.
    #[error("no state for outlet {0}")]
    MissingOutlet(u8),

    /// Failed to interpret a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: &'static str,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// An invalid switch state string was provided.
    #[error("invalid switch state: {0}")]
    InvalidSwitchState(String),

    /// The characteristic does not belong to this accessory.
    #[error("unknown characteristic: {0}")]
    UnknownCharacteristic(String),
}

/// Errors related to device configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An RF remote was created without any configured buttons.
    #[error("no buttons configured for {0}")]
    NoButtons(String),

    /// The device is already registered.
    #[error("device {0} is already registered")]
    DuplicateDevice(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresponsive_maps_to_host_status() {
        assert_eq!(Error::Unresponsive.status_code(), -70402);
        assert!(Error::Unresponsive.is_unresponsive());
    }

    #[test]
    fn transport_error_collapses_to_same_status() {
        let err: Error = TransportError::Timeout(5000).into();
        assert!(!err.is_unresponsive());
        assert_eq!(err.status_code(), STATUS_NOT_RESPONDING);
    }

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0.0,
            max: 100.0,
            actual: 150.0,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn push_error_display() {
        let err = PushError::MissingOutlet(2);
        assert_eq!(err.to_string(), "no state for outlet 2");
    }
}
