// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The device-facing side of the synchronization layer.
//!
//! Adapters never talk to the network directly. They build a
//! [`DeviceParams`] and hand it to a [`Transport`], which the host implements
//! on top of its LAN or cloud connection.
//!
//! # Transports
//!
//! - [`Transport`]: the trait the host implements
//! - [`RecordingTransport`]: an in-memory transport that records every update
//!   and can be told to fail

mod params;
mod recording;

pub use params::{DeviceParams, OutletSwitch, RawValue, UiActive, UpdateSource};
pub use recording::RecordingTransport;

use std::future::Future;

use crate::accessory::Accessory;
use crate::error::{PushError, TransportError};

/// Acknowledgement returned by a device for an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceAck {
    /// The raw JSON body, `Null` when the device answered without one.
    body: serde_json::Value,
}

impl DeviceAck {
    /// Creates an acknowledgement with the given body.
    #[must_use]
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }

    /// Returns the raw JSON body.
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Parses the body as device parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the body is not a parameter object.
    pub fn params(&self) -> Result<DeviceParams, PushError> {
        DeviceParams::from_json(self.body.clone())
    }
}

/// Sends parameter updates to a physical device.
///
/// The returned future must be `Send`: adapters await it from spawned timer
/// and polling tasks. Implementations may simply write `async fn`.
///
/// # Examples
///
/// ```
/// use accessory_sync::accessory::Accessory;
/// use accessory_sync::error::TransportError;
/// use accessory_sync::protocol::{DeviceAck, DeviceParams, Transport};
///
/// struct Offline;
///
/// impl Transport for Offline {
///     async fn send_device_update(
///         &self,
///         _accessory: &Accessory,
///         _params: &DeviceParams,
///     ) -> Result<DeviceAck, TransportError> {
///         Err(TransportError::Offline)
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Sends an update to the device behind `accessory`.
    ///
    /// # Arguments
    ///
    /// * `accessory` - The accessory whose device should receive the update
    /// * `params` - The parameters to send
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the device could not be reached or
    /// rejected the update.
    fn send_device_update(
        &self,
        accessory: &Accessory,
        params: &DeviceParams,
    ) -> impl Future<Output = Result<DeviceAck, TransportError>> + Send;
}
