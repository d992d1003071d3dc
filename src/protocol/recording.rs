// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory transport.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{DeviceAck, DeviceParams, Transport};
use crate::accessory::Accessory;
use crate::error::TransportError;

/// A [`Transport`] that records every update instead of sending it.
///
/// Useful for dry runs and for tests. Updates are recorded even when the
/// transport is set to fail, so callers can assert what was attempted.
///
/// # Examples
///
/// ```
/// use accessory_sync::protocol::RecordingTransport;
///
/// let transport = RecordingTransport::new();
/// transport.set_failing(true);
/// assert!(transport.sent().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, DeviceParams)>>,
    failing: AtomicBool,
    reply: Mutex<Option<serde_json::Value>>,
}

impl RecordingTransport {
    /// Creates a transport that acknowledges everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent updates fail with a timeout (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sets the body returned with every acknowledgement.
    pub fn set_reply(&self, body: serde_json::Value) {
        *self.reply.lock() = Some(body);
    }

    /// Returns all recorded updates, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<DeviceParams> {
        self.sent.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Returns the updates recorded for one device id.
    #[must_use]
    pub fn sent_to(&self, device_id: &str) -> Vec<DeviceParams> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| id == device_id)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Returns the most recent update.
    #[must_use]
    pub fn last(&self) -> Option<DeviceParams> {
        self.sent.lock().last().map(|(_, p)| p.clone())
    }

    /// Returns the number of recorded updates.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Forgets all recorded updates.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Transport for RecordingTransport {
    async fn send_device_update(
        &self,
        accessory: &Accessory,
        params: &DeviceParams,
    ) -> Result<DeviceAck, TransportError> {
        let device_id = accessory.device_id();
        tracing::trace!(device = %device_id, ?params, "recording device update");
        self.sent.lock().push((device_id, params.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout(5000));
        }
        let body = self.reply.lock().clone().unwrap_or_default();
        Ok(DeviceAck::new(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{Accessory, AccessoryContext};
    use crate::types::SwitchState;

    fn accessory() -> Accessory {
        Accessory::new("Test", AccessoryContext::new("1000abcd", 1))
    }

    #[tokio::test]
    async fn records_successful_updates() {
        let transport = RecordingTransport::new();
        let acc = accessory();
        let params = DeviceParams::with_switch(SwitchState::On);

        transport.send_device_update(&acc, &params).await.unwrap();

        assert_eq!(transport.count(), 1);
        assert_eq!(transport.last(), Some(params));
        assert_eq!(transport.sent_to("1000abcd").len(), 1);
    }

    #[tokio::test]
    async fn failing_still_records() {
        let transport = RecordingTransport::new();
        transport.set_failing(true);
        let acc = accessory();

        let result = transport
            .send_device_update(&acc, &DeviceParams::default())
            .await;

        assert_eq!(result, Err(TransportError::Timeout(5000)));
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test]
    async fn reply_body_is_returned() {
        let transport = RecordingTransport::new();
        transport.set_reply(serde_json::json!({"hundredDaysKwh": "000102"}));
        let acc = accessory();

        let ack = transport
            .send_device_update(&acc, &DeviceParams::default())
            .await
            .unwrap();

        assert_eq!(
            ack.params().unwrap().hundred_days_kwh.as_deref(),
            Some("000102")
        );
    }
}
