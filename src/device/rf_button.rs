// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Learned RF remote buttons on an RF bridge.
//!
//! Each configured channel shows up as a momentary switch.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::accessory::{Accessory, CharValue, Characteristic, ServiceId, ServiceKind};
use crate::config::OptionsSummary;
use crate::error::{ConfigError, Result};
use crate::manager::Platform;
use crate::protocol::{DeviceParams, Transport};
use crate::state::StateSnapshot;
use crate::sync::{CommandPipeline, ROLLBACK_DELAY};

/// How long a pressed button stays on.
pub const PRESS_RELEASE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
struct Button {
    channel: u8,
    name: String,
    service: ServiceId,
}

/// Adapter for an RF remote.
#[derive(Debug)]
pub struct RfButtonAdapter<T> {
    pipeline: CommandPipeline<T, u8>,
    buttons: Vec<Button>,
}

impl<T: Transport> RfButtonAdapter<T> {
    /// Sets up one switch per configured button, all off.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoButtons` if the accessory has no buttons.
    pub fn new(platform: &Platform<T>, accessory: Arc<Accessory>) -> Result<Arc<Self>> {
        let options = platform.options(&accessory);
        let pipeline = platform.pipeline(Arc::clone(&accessory), &options);

        let configured = accessory.context().buttons;
        if configured.is_empty() {
            return Err(ConfigError::NoButtons(accessory.name().to_string()).into());
        }
        let buttons: Vec<Button> = configured
            .into_iter()
            .map(|(channel, name)| {
                let service = ServiceId::with_subtype(ServiceKind::Switch, format!("switch{channel}"));
                accessory.ensure_service(&service);
                accessory.update_characteristic(&service, Characteristic::On, false);
                Button {
                    channel,
                    name,
                    service,
                }
            })
            .collect();

        OptionsSummary::new(accessory.name(), options.log)
            .with("buttons", buttons.len())
            .emit();

        Ok(Arc::new(Self { pipeline, buttons }))
    }

    /// Returns the accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<Accessory> {
        self.pipeline.accessory()
    }

    /// Returns the configured RF channels.
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.buttons.iter().map(|b| b.channel)
    }

    fn button(&self, channel: u8) -> Option<&Button> {
        self.buttons.iter().find(|b| b.channel == channel)
    }

    /// Handles an `On` write for a button.
    ///
    /// Turning a button on transmits its RF code; the switch turns itself
    /// off again a second later. Unknown channels and `false` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` if the bridge did not accept the
    /// command; the switch turns off after two seconds.
    pub async fn press(&self, channel: u8, on: bool) -> Result<()> {
        let Some(button) = self.button(channel) else {
            return Ok(());
        };
        self.accessory()
            .set_value(&button.service, Characteristic::On, on);
        if !on {
            return Ok(());
        }

        if let Err(err) = self
            .pipeline
            .dispatch(&DeviceParams::rf_transmit(channel))
            .await
        {
            self.pipeline
                .update_after(ROLLBACK_DELAY, button.service.clone(), Characteristic::On, false);
            return Err(err);
        }
        if self.pipeline.log().enabled {
            tracing::info!(accessory = %self.pipeline.name(), button = %button.name, "button pressed");
        }
        self.pipeline
            .update_after(PRESS_RELEASE, button.service.clone(), Characteristic::On, false);
        Ok(())
    }

    /// Reads a button's `On` value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unresponsive` while offline, or
    /// `ValueError::UnknownCharacteristic` for an unknown channel.
    pub fn get(&self, channel: u8) -> Result<CharValue> {
        let service = self.button(channel).map_or_else(
            || ServiceId::with_subtype(ServiceKind::Switch, format!("switch{channel}")),
            |b| b.service.clone(),
        );
        self.pipeline.read(&service, Characteristic::On)
    }

    /// RF bridges push nothing the buttons track.
    pub fn external_update(&self, params: &DeviceParams) {
        if self.pipeline.log().debug {
            tracing::debug!(accessory = %self.pipeline.name(), ?params, "ignoring push");
        }
    }

    /// Marks the bridge online or offline.
    pub fn mark_status(&self, online: bool) {
        self.pipeline.mark_status(online);
    }

    /// Returns a snapshot listing the buttons.
    #[must_use]
    pub fn current_state(&self) -> StateSnapshot {
        let names: Vec<_> = self
            .buttons
            .iter()
            .map(|b| json!({"channel": b.channel, "name": b.name}))
            .collect();
        StateSnapshot::new().with_service(ServiceKind::Switch.as_str(), json!({"buttons": names}))
    }

    /// Nothing runs in the background for remotes.
    pub fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::accessory::AccessoryContext;
    use crate::config::PlatformConfig;
    use crate::protocol::RecordingTransport;

    fn setup(
        context: AccessoryContext,
    ) -> (Arc<RecordingTransport>, Result<Arc<RfButtonAdapter<RecordingTransport>>>) {
        let transport = Arc::new(RecordingTransport::new());
        let platform = Platform::new(Arc::clone(&transport), PlatformConfig::new());
        let accessory = Arc::new(Accessory::new("Remote", context));
        (transport, RfButtonAdapter::new(&platform, accessory))
    }

    fn remote() -> AccessoryContext {
        AccessoryContext::new("1000rf", 28)
            .with_button(0, "Up")
            .with_button(3, "Down")
    }

    #[test]
    fn remote_without_buttons_is_rejected() {
        let (_, result) = setup(AccessoryContext::new("1000rf", 28));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NoButtons(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn press_transmits_then_releases() {
        let (transport, adapter) = setup(remote());
        let adapter = adapter.unwrap();
        assert_eq!(adapter.channels().collect::<Vec<_>>(), vec![0, 3]);

        adapter.press(3, true).await.unwrap();
        assert_eq!(transport.last().unwrap(), DeviceParams::rf_transmit(3));
        assert_eq!(adapter.get(3).unwrap(), CharValue::Bool(true));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(adapter.get(3).unwrap(), CharValue::Bool(false));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_press_releases_after_two_seconds() {
        let (transport, adapter) = setup(remote());
        let adapter = adapter.unwrap();
        transport.set_failing(true);

        assert!(adapter.press(0, true).await.unwrap_err().is_unresponsive());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(adapter.get(0).unwrap(), CharValue::Bool(true));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(adapter.get(0).unwrap(), CharValue::Bool(false));
    }

    #[tokio::test]
    async fn release_write_sends_nothing() {
        let (transport, adapter) = setup(remote());
        adapter.unwrap().press(0, false).await.unwrap();
        assert_eq!(transport.count(), 0);
    }
}
