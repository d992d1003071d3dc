// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic reporting requests.

use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::pipeline::CommandPipeline;
use crate::protocol::{DeviceParams, Transport};

/// Delay before the first request.
pub const POLL_DELAY: Duration = Duration::from_secs(5);

/// Interval between requests.
pub const POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Repeatedly asks a device to keep reporting.
///
/// Requests are skipped while the device is offline and failures are
/// swallowed. The task is aborted on [`Poller::stop`] or drop.
#[derive(Debug, Default)]
pub struct Poller {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Creates an idle poller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts sending `request` through `pipeline`, replacing any running task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T, K>(&self, pipeline: CommandPipeline<T, K>, request: DeviceParams)
    where
        T: Transport,
        K: Eq + Hash + Clone + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(POLL_DELAY).await;
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if pipeline.is_online() {
                    pipeline.send_quiet(&request).await;
                }
            }
        });
        if let Some(previous) = self.handle.lock().replace(task) {
            previous.abort();
        }
    }

    /// Stops polling.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Returns `true` while a polling task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::accessory::{Accessory, AccessoryContext};
    use crate::config::LogPolicy;
    use crate::protocol::{RecordingTransport, UiActive};

    fn pipeline(transport: &Arc<RecordingTransport>) -> CommandPipeline<RecordingTransport, u8> {
        let accessory = Arc::new(Accessory::new("Sensor", AccessoryContext::new("1000aa", 15)));
        CommandPipeline::new(Arc::clone(transport), accessory, LogPolicy::default(), false)
    }

    #[tokio::test(start_paused = true)]
    async fn polls_after_delay_then_on_interval() {
        let transport = Arc::new(RecordingTransport::new());
        let poller = Poller::new();
        poller.start(
            pipeline(&transport),
            DeviceParams::with_ui_active(UiActive::Seconds(120)),
        );

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(transport.count(), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(transport.count(), 1);
        tokio::time::sleep(POLL_INTERVAL).await;
        assert_eq!(transport.count(), 2);

        poller.stop();
        assert!(!poller.is_running());
        tokio::time::sleep(POLL_INTERVAL * 2).await;
        assert_eq!(transport.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_while_offline() {
        let transport = Arc::new(RecordingTransport::new());
        let pipeline = pipeline(&transport);
        pipeline.mark_status(false);
        let poller = Poller::new();
        poller.start(pipeline.clone(), DeviceParams::default());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(transport.count(), 0);

        pipeline.mark_status(true);
        tokio::time::sleep(POLL_INTERVAL).await;
        assert_eq!(transport.count(), 1);
    }
}
