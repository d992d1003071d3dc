// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cancellable one-shot timers for simulated devices.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// A single pending action that can be re-armed or cancelled.
///
/// Arming replaces whatever was pending. When the countdown expires the
/// timer detaches from its slot before running the action, so the action may
/// itself re-arm or cancel the same timer. A running action is never
/// aborted.
///
/// Cloning yields another handle to the same slot.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use accessory_sync::sync::ArmedTimer;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let timer = ArmedTimer::new();
/// timer.arm(Duration::from_secs(60), async {});
/// assert!(timer.is_armed());
/// timer.cancel();
/// assert!(!timer.is_armed());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArmedTimer {
    slot: Arc<Mutex<Slot>>,
}

impl ArmedTimer {
    /// Creates an idle timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` after `delay`, replacing any pending action.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::clone(&self.slot);
        let mut guard = self.slot.lock();
        guard.generation = guard.generation.wrapping_add(1);
        let generation = guard.generation;
        if let Some(previous) = guard.handle.take() {
            previous.abort();
        }
        guard.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = slot.lock();
                if slot.generation != generation {
                    return;
                }
                // Detach; dropping a JoinHandle does not abort the task.
                slot.handle = None;
            }
            action.await;
        }));
    }

    /// Drops the pending action, if any.
    pub fn cancel(&self) {
        let mut guard = self.slot.lock();
        guard.generation = guard.generation.wrapping_add(1);
        if let Some(handle) = guard.handle.take() {
            handle.abort();
        }
    }

    /// Returns `true` while an action is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.lock().handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = ArmedTimer::new();
        let counter = Arc::clone(&fired);
        timer.arm(Duration::from_secs(2), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_pending_action() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = ArmedTimer::new();
        for value in [1, 10] {
            let counter = Arc::clone(&fired);
            timer.arm(Duration::from_secs(5), async move {
                counter.fetch_add(value, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = ArmedTimer::new();
        let counter = Arc::clone(&fired);
        timer.arm(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn action_can_rearm_its_own_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = ArmedTimer::new();
        let inner = timer.clone();
        let counter = Arc::clone(&fired);
        timer.arm(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = Arc::clone(&counter);
            inner.arm(Duration::from_secs(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
