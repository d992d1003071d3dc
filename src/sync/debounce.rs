// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trailing-edge debounce for continuous controller inputs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default settle window.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// A generation number handed out by [`DebounceGate::ticket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DebounceTicket(u64);

/// Collapses bursts of writes so only the last one is acted on.
///
/// Every call to [`settle`](Self::settle) takes a new generation, waits for
/// the window and then reports whether it is still the newest. Superseded
/// callers drop their work without dispatching or touching the cache.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use accessory_sync::sync::DebounceGate;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gate = DebounceGate::new(Duration::from_millis(1));
/// assert!(gate.settle().await);
/// # }
/// ```
#[derive(Debug)]
pub struct DebounceGate {
    generation: AtomicU64,
    window: Duration,
}

impl DebounceGate {
    /// Creates a gate with the given settle window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            generation: AtomicU64::new(0),
            window,
        }
    }

    /// Takes the next generation, superseding all earlier tickets.
    pub fn ticket(&self) -> DebounceTicket {
        DebounceTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns `true` if no newer ticket has been issued.
    #[must_use]
    pub fn is_current(&self, ticket: DebounceTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Waits out the window; returns `true` if this call is still the newest.
    pub async fn settle(&self) -> bool {
        let ticket = self.ticket();
        tokio::time::sleep(self.window).await;
        self.is_current(ticket)
    }

    /// Returns the settle window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn newer_ticket_supersedes() {
        let gate = DebounceGate::default();
        let first = gate.ticket();
        let second = gate.ticket();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
        assert!(second > first);
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_of_a_burst_settles() {
        let gate = Arc::new(DebounceGate::default());
        let mut handles = Vec::new();
        for _ in 0..5 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move { gate.settle().await }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results, [false, false, false, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_all_settle() {
        let gate = DebounceGate::default();
        assert!(gate.settle().await);
        assert!(gate.settle().await);
    }
}
