// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Staleness checks for sensor triggers.

use chrono::{DateTime, Utc};

/// Returns `true` if a trigger at `trig_time_ms` happened less than
/// `window_secs` before `now`.
///
/// Triggers stamped in the future (clock skew) count as fresh.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use accessory_sync::normalize::is_fresh;
///
/// let now = Utc.timestamp_millis_opt(1_700_000_120_000).unwrap();
/// assert!(is_fresh(1_700_000_001_000, now, 120));
/// assert!(!is_fresh(1_700_000_000_000, now, 120));
/// ```
#[must_use]
pub fn is_fresh(trig_time_ms: i64, now: DateTime<Utc>, window_secs: u64) -> bool {
    let age_ms = now.timestamp_millis().saturating_sub(trig_time_ms);
    let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    age_ms < window_ms
}

/// [`is_fresh`] against the current wall clock.
#[must_use]
pub fn is_fresh_now(trig_time_ms: i64, window_secs: u64) -> bool {
    is_fresh(trig_time_ms, Utc::now(), window_secs)
}

/// Current wall-clock time in epoch seconds.
#[must_use]
pub fn epoch_secs() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn boundary_is_stale() {
        assert!(!is_fresh(0, at(120_000), 120));
        assert!(is_fresh(1, at(120_000), 120));
    }

    #[test]
    fn future_triggers_are_fresh() {
        assert!(is_fresh(200_000, at(100_000), 1));
    }

    #[test]
    fn zero_window_rejects_everything_past() {
        assert!(!is_fresh(100_000, at(100_000), 0));
    }

    #[test]
    fn now_variant_accepts_current_time() {
        assert!(is_fresh_now(Utc::now().timestamp_millis(), 120));
    }
}
