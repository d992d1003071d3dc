// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Repair of persisted simulation context.
//!
//! A relay may have been set up as a different simulation in an earlier run.
//! Before an adapter reads its persisted fields it calls
//! [`ensure_simulation`] so stale values from the previous role are reset.

use crate::accessory::{AccessoryContext, SimulationKind};

/// Heater target used when none has been persisted.
pub const DEFAULT_HEATER_TARGET: f64 = 20.0;

/// What [`ensure_simulation`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// The context already matched.
    Unchanged,
    /// Missing fields were filled in.
    Initialised,
    /// The accessory switched role; its persisted state was reset.
    Reset {
        /// The previous role, if any.
        from: Option<SimulationKind>,
    },
}

/// Brings `ctx` in line with the `kind` of simulation about to run.
///
/// For heaters a missing target becomes 20 °C, and a role change also resets
/// the target to 20 °C.
pub fn ensure_simulation(ctx: &mut AccessoryContext, kind: SimulationKind) -> Migration {
    let mut result = Migration::Unchanged;

    if kind == SimulationKind::Heater && ctx.cache_target.is_none() {
        ctx.cache_target = Some(DEFAULT_HEATER_TARGET);
        result = Migration::Initialised;
    }

    if ctx.cache_type != Some(kind) {
        let from = ctx.cache_type.replace(kind);
        if kind == SimulationKind::Heater {
            ctx.cache_target = Some(DEFAULT_HEATER_TARGET);
        }
        result = Migration::Reset { from };
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_heater_gets_defaults() {
        let mut ctx = AccessoryContext::new("a", 1);
        let result = ensure_simulation(&mut ctx, SimulationKind::Heater);
        assert_eq!(result, Migration::Reset { from: None });
        assert_eq!(ctx.cache_type, Some(SimulationKind::Heater));
        assert_eq!(ctx.cache_target, Some(20.0));
    }

    #[test]
    fn existing_heater_keeps_target() {
        let mut ctx = AccessoryContext::new("a", 1);
        ctx.cache_type = Some(SimulationKind::Heater);
        ctx.cache_target = Some(23.5);
        assert_eq!(
            ensure_simulation(&mut ctx, SimulationKind::Heater),
            Migration::Unchanged
        );
        assert_eq!(ctx.cache_target, Some(23.5));
    }

    #[test]
    fn heater_with_missing_target_is_initialised() {
        let mut ctx = AccessoryContext::new("a", 1);
        ctx.cache_type = Some(SimulationKind::Heater);
        assert_eq!(
            ensure_simulation(&mut ctx, SimulationKind::Heater),
            Migration::Initialised
        );
        assert_eq!(ctx.cache_target, Some(20.0));
    }

    #[test]
    fn role_change_resets_target() {
        let mut ctx = AccessoryContext::new("a", 1);
        ctx.cache_type = Some(SimulationKind::Lock);
        ctx.cache_target = Some(27.0);
        let result = ensure_simulation(&mut ctx, SimulationKind::Heater);
        assert_eq!(
            result,
            Migration::Reset {
                from: Some(SimulationKind::Lock)
            }
        );
        assert_eq!(ctx.cache_target, Some(20.0));
    }

    #[test]
    fn non_heater_roles_leave_target_alone() {
        let mut ctx = AccessoryContext::new("a", 1);
        ctx.cache_target = Some(22.0);
        ensure_simulation(&mut ctx, SimulationKind::ValveFour);
        assert_eq!(ctx.cache_type, Some(SimulationKind::ValveFour));
        assert_eq!(ctx.cache_target, Some(22.0));
    }
}
