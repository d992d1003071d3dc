// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform context and adapter registry.
//!
//! A [`Platform`] bundles what every adapter is built from: the transport,
//! the platform configuration and the [`LinkTable`] used for contact sensor
//! fan-out. The [`AdapterRegistry`] owns the adapters of one platform and
//! routes inbound pushes and status changes to them by device id.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use accessory_sync::accessory::{Accessory, AccessoryContext};
//! use accessory_sync::config::{DeviceConfig, PlatformConfig, ShowAs};
//! use accessory_sync::manager::{AdapterKind, AdapterRegistry, Platform};
//! use accessory_sync::protocol::RecordingTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> accessory_sync::Result<()> {
//! let config = PlatformConfig::new().with_device(
//!     DeviceConfig::new("1000lk")
//!         .with_sensor_id("1000dw")
//!         .with_show_as(ShowAs::Lock),
//! );
//! let registry = AdapterRegistry::new(Platform::new(Arc::new(RecordingTransport::new()), config));
//!
//! let lock = Arc::new(Accessory::new("Gate", AccessoryContext::new("1000lk", 1)));
//! let door = Arc::new(Accessory::new("Gate sensor", AccessoryContext::new("1000dw", 102)));
//! registry.add(AdapterKind::Lock, lock)?;
//! registry.add(AdapterKind::SensorContact, door)?;
//!
//! // Opening the gate sensor shows the lock as unlocked.
//! registry.push("1000dw", serde_json::json!({"switch": "on"})).await;
//! let state = registry.current_state("1000lk").await.unwrap();
//! assert_eq!(state.service("lock").unwrap()["state"], "unlocked");
//!
//! registry.shutdown_all();
//! # Ok(())
//! # }
//! ```

mod platform;
mod registry;

pub use platform::{ContactLinked, LinkTable, Platform};
pub use registry::{AdapterKind, AdapterRegistry, DeviceAdapter};
