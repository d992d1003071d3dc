// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory Sync - state synchronization between channel/outlet devices and
//! accessory characteristics.
//!
//! Smart relays, sensors and remotes speak a flat protocol of switch arrays
//! and numeric readings. Home controllers see accessories made of services
//! and characteristics. This library keeps the two in step, in both
//! directions.
//!
//! # Supported Devices
//!
//! - **Relays**: single switches with power metering, fan controllers,
//!   thermostat probes
//! - **Simulations**: heater (hysteresis), lock (timed relock), four-valve
//!   irrigation (auto shut-off)
//! - **Sensors**: contact, leak, motion
//! - **Buttons**: stateless wireless buttons, RF bridge remotes
//!
//! # Guarantees
//!
//! - A controller write is sent first and confirmed after. If the device
//!   does not acknowledge it, the characteristic returns to its last
//!   confirmed value after two seconds and the write fails with
//!   [`Error::Unresponsive`].
//! - A push that repeats known state causes no characteristic update, no
//!   log line and no history entry.
//! - Continuous inputs (fan speed) are debounced; only the last value of a
//!   burst is sent.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use accessory_sync::accessory::{Accessory, AccessoryContext};
//! use accessory_sync::config::{DeviceConfig, PlatformConfig};
//! use accessory_sync::device::HeaterAdapter;
//! use accessory_sync::manager::Platform;
//! use accessory_sync::protocol::{DeviceParams, RecordingTransport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> accessory_sync::Result<()> {
//! let transport = Arc::new(RecordingTransport::new());
//! let platform = Platform::new(
//!     Arc::clone(&transport),
//!     PlatformConfig::new().with_device(DeviceConfig::new("1000th").with_target_range(10.0, 30.0)),
//! );
//! let accessory = Arc::new(Accessory::new("Bathroom", AccessoryContext::new("1000th", 15)));
//!
//! let heater = HeaterAdapter::new(&platform, accessory);
//! heater.set_target(22.0).await?;
//! heater.set_active(true).await?;
//!
//! // A cold reading switches the relay on.
//! heater
//!     .external_update(&DeviceParams::from_json(serde_json::json!({"currentTemperature": 19.5}))?)
//!     .await;
//! assert_eq!(transport.last().and_then(|p| p.switch), Some(accessory_sync::types::SwitchState::On));
//! heater.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Transports
//!
//! The library does not talk to devices itself. Implement
//! [`protocol::Transport`] for your LAN or cloud client; the bundled
//! [`protocol::RecordingTransport`] records updates for tests.

pub mod accessory;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod manager;
pub mod normalize;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod types;

pub use error::{ConfigError, Error, PushError, Result, TransportError, ValueError};
pub use manager::{AdapterKind, AdapterRegistry, DeviceAdapter, Platform};
pub use protocol::{DeviceAck, DeviceParams, Transport};
