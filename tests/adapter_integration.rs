// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for adapter behavior against a recording transport.

use std::sync::Arc;
use std::time::Duration;

use accessory_sync::accessory::{Accessory, AccessoryContext, CharValue, Characteristic, ServiceId, ServiceKind};
use accessory_sync::config::{DeviceConfig, PlatformConfig, ShowAs};
use accessory_sync::device::{
    FanAdapter, HeaterAdapter, LockAdapter, SensorContactAdapter, SwitchSingleAdapter,
    ValveAdapter, ValveSlot,
};
use accessory_sync::event::AccessoryEvent;
use accessory_sync::manager::{AdapterKind, AdapterRegistry, DeviceAdapter, Platform};
use accessory_sync::protocol::{DeviceParams, RecordingTransport};
use accessory_sync::types::{LockState, SwitchState};
use serde_json::json;
use tokio::sync::broadcast;

fn platform(config: PlatformConfig) -> (Arc<RecordingTransport>, Platform<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    (Arc::clone(&transport), Platform::new(transport, config))
}

fn accessory(name: &str, device_id: &str, uiid: u32) -> Arc<Accessory> {
    Arc::new(Accessory::new(name, AccessoryContext::new(device_id, uiid)))
}

fn drain(events: &mut broadcast::Receiver<AccessoryEvent>) -> Vec<AccessoryEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

fn push(payload: serde_json::Value) -> DeviceParams {
    DeviceParams::from_json(payload).unwrap()
}

// ============================================================================
// Change Detection
// ============================================================================

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn repeated_push_produces_one_update_and_one_history_entry() {
        let (_, platform) = platform(PlatformConfig::new());
        let switch = SwitchSingleAdapter::new(&platform, accessory("Lamp", "1000sw", 1));
        let mut events = switch.accessory().subscribe();

        let params = push(json!({"switch": "on", "updateSource": "LAN"}));
        switch.external_update(&params);
        switch.external_update(&params);

        let events = drain(&mut events);
        let updates = events.iter().filter(|e| e.as_update().is_some()).count();
        let history = events.iter().filter(|e| e.is_history()).count();
        assert_eq!(updates, 1);
        assert_eq!(history, 1);
    }

    #[tokio::test]
    async fn write_matching_cache_sends_nothing() {
        let (transport, platform) = platform(PlatformConfig::new());
        let switch = SwitchSingleAdapter::new(&platform, accessory("Lamp", "1000sw", 1));
        switch.external_update(&DeviceParams::with_switch(SwitchState::On));

        switch.set_on(true).await.unwrap();
        assert_eq!(transport.count(), 0);
    }
}

// ============================================================================
// Debounce
// ============================================================================

mod debounce {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_last_speed_of_a_burst_is_sent() {
        let (transport, platform) = platform(PlatformConfig::new());
        let fan = FanAdapter::new(&platform, accessory("Ceiling", "1000fn", 34));

        let mut handles = vec![];
        for percent in [20.0, 50.0, 99.0] {
            let fan = Arc::clone(&fan);
            handles.push(tokio::spawn(async move { fan.set_rotation_speed(percent).await }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(transport.count(), 1);
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_outlets([
                (1, SwitchState::On),
                (2, SwitchState::Off),
                (3, SwitchState::On),
            ])
        );
    }
}

// ============================================================================
// Rollback
// ============================================================================

mod rollback {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn failed_write_reverts_after_two_seconds() {
        let (transport, platform) = platform(PlatformConfig::new());
        let switch = SwitchSingleAdapter::new(&platform, accessory("Lamp", "1000sw", 1));
        transport.set_failing(true);

        let err = switch.set_on(true).await.unwrap_err();
        assert!(err.is_unresponsive());
        assert_eq!(err.status_code(), -70402);
        assert_eq!(switch.get(Characteristic::On).unwrap(), CharValue::Bool(true));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(switch.get(Characteristic::On).unwrap(), CharValue::Bool(true));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(switch.get(Characteristic::On).unwrap(), CharValue::Bool(false));

        // The cache never saw the failed value, so a retry is sent.
        transport.set_failing(false);
        switch.set_on(true).await.unwrap();
        assert_eq!(transport.count(), 2);
    }
}

// ============================================================================
// Heater
// ============================================================================

mod heater {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hysteresis_follows_readings() {
        let (transport, platform) = platform(PlatformConfig::new());
        let heater = HeaterAdapter::new(&platform, accessory("Office", "1000ht", 15));
        heater.set_target(22.0).await.unwrap();
        heater.set_active(true).await.unwrap();
        assert_eq!(transport.count(), 0);

        heater
            .external_update(&push(json!({"currentTemperature": 21})))
            .await;
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_main_switch(SwitchState::On)
        );

        heater
            .external_update(&push(json!({"currentTemperature": 23})))
            .await;
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_main_switch(SwitchState::Off)
        );

        heater
            .external_update(&push(json!({"currentTemperature": 23})))
            .await;
        assert_eq!(transport.count(), 2);
        heater.shutdown();
    }
}

// ============================================================================
// Lock
// ============================================================================

mod lock {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timed_relock_ignores_second_unlock() {
        let config = PlatformConfig::new().with_device(DeviceConfig::new("1000lk").with_operation_time(10));
        let (transport, platform) = platform(config);
        let lock = LockAdapter::new(&platform, accessory("Gate", "1000lk", 1));
        let current = || lock.get(Characteristic::LockCurrentState).unwrap().as_i64();

        lock.set_target(LockState::Unlocked).await.unwrap();
        assert_eq!(current(), LockState::Unlocked.as_num());

        tokio::time::sleep(Duration::from_millis(500)).await;
        lock.set_target(LockState::Unlocked).await.unwrap();
        assert_eq!(transport.count(), 1);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(current(), LockState::Unlocked.as_num());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(current(), LockState::Locked.as_num());
        assert!(!lock.is_in_use());
    }
}

// ============================================================================
// Valve
// ============================================================================

mod valve {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn shortened_duration_closes_sixty_seconds_after_change() {
        let (transport, platform) = platform(PlatformConfig::new());
        let valves = ValveAdapter::new(&platform, accessory("Garden", "1000vv", 4));

        valves.set_active(ValveSlot::A, true).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        valves.set_duration(ValveSlot::A, 60);
        assert_eq!(transport.count(), 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(
            valves.get(ValveSlot::A, Characteristic::Active).unwrap(),
            CharValue::Int(1)
        );
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            valves.get(ValveSlot::A, Characteristic::Active).unwrap(),
            CharValue::Int(0)
        );
        assert_eq!(
            transport.last().unwrap(),
            DeviceParams::with_outlets([(0, SwitchState::Off)])
        );
    }
}

// ============================================================================
// Sensors
// ============================================================================

mod sensors {
    use super::*;

    fn battery_level(adapter: &SensorContactAdapter<RecordingTransport>) -> i64 {
        adapter.get(Characteristic::BatteryLevel).unwrap().as_i64()
    }

    #[tokio::test]
    async fn voltage_battery_scales_to_percent() {
        let (_, platform) = platform(PlatformConfig::new());
        let door = SensorContactAdapter::new(&platform, accessory("Door", "1000dw", 102));
        door.external_update(&push(json!({"battery": 2.5})));
        assert_eq!(battery_level(&door), 50);
    }

    #[tokio::test]
    async fn tenths_battery_is_scaled_and_clamped() {
        let config =
            PlatformConfig::new().with_device(DeviceConfig::new("1000dw").with_scaled_battery());
        let (_, platform) = platform(config);
        let door = SensorContactAdapter::new(&platform, accessory("Door", "1000dw", 1770));
        door.external_update(&push(json!({"battery": 45})));
        assert_eq!(battery_level(&door), 100);
    }

    #[tokio::test]
    async fn contact_drives_linked_lock() {
        let config = PlatformConfig::new().with_device(
            DeviceConfig::new("1000lk")
                .with_sensor_id("1000dw")
                .with_show_as(ShowAs::Lock),
        );
        let (_, platform) = platform(config);
        let registry = AdapterRegistry::new(platform);
        let DeviceAdapter::Lock(lock) = registry
            .add(AdapterKind::Lock, accessory("Gate", "1000lk", 1))
            .unwrap()
        else {
            panic!("expected a lock adapter");
        };
        registry
            .add(AdapterKind::SensorContact, accessory("Gate sensor", "1000dw", 102))
            .unwrap();

        assert!(registry.push("1000dw", json!({"switch": "on"})).await);
        assert_eq!(
            lock.get(Characteristic::LockTargetState).unwrap(),
            CharValue::Int(0)
        );
        assert_eq!(lock.accessory().context().contact_detected, Some(false));

        assert!(registry.push("1000dw", json!({"switch": "off"})).await);
        assert_eq!(
            lock.get(Characteristic::LockCurrentState).unwrap(),
            CharValue::Int(1)
        );
        assert_eq!(lock.accessory().context().contact_detected, Some(true));
        registry.shutdown_all();
    }
}

// ============================================================================
// Offline Handling
// ============================================================================

mod offline {
    use super::*;

    #[tokio::test]
    async fn reads_fail_while_offline() {
        let (transport, platform) = platform(PlatformConfig::new());
        let switch = SwitchSingleAdapter::new(&platform, accessory("Lamp", "1000sw", 1));
        let mut events = switch.accessory().subscribe();

        switch.mark_status(false);
        assert!(switch.get(Characteristic::On).unwrap_err().is_unresponsive());
        assert_eq!(transport.count(), 0);
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            AccessoryEvent::StatusChanged { online: false, .. }
        )));

        switch.mark_status(true);
        assert!(switch.get(Characteristic::On).is_ok());
    }

    #[tokio::test]
    async fn offline_reads_allowed_when_configured() {
        let (_, platform) = platform(PlatformConfig::new().with_disable_no_response());
        let switch = SwitchSingleAdapter::new(&platform, accessory("Lamp", "1000sw", 1));
        switch.mark_status(false);
        assert_eq!(switch.get(Characteristic::On).unwrap(), CharValue::Bool(false));
    }

    #[tokio::test]
    async fn writes_are_attempted_while_offline() {
        let (transport, platform) = platform(PlatformConfig::new());
        let switch = SwitchSingleAdapter::new(&platform, accessory("Lamp", "1000sw", 1));
        switch.mark_status(false);
        switch.set_on(true).await.unwrap();
        assert_eq!(transport.count(), 1);
    }
}

// ============================================================================
// Snapshots
// ============================================================================

mod snapshots {
    use super::*;

    #[tokio::test]
    async fn registry_snapshot_lists_services() {
        let (_, platform) = platform(PlatformConfig::new());
        let registry = AdapterRegistry::new(platform);
        registry
            .add(AdapterKind::Fan, accessory("Ceiling", "1000fn", 34))
            .unwrap();

        let state = registry.current_state("1000fn").await.unwrap().to_json();
        assert_eq!(state["services"], json!(["fan", "light"]));
        assert_eq!(state["fan"]["state"], "off");
        assert!(registry.current_state("missing").await.is_none());

        let fan_service = ServiceId::new(ServiceKind::Fan);
        let DeviceAdapter::Fan(fan) = registry.get("1000fn").unwrap() else {
            panic!("expected a fan adapter");
        };
        assert_eq!(fan.get(&fan_service, Characteristic::On).unwrap(), CharValue::Bool(false));
    }
}
