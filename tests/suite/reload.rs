//! Configuration loading and hot reload

use kjeller_config::ConfigError;
use kjeller_engine::{Daemon, DaemonError, FixedClock, Setpoint, SetpointAction};

use crate::common::{
    Fixture, NOW, TWO_ROOMS, at, expect_setpoint, flat_prices, mount_sensor, mount_tibber, write,
};

#[tokio::test]
async fn missing_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = Daemon::with_clock(dir.path().join("absent.yaml"), FixedClock(at(NOW)));
    assert!(matches!(
        result,
        Err(DaemonError::Config(ConfigError::Read { .. }))
    ));
}

#[tokio::test]
async fn malformed_first_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    write(&path, "global: [\n");
    let result = Daemon::with_clock(&path, FixedClock(at(NOW)));
    assert!(matches!(
        result,
        Err(DaemonError::Config(ConfigError::Parse { .. }))
    ));
}

#[tokio::test]
async fn broken_reload_keeps_last_good_config() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(1.0)).await;
    mount_sensor(&fx.deconz, "1", "Bad", 2000).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;
    expect_setpoint(&fx.deconz, "1", 2300, 1).await;

    let mut daemon = fx.daemon();
    write(&fx.config_path(), "room: {{{ not yaml");

    assert!(!daemon.reload());
    let report = daemon.run_once().await;

    assert_eq!(report.rooms.len(), 2);
    assert_eq!(daemon.config().rooms[0].name, "Bad");
}

#[tokio::test]
async fn reload_applies_edited_config() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(1.0)).await;
    mount_sensor(&fx.deconz, "1", "Bad", 2000).await;
    expect_setpoint(&fx.deconz, "1", 2300, 1).await;
    expect_setpoint(&fx.deconz, "1", 2200, 1).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;

    let mut daemon = fx.daemon();
    daemon.run_once().await;

    fx.write_config(
        r#"  - name: Bad
    uniqueid: 1
    temperature: 22
    schedule:
      sunday: ["06:00-22:00"]
"#,
    );
    let report = daemon.run_once().await;

    assert_eq!(report.rooms.len(), 1);
    assert_eq!(
        report.rooms[0].action,
        SetpointAction::Written(Setpoint::from_raw(2200))
    );
}
