//! End-to-end control cycles against mocked Tibber and deCONZ servers

use std::fs::read_to_string;
use std::time::Duration;

use kjeller_engine::{DecisionReason, Setpoint, SetpointAction};
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    Fixture, TWO_ROOMS, expect_setpoint, flat_prices, mount_sensor, mount_tibber,
    mount_tibber_failure,
};

#[tokio::test]
async fn cheap_hour_follows_schedule() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(1.0)).await;
    mount_sensor(&fx.deconz, "1", "Bad", 2000).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;
    expect_setpoint(&fx.deconz, "1", 2300, 1).await;
    expect_setpoint(&fx.deconz, "2", 1500, 0).await;

    let report = fx.daemon().run_once().await;

    assert_eq!(report.price, Some(1.0));
    assert_eq!(report.rooms.len(), 2);
    assert_eq!(report.rooms[0].room, "Bad");
    assert_eq!(report.rooms[0].decision.reason, DecisionReason::Comfort);
    assert_eq!(report.rooms[0].previous, Some(Setpoint::from_raw(2000)));
    assert_eq!(
        report.rooms[0].action,
        SetpointAction::Written(Setpoint::from_raw(2300))
    );
    assert_eq!(report.rooms[1].decision.reason, DecisionReason::Night);
    assert_eq!(report.rooms[1].action, SetpointAction::Unchanged);
}

#[tokio::test]
async fn expensive_hour_drops_to_night_temperature() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(3.0)).await;
    mount_sensor(&fx.deconz, "1", "Bad", 2300).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;
    expect_setpoint(&fx.deconz, "1", 1500, 1).await;

    let report = fx.daemon().run_once().await;

    assert_eq!(report.rooms[0].decision.reason, DecisionReason::PriceCap);
    assert_eq!(report.rooms[0].decision.temperature, 15);
    assert_eq!(report.rooms[1].decision.reason, DecisionReason::PriceCap);
    assert_eq!(report.written(), 1);
}

#[tokio::test]
async fn exports_metrics_and_price_file() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(1.25)).await;
    mount_sensor(&fx.deconz, "1", "Bad", 2300).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;

    fx.daemon().run_once().await;

    let bad = read_to_string(fx.metrics_dir().join("bad.prom")).unwrap();
    assert_eq!(
        bad,
        "deconz_temperature{name=\"bad\"} 20.5\n\
         deconz_floortemperature{name=\"bad\"} 23.0\n\
         deconz_heatsetpoint{name=\"bad\"} 23.0\n\
         deconz_heating{name=\"bad\"} 0\n"
    );
    assert!(fx.metrics_dir().join("stue.prom").exists());
    assert_eq!(read_to_string(fx.price_file()).unwrap(), "1.25");
}

#[tokio::test]
async fn tibber_outage_falls_back_to_schedule() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber_failure(&fx.tibber).await;
    mount_sensor(&fx.deconz, "1", "Bad", 1000).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1000).await;
    expect_setpoint(&fx.deconz, "1", 2300, 1).await;
    expect_setpoint(&fx.deconz, "2", 1500, 1).await;

    let report = fx.daemon().run_once().await;

    assert_eq!(report.price, None);
    assert_eq!(report.written(), 2);
    assert!(!fx.price_file().exists());
}

#[tokio::test]
async fn unknown_sensor_is_still_written() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(1.0)).await;
    // Sensor 1 is not mounted: deCONZ answers 404.
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;
    expect_setpoint(&fx.deconz, "1", 2300, 1).await;

    let report = fx.daemon().run_once().await;

    assert_eq!(report.rooms[0].previous, None);
    assert_eq!(
        report.rooms[0].action,
        SetpointAction::Written(Setpoint::from_raw(2300))
    );
}

#[tokio::test]
async fn prices_are_fetched_once_per_day() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    Mock::given(method("POST"))
        .and(path("/gql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flat_prices(1.0)))
        .expect(1)
        .mount(&fx.tibber)
        .await;
    mount_sensor(&fx.deconz, "1", "Bad", 2300).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;

    let mut daemon = fx.daemon();
    daemon.run_once().await;
    let report = daemon.run_once().await;

    assert_eq!(report.price, Some(1.0));
    assert_eq!(report.written(), 0);
}

#[tokio::test]
async fn run_returns_when_shutdown_is_signalled() {
    let fx = Fixture::start().await;
    fx.write_config(TWO_ROOMS);
    mount_tibber(&fx.tibber, flat_prices(1.0)).await;
    mount_sensor(&fx.deconz, "1", "Bad", 2000).await;
    mount_sensor(&fx.deconz, "2", "Stue", 1500).await;
    expect_setpoint(&fx.deconz, "1", 2300, 1).await;

    let mut daemon = fx.daemon();
    timeout(Duration::from_secs(10), daemon.run(async {}))
        .await
        .expect("daemon should stop after the first cycle");
}
