//! Shared test utilities and fixtures
//!
//! Mock Tibber and deCONZ servers plus a configuration writer pointing at them.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use kjeller_engine::{Daemon, FixedClock, RetryConfig};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "DECONZKEY";
pub const TOKEN: &str = "tibber-token";

/// Sunday 2024-03-10, half past noon, Central European winter time.
pub const NOW: &str = "2024-03-10T12:30:00+01:00";

pub fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

/// Tibber `today` list for 2024-03-10 where every hour costs `price`.
pub fn flat_prices(price: f64) -> serde_json::Value {
    let today: Vec<_> = (0..24)
        .map(|h| {
            let starts_at = format!("2024-03-10T{h:02}:00:00.000+01:00");
            json!({ "total": price, "startsAt": starts_at })
        })
        .collect();
    json!({
        "data": { "viewer": { "home": { "currentSubscription": { "priceInfo": {
            "current": today[12].clone(),
            "today": today
        }}}}}
    })
}

pub async fn mount_tibber(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/gql"))
        .and(header("authorization", "Bearer tibber-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_tibber_failure(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/gql"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(server)
        .await;
}

/// A thermostat named `name` currently set to `heatsetpoint` (hundredths of °C).
pub async fn mount_sensor(server: &MockServer, id: &str, name: &str, heatsetpoint: i32) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{API_KEY}/sensors/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": name,
            "type": "ZHAThermostat",
            "state": { "temperature": 2050, "floortemperature": 2300, "heating": false },
            "config": { "heatsetpoint": heatsetpoint }
        })))
        .mount(server)
        .await;
}

/// Expect exactly `times` writes of `heatsetpoint` to sensor `id`.
pub async fn expect_setpoint(server: &MockServer, id: &str, heatsetpoint: i32, times: u64) {
    Mock::given(method("PUT"))
        .and(path(format!("/api/{API_KEY}/sensors/{id}/config")))
        .and(body_json(json!({ "heatsetpoint": heatsetpoint })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "success": {} }])))
        .expect(times)
        .mount(server)
        .await;
}

/// Workspace for one test: config file, metrics dir and price file live here.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub tibber: MockServer,
    pub deconz: MockServer,
}

impl Fixture {
    pub async fn start() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            tibber: MockServer::start().await,
            deconz: MockServer::start().await,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.yaml")
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.dir.path().join("prom")
    }

    pub fn price_file(&self) -> PathBuf {
        self.dir.path().join("tibber")
    }

    /// Write a config with the given `room:` section.
    pub fn write_config(&self, rooms: &str) {
        write_config_at(self.dir.path(), &self.tibber.uri(), &self.deconz.uri(), rooms);
    }

    pub fn daemon(&self) -> Daemon<FixedClock> {
        Daemon::with_clock(self.config_path(), FixedClock(at(NOW)))
            .unwrap()
            .with_retry(RetryConfig::none())
    }
}

/// Write `dir/config.yaml` pointing at the given Tibber and deCONZ base URLs.
///
/// Metrics go to `dir/prom` and the price file to `dir/tibber`.
pub fn write_config_at(dir: &Path, tibber: &str, deconz: &str, rooms: &str) -> PathBuf {
    let yaml = format!(
        r#"global:
  debug: false
  sleep: 1
  lat: 59.91
  long: 10.75
  max_price: 2.5
  temperature: 21
  night_temperature: 15
  metrics_dir: "{metrics}"
tibber:
  access_token: {TOKEN}
  house_id: house-1
  endpoint: "{tibber}/gql"
  price_file: "{price_file}"
deconz:
  endpoint: "{deconz}"
  api_key: {API_KEY}
room:
{rooms}"#,
        metrics = dir.join("prom").display(),
        price_file = dir.join("tibber").display(),
    );
    let path = dir.join("config.yaml");
    write(&path, &yaml);
    path
}

pub fn write(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

/// A single room, always in its comfort window.
pub const ONE_ROOM: &str = r#"  - name: Bad
    uniqueid: 1
    schedule:
      sunday: ["00:00-23:59"]
"#;

/// Two rooms: Bad is in its comfort window at noon on Sunday, Stue is not.
pub const TWO_ROOMS: &str = r#"  - name: Bad
    uniqueid: 1
    temperature: 23
    schedule:
      sunday: ["06:00-22:00"]
  - name: Stue
    uniqueid: "2"
    schedule:
      sunday: ["06:00-09:00", "17:00-22:00"]
"#;
