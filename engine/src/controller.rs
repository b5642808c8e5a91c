//! Per-room heating decisions and one control cycle.

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use kjeller_config::{Config, RoomConfig};
use kjeller_providers::{DeconzClient, DeconzError};
use kjeller_types::{SensorReading, Setpoint, Temperature};

use crate::metrics::write_sensor_metrics;
use crate::prices::{PriceSource, PriceTracker};

/// Read and write access to thermostats.
pub trait Thermostats {
    fn read(&self, uniqueid: &str)
    -> impl Future<Output = Result<SensorReading, DeconzError>> + Send;

    fn write_setpoint(
        &self,
        uniqueid: &str,
        setpoint: Setpoint,
    ) -> impl Future<Output = Result<(), DeconzError>> + Send;
}

impl Thermostats for DeconzClient {
    fn read(
        &self,
        uniqueid: &str,
    ) -> impl Future<Output = Result<SensorReading, DeconzError>> + Send {
        self.sensor(uniqueid)
    }

    fn write_setpoint(
        &self,
        uniqueid: &str,
        setpoint: Setpoint,
    ) -> impl Future<Output = Result<(), DeconzError>> + Send {
        self.set_heat_setpoint(uniqueid, setpoint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Inside a schedule window and the price is acceptable.
    Comfort,
    /// Outside every schedule window.
    Night,
    /// The current price is at or above the room's cut-off.
    PriceCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub temperature: Temperature,
    pub reason: DecisionReason,
}

/// Pick the temperature a room should be held at right now.
///
/// The price cap wins over the schedule: an expensive hour inside a comfort
/// window still gets the night temperature.
#[must_use]
pub fn decide(
    config: &Config,
    room: &RoomConfig,
    prices: &PriceTracker,
    now: NaiveDateTime,
) -> Decision {
    if prices.exceeds_max_price(config.effective_max_price(room)) {
        tracing::info!(
            "{}: KWH {} NOK, and above maxprice",
            room.name,
            prices.current_price().unwrap_or_default()
        );
        return Decision {
            temperature: config.effective_night(room),
            reason: DecisionReason::PriceCap,
        };
    }

    if room.schedule.is_active(now) {
        Decision {
            temperature: config.effective_comfort(room),
            reason: DecisionReason::Comfort,
        }
    } else {
        Decision {
            temperature: config.effective_night(room),
            reason: DecisionReason::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointAction {
    /// The thermostat already had the wanted setpoint.
    Unchanged,
    Written(Setpoint),
    WriteFailed(Setpoint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomOutcome {
    pub room: String,
    pub decision: Decision,
    /// The thermostat's setpoint before this cycle, when it could be read.
    pub previous: Option<Setpoint>,
    pub action: SetpointAction,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleReport {
    pub price: Option<f64>,
    pub rooms: Vec<RoomOutcome>,
}

impl CycleReport {
    #[must_use]
    pub fn written(&self) -> usize {
        self.rooms
            .iter()
            .filter(|r| matches!(r.action, SetpointAction::Written(_)))
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.rooms
            .iter()
            .filter(|r| matches!(r.action, SetpointAction::WriteFailed(_)))
            .count()
    }
}

pub struct Controller<P, T> {
    prices: P,
    thermostats: T,
    tracker: PriceTracker,
}

impl<P: PriceSource, T: Thermostats> Controller<P, T> {
    pub fn new(prices: P, thermostats: T) -> Self {
        Self {
            prices,
            thermostats,
            tracker: PriceTracker::new(),
        }
    }

    /// Swap the clients after a configuration reload. Cached prices are kept.
    pub fn set_sources(&mut self, prices: P, thermostats: T) {
        self.prices = prices;
        self.thermostats = thermostats;
    }

    /// Make sure the room's thermostat targets `temperature`.
    ///
    /// The current setpoint is read first (exporting metrics on the way) and
    /// only written when its whole-degree value differs from the setpoint
    /// `temperature` maps to. An unreadable thermostat is always written.
    pub async fn ensure_temperature(
        &self,
        room: &RoomConfig,
        temperature: Temperature,
        metrics_dir: &Path,
    ) -> (Option<Setpoint>, SetpointAction) {
        let previous = match self.thermostats.read(&room.uniqueid).await {
            Ok(reading) => {
                if let Err(e) = write_sensor_metrics(metrics_dir, &reading) {
                    tracing::warn!("{}: failed to export metrics: {e}", room.name);
                }
                Some(reading.heat_setpoint)
            }
            Err(e) => {
                tracing::error!("{}: failed to read thermostat: {e}", room.name);
                None
            }
        };

        let wanted = Setpoint::from_temperature(temperature);
        if previous.map(Setpoint::whole_degrees) == Some(wanted.whole_degrees()) {
            return (previous, SetpointAction::Unchanged);
        }

        tracing::info!("{}: Setting new temperature {temperature}", room.name);
        match self.thermostats.write_setpoint(&room.uniqueid, wanted).await {
            Ok(()) => (previous, SetpointAction::Written(wanted)),
            Err(e) => {
                tracing::error!("{}: failed to set temperature: {e}", room.name);
                (previous, SetpointAction::WriteFailed(wanted))
            }
        }
    }

    /// Refresh prices, then decide and apply every room in configuration order.
    pub async fn run_cycle(&mut self, config: &Config, now: DateTime<FixedOffset>) -> CycleReport {
        self.tracker
            .refresh(&self.prices, now, config.tibber.price_file.as_deref())
            .await;

        let mut report = CycleReport {
            price: self.tracker.current_price(),
            rooms: Vec::with_capacity(config.rooms.len()),
        };

        for room in &config.rooms {
            let decision = decide(config, room, &self.tracker, now.naive_local());
            tracing::debug!(
                room = %room.name,
                temperature = decision.temperature,
                reason = ?decision.reason,
                "Decision"
            );
            let (previous, action) = self
                .ensure_temperature(room, decision.temperature, config.metrics_dir())
                .await;
            report.rooms.push(RoomOutcome {
                room: room.name.clone(),
                decision,
                previous,
                action,
            });
        }

        report
    }
}
