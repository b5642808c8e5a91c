//! Heating control for Kjeller.
//!
//! One cycle refreshes the electricity price, decides a target temperature for
//! every configured room and writes it to the room's thermostat when it
//! differs. [`Daemon`] repeats that cycle until asked to stop.

mod clock;
mod controller;
mod daemon;
mod metrics;
mod prices;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{
    Controller, CycleReport, Decision, DecisionReason, RoomOutcome, SetpointAction, Thermostats,
    decide,
};
pub use daemon::{Daemon, DaemonError};
pub use metrics::{ExportError, render_sensor_metrics, write_price, write_sensor_metrics};
pub use prices::{PriceSource, PriceTracker};

pub use kjeller_config::{Config, ConfigError, RoomConfig};
pub use kjeller_providers::RetryConfig;
pub use kjeller_types::{PricePoint, SensorReading, Setpoint, Temperature};
