//! Core domain types for Kjeller.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod price;
mod schedule;
mod sensor;
mod temperature;

pub use price::{PRICE_SLOT_MINUTES, PricePoint, predict_hourly_consumption, price_at};
pub use schedule::{Schedule, ScheduleError, TimeWindow, Weekday, time_in_range};
pub use sensor::SensorReading;
pub use temperature::{
    DEFAULT_TEMPERATURE, MAX_SAFE_TEMPERATURE, MIN_SAFE_TEMPERATURE, Setpoint, Temperature,
};
