//! Temperatures and thermostat setpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whole degrees Celsius, as written in the configuration.
pub type Temperature = i32;

/// Used when neither the room nor the global section configures a temperature.
pub const DEFAULT_TEMPERATURE: Temperature = 10;

/// Requests at or below this are considered unsafe and replaced by [`Setpoint::FALLBACK`].
pub const MIN_SAFE_TEMPERATURE: Temperature = 5;
/// Requests at or above this are considered unsafe and replaced by [`Setpoint::FALLBACK`].
pub const MAX_SAFE_TEMPERATURE: Temperature = 25;

/// Thermostat target in hundredths of a degree, the unit deCONZ uses for
/// `heatsetpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Setpoint(i32);

impl Setpoint {
    /// 10 °C.
    pub const FALLBACK: Self = Self(1000);

    #[must_use]
    pub const fn from_raw(hundredths: i32) -> Self {
        Self(hundredths)
    }

    /// Convert a configured temperature into a setpoint, clamping requests
    /// outside the safe band to [`Setpoint::FALLBACK`].
    #[must_use]
    pub const fn from_temperature(temperature: Temperature) -> Self {
        if temperature <= MIN_SAFE_TEMPERATURE || temperature >= MAX_SAFE_TEMPERATURE {
            Self::FALLBACK
        } else {
            Self(temperature * 100)
        }
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Truncated to whole degrees.
    #[must_use]
    pub const fn whole_degrees(self) -> Temperature {
        self.0 / 100
    }

    #[must_use]
    pub fn celsius(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Setpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°C", self.celsius())
    }
}
