use crate::Setpoint;

/// Snapshot of a deCONZ thermostat.
///
/// Temperatures are in hundredths of a degree, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    pub name: String,
    pub temperature: i32,
    pub floor_temperature: i32,
    pub heat_setpoint: Setpoint,
    pub heating: bool,
}

impl SensorReading {
    #[must_use]
    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature) / 100.0
    }

    #[must_use]
    pub fn floor_temperature_celsius(&self) -> f64 {
        f64::from(self.floor_temperature) / 100.0
    }
}
