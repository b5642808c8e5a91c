//! Prometheus textfile export.
//!
//! Each thermostat read produces `<dir>/<name>.prom` for the node exporter's
//! textfile collector:
//!
//! ```text
//! deconz_temperature{name="bad"} 21.5
//! deconz_floortemperature{name="bad"} 24.33
//! deconz_heatsetpoint{name="bad"} 22.0
//! deconz_heating{name="bad"} 1
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kjeller_types::SensorReading;
use kjeller_utils::atomic_write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Render the four gauges for one thermostat. `name` is used lowercased.
#[must_use]
pub fn render_sensor_metrics(reading: &SensorReading) -> String {
    let label = escape_label(&reading.name.to_lowercase());
    let samples = [
        ("deconz_temperature", format_sample(reading.temperature_celsius())),
        (
            "deconz_floortemperature",
            format_sample(reading.floor_temperature_celsius()),
        ),
        (
            "deconz_heatsetpoint",
            format_sample(reading.heat_setpoint.celsius()),
        ),
        ("deconz_heating", u8::from(reading.heating).to_string()),
    ];

    let mut out = String::new();
    for (metric, value) in samples {
        let _ = writeln!(out, "{metric}{{name=\"{label}\"}} {value}");
    }
    out
}

/// Write the metrics file for `reading` into `dir`.
///
/// Returns `Ok(None)` without touching the filesystem when the sensor has no name.
pub fn write_sensor_metrics(
    dir: &Path,
    reading: &SensorReading,
) -> Result<Option<PathBuf>, ExportError> {
    let name = reading.name.trim().to_lowercase();
    if name.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(format!("{}.prom", file_stem(&name)));
    atomic_write(&path, render_sensor_metrics(reading).as_bytes()).map_err(|source| {
        ExportError::Write {
            path: path.clone(),
            source,
        }
    })?;
    Ok(Some(path))
}

/// Write the current price as decimal text, formatted like the metric samples.
pub fn write_price(path: &Path, price: f64) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    atomic_write(path, format_sample(price).as_bytes()).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Python-style float rendering: integral values keep a trailing `.0`.
fn format_sample(value: f64) -> String {
    format!("{value:?}")
}

fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// Keep file names inside the metrics directory.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
