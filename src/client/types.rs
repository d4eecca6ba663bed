//! # Ingestion API Types
//!
//! Request and response bodies exchanged with the TruckTrace server. The
//! server is loosely typed, so every response field is optional.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::gps::LocationSample;

/// Body of `POST /api/hardware/gps`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub vehicle_name: String,
    #[serde(flatten)]
    pub sample: LocationSample,
}

impl RegistrationRequest {
    /// Onboarding request with placeholder position and zeroed motion
    ///
    /// A missing or blank vehicle name becomes `GPS Tracker <hardware_id>`.
    pub fn new(hardware_id: &str, vehicle_name: Option<&str>) -> Self {
        let vehicle_name = match vehicle_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("GPS Tracker {}", hardware_id),
        };
        Self {
            vehicle_name,
            sample: LocationSample::placeholder(hardware_id),
        }
    }
}

/// Body returned by a successful registration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegistrationResponse {
    #[serde(default)]
    pub vehicle_id: Option<Value>,
    #[serde(default)]
    pub signal_quality: Option<Value>,
}

/// Body of `GET /api/hardware/status`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HardwareStatus {
    #[serde(default)]
    pub hardware_connected: Option<bool>,
    #[serde(default)]
    pub recent_updates: Option<u64>,
    #[serde(default)]
    pub signal_quality: Option<Value>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub gps_vehicles: Vec<GpsVehicle>,
}

/// One GPS-equipped vehicle in the status report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GpsVehicle {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed_kph: Option<f64>,
    #[serde(default)]
    pub satellites: Option<u32>,
    #[serde(default)]
    pub recorded_at: Option<String>,
}

/// Render an optional JSON value the way the operator expects to read it
fn show_value(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn show<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(|| "None".to_string(), |v| v.to_string())
}

impl fmt::Display for HardwareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GPS Tracker Status:")?;
        writeln!(f, "   Hardware Connected: {}", show(&self.hardware_connected))?;
        writeln!(f, "   Recent Updates: {}", show(&self.recent_updates))?;
        writeln!(f, "   Signal Quality: {}", show_value(&self.signal_quality))?;
        writeln!(f, "   Last Update: {}", show(&self.last_update))?;

        if !self.gps_vehicles.is_empty() {
            writeln!(f)?;
            writeln!(f, "GPS Vehicles:")?;
            for vehicle in &self.gps_vehicles {
                write!(f, "{}", vehicle)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for GpsVehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   * {} ({})", show(&self.name), show(&self.plate))?;
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => writeln!(f, "     Location: {:.4}, {:.4}", lat, lon)?,
            _ => writeln!(f, "     Location: unknown")?,
        }
        writeln!(f, "     Speed: {} km/h", show(&self.speed_kph))?;
        writeln!(f, "     Satellites: {}", show(&self.satellites))?;
        writeln!(f, "     Last Update: {}", show(&self.recorded_at))?;
        writeln!(f)
    }
}

impl fmt::Display for RegistrationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Vehicle ID: {}", show_value(&self.vehicle_id))?;
        writeln!(f, "   Signal Quality: {}", show_value(&self.signal_quality))
    }
}
