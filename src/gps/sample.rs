//! # Fix and Sample Types
//!
//! `GpsFix` is what the receiver tells us; `LocationSample` is what the
//! ingestion endpoint receives.

use serde::{Deserialize, Serialize};

/// Source tag carried by every sample this tracker produces
pub const SOURCE_TAG: &str = "esp32_gps_enhanced";

/// Speed reported when the receiver has no valid speed
pub const DEFAULT_SPEED_KPH: f64 = 0.0;

/// Heading reported when the receiver has no valid course
pub const DEFAULT_HEADING_DEG: f64 = 0.0;

/// Satellite count reported when the receiver has none
pub const DEFAULT_SATELLITES: u32 = 0;

/// HDOP reported when the receiver has none (worst possible precision)
pub const DEFAULT_HDOP: f64 = 99.99;

/// Placeholder position used when onboarding a tracker (Times Square)
pub const PLACEHOLDER_LATITUDE: f64 = 40.7589;
pub const PLACEHOLDER_LONGITUDE: f64 = -73.9851;

/// One decoded receiver reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    /// Receiver reports the position as valid
    pub valid: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: Option<f64>,
    pub heading_deg: Option<f64>,
    pub satellites: Option<u32>,
    pub hdop: Option<f64>,
}

impl GpsFix {
    /// A valid fix at the given position with no motion or quality data
    pub fn valid(latitude: f64, longitude: f64) -> Self {
        Self {
            valid: true,
            latitude,
            longitude,
            speed_kph: None,
            heading_deg: None,
            satellites: None,
            hdop: None,
        }
    }

    /// A reading the receiver flagged as not usable
    pub fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::valid(0.0, 0.0)
        }
    }

    /// Attach speed over ground (km/h) and course (degrees)
    pub fn with_motion(mut self, speed_kph: f64, heading_deg: f64) -> Self {
        self.speed_kph = Some(speed_kph);
        self.heading_deg = Some(heading_deg);
        self
    }

    /// Attach satellite count and horizontal dilution of precision
    pub fn with_quality(mut self, satellites: u32, hdop: f64) -> Self {
        self.satellites = Some(satellites);
        self.hdop = Some(hdop);
        self
    }

    /// Valid flag set and both coordinates finite and in range
    pub fn is_usable(&self) -> bool {
        self.valid
            && self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// The record POSTed to `/api/locations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub hardware_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: f64,
    pub heading_deg: f64,
    pub odometer_km: f64,
    pub satellites: u32,
    pub hdop: f64,
    pub source: String,
}

impl LocationSample {
    /// Onboarding record: placeholder position, zeroed motion, nominal quality
    pub fn placeholder(hardware_id: &str) -> Self {
        Self {
            hardware_id: hardware_id.to_string(),
            latitude: PLACEHOLDER_LATITUDE,
            longitude: PLACEHOLDER_LONGITUDE,
            speed_kph: 0.0,
            heading_deg: 0.0,
            odometer_km: 0.0,
            satellites: 8,
            hdop: 1.2,
            source: SOURCE_TAG.to_string(),
        }
    }
}

/// Clamp speed to be non-negative, mapping NaN to the default
pub(crate) fn normalize_speed(speed_kph: f64) -> f64 {
    if speed_kph.is_finite() { speed_kph.max(0.0) } else { DEFAULT_SPEED_KPH }
}

/// Wrap a course into [0, 360)
pub(crate) fn normalize_heading(heading_deg: f64) -> f64 {
    if !heading_deg.is_finite() {
        return DEFAULT_HEADING_DEG;
    }
    let wrapped = heading_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
