//! # Odometer and Sample Builder
//!
//! Keeps the running position and distance total for one tracker and turns
//! each accepted fix into a [`LocationSample`].
//!
//! ## Noise Gate
//!
//! A stationary receiver wanders by a few metres between fixes. Distance is
//! only added when the hop from the previous fix exceeds [`NOISE_GATE_M`].
//! The previous position is replaced on every fix, gated or not, so the gate
//! always measures fix-to-fix movement rather than drift since the last
//! counted hop.
//!
//! ```
//! use trucktrace_tracker::gps::{GpsFix, Odometer};
//!
//! let mut odometer = Odometer::new("ESP32-001");
//! odometer.record_fix(&GpsFix::valid(40.7589, -73.9851));
//! let sample = odometer.record_fix(&GpsFix::valid(40.75899, -73.9851)).unwrap();
//! assert!((sample.odometer_km - 0.010).abs() < 0.002);
//! ```

use tracing::{debug, trace};

use super::geo::haversine_distance_m;
use super::sample::{
    normalize_heading, normalize_speed, GpsFix, LocationSample, DEFAULT_HDOP, DEFAULT_HEADING_DEG,
    DEFAULT_SATELLITES, DEFAULT_SPEED_KPH, SOURCE_TAG,
};

/// Minimum hop between consecutive fixes that counts as travel, in metres
pub const NOISE_GATE_M: f64 = 5.0;

/// Running position and distance state for one tracker
#[derive(Debug, Clone)]
pub struct Odometer {
    hardware_id: String,
    last_position: Option<(f64, f64)>,
    odometer_km: f64,
}

impl Odometer {
    /// Create an odometer at zero with no previous position
    ///
    /// # Arguments
    ///
    /// * `hardware_id` - Stable device identifier carried by every sample
    pub fn new(hardware_id: impl Into<String>) -> Self {
        Self {
            hardware_id: hardware_id.into(),
            last_position: None,
            odometer_km: 0.0,
        }
    }

    /// Device identifier this odometer reports for
    pub fn hardware_id(&self) -> &str {
        &self.hardware_id
    }

    /// Accumulated gated distance in kilometres
    pub fn odometer_km(&self) -> f64 {
        self.odometer_km
    }

    /// Latitude and longitude of the most recent accepted fix
    pub fn last_position(&self) -> Option<(f64, f64)> {
        self.last_position
    }

    /// Fold a fix into the running state and build the sample to transmit.
    ///
    /// Returns `None` for fixes the receiver did not flag valid or whose
    /// coordinates are unusable; such fixes leave the state untouched.
    pub fn record_fix(&mut self, fix: &GpsFix) -> Option<LocationSample> {
        if !fix.is_usable() {
            trace!("Skipping unusable fix for {}", self.hardware_id);
            return None;
        }

        if let Some((last_lat, last_lon)) = self.last_position {
            let dist_m = haversine_distance_m(last_lat, last_lon, fix.latitude, fix.longitude);
            if dist_m > NOISE_GATE_M {
                self.odometer_km += dist_m / 1000.0;
                debug!(
                    "{} moved {:.1} m, odometer now {:.3} km",
                    self.hardware_id, dist_m, self.odometer_km
                );
            } else {
                trace!("{} hop of {:.2} m below noise gate", self.hardware_id, dist_m);
            }
        }

        self.last_position = Some((fix.latitude, fix.longitude));

        let hdop = match fix.hdop {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => DEFAULT_HDOP,
        };

        Some(LocationSample {
            hardware_id: self.hardware_id.clone(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed_kph: normalize_speed(fix.speed_kph.unwrap_or(DEFAULT_SPEED_KPH)),
            heading_deg: normalize_heading(fix.heading_deg.unwrap_or(DEFAULT_HEADING_DEG)),
            odometer_km: self.odometer_km,
            satellites: fix.satellites.unwrap_or(DEFAULT_SATELLITES),
            hdop,
            source: SOURCE_TAG.to_string(),
        })
    }
}
