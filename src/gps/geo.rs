//! # Great-Circle Distance
//!
//! Haversine distance on a spherical Earth.

/// Earth radius in metres, matching the TinyGPS++ `distanceBetween` used by
/// the tracker firmware so host and device odometers agree.
pub const EARTH_RADIUS_M: f64 = 6_372_795.0;

/// Great-circle distance in metres between two WGS84 points given in degrees.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Degrees of latitude spanning `metres` along a meridian.
pub fn metres_to_lat_deg(metres: f64) -> f64 {
    (metres / EARTH_RADIUS_M).to_degrees()
}
