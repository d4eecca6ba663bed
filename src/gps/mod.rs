//! # GPS Module
//!
//! Position handling for a single tracker.
//!
//! This module handles:
//! - Decoding NMEA 0183 sentences into fixes
//! - Great-circle distance between fixes
//! - Noise-gated odometer accumulation
//! - Shaping the `LocationSample` wire record

pub mod geo;
pub mod nmea;
pub mod odometer;
pub mod sample;

pub use odometer::Odometer;
pub use sample::{GpsFix, LocationSample, SOURCE_TAG};
