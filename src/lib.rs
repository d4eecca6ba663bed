//! # TruckTrace Tracker Library
//!
//! GPS tracker client for the TruckTrace fleet telematics server.
//!
//! This library provides the pieces a tracker needs to report a vehicle's
//! position: NMEA decoding, a noise-gated odometer, the HTTP ingestion
//! client, synthetic test batches and ESP32 firmware generation.

pub mod client;
pub mod config;
pub mod error;
pub mod firmware;
pub mod gps;
pub mod menu;
pub mod reporter;
pub mod serial;
pub mod telemetry;
pub mod testdata;
