//! # Serial Communication Module
//!
//! Handles the serial link to a GPS receiver.
//!
//! This module handles:
//! - Opening the receiver's serial port (8N1, 9600 baud by default)
//! - Auto-detecting the device when no port is configured
//! - Exposing the port as a line reader for the NMEA decoder

use tokio::io::BufReader;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::GpsConfig;
use crate::error::{Result, TrackerError};

/// Default GPS device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (u-blox, NEO-6M breakouts)
    "/dev/ttyACM0", // USB CDC receivers
    "/dev/serial0", // Raspberry Pi UART
];

/// GPS receiver serial port handler
pub struct GpsSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for GpsSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl GpsSerial {
    /// Open the configured port, or auto-detect when none is configured
    ///
    /// # Errors
    ///
    /// Returns error if no GPS device could be opened
    pub fn open(config: &GpsConfig) -> Result<Self> {
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate)
        }
    }

    /// Open the first device path that succeeds
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Receiver baud rate
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened GPS receiver at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(TrackerError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TrackerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Buffered line reader over the port, ready for NMEA decoding
    pub fn into_reader(self) -> BufReader<tokio_serial::SerialStream> {
        BufReader::new(self.port)
    }
}
