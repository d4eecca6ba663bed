//! # Ingestion Client
//!
//! Typed calls against the TruckTrace HTTP API.
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | [`IngestionClient::health`] | GET | `/health` |
//! | [`IngestionClient::register`] | POST | `/api/hardware/gps` |
//! | [`IngestionClient::post_location`] | POST | `/api/locations` |
//! | [`IngestionClient::hardware_status`] | GET | `/api/hardware/status` |
//!
//! Every call is a single attempt. Any 2xx is success, any other status
//! becomes [`TrackerError::Status`], and transport failures surface as
//! [`TrackerError::Transport`].

use std::time::Duration;
use tracing::{debug, info, warn};

use super::transport::{HttpResponse, HttpTransport};
use super::types::{HardwareStatus, RegistrationRequest, RegistrationResponse};
use crate::config::ServerConfig;
use crate::error::{Result, TrackerError};
use crate::gps::LocationSample;

pub const HEALTH_PATH: &str = "/health";
pub const REGISTER_PATH: &str = "/api/hardware/gps";
pub const LOCATIONS_PATH: &str = "/api/locations";
pub const STATUS_PATH: &str = "/api/hardware/status";

/// Client for the TruckTrace ingestion and status endpoints
pub struct IngestionClient<T> {
    transport: T,
    base_url: String,
    health_timeout: Duration,
    request_timeout: Duration,
}

impl<T: HttpTransport> IngestionClient<T> {
    /// Create a client for the server described by `server`
    ///
    /// # Arguments
    ///
    /// * `transport` - HTTP implementation (reqwest in production, a mock in tests)
    /// * `server` - Base URL and timeouts; a trailing `/` on the URL is dropped
    pub fn new(transport: T, server: &ServerConfig) -> Self {
        Self {
            transport,
            base_url: server.base_url.trim().trim_end_matches('/').to_string(),
            health_timeout: server.health_timeout(),
            request_timeout: server.request_timeout(),
        }
    }

    /// Server base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(TrackerError::Status {
                status: response.status,
                body: response.body,
            })
        }
    }

    /// Check that the server is up
    pub async fn health(&self) -> Result<()> {
        let response = self.transport.get(&self.url(HEALTH_PATH), self.health_timeout).await?;
        Self::check(response)?;
        info!("Server at {} is healthy", self.base_url);
        Ok(())
    }

    /// Onboard a tracker with a placeholder position
    ///
    /// # Errors
    ///
    /// Returns error if the hardware id is blank, the server is unreachable,
    /// or the server rejects the registration.
    pub async fn register(&self, hardware_id: &str, vehicle_name: Option<&str>) -> Result<RegistrationResponse> {
        let hardware_id = require_hardware_id(hardware_id)?;
        let request = RegistrationRequest::new(hardware_id, vehicle_name);
        let body = serde_json::to_value(&request)?;

        let response = self
            .transport
            .post_json(&self.url(REGISTER_PATH), &body, self.request_timeout)
            .await?;
        let response = Self::check(response)?;

        let registration = serde_json::from_str(&response.body).unwrap_or_else(|e| {
            warn!("Registration response for {} was not JSON: {}", hardware_id, e);
            RegistrationResponse::default()
        });
        info!("Registered tracker {} as '{}'", hardware_id, request.vehicle_name);
        Ok(registration)
    }

    /// Transmit one location sample, returning the HTTP status on success
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Status`] for a non-2xx answer and
    /// [`TrackerError::Transport`] if the server could not be reached.
    pub async fn post_location(&self, sample: &LocationSample) -> Result<u16> {
        let body = serde_json::to_value(sample)?;
        debug!("Sending: {}", body);

        let response = self
            .transport
            .post_json(&self.url(LOCATIONS_PATH), &body, self.request_timeout)
            .await?;
        let response = Self::check(response)?;
        Ok(response.status)
    }

    /// Fetch the fleet hardware summary
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the status is not 2xx, or the
    /// body is not a status object.
    pub async fn hardware_status(&self) -> Result<HardwareStatus> {
        let response = self.transport.get(&self.url(STATUS_PATH), self.request_timeout).await?;
        let response = Self::check(response)?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Trim an operator-supplied hardware id and reject it if blank
pub fn require_hardware_id(hardware_id: &str) -> Result<&str> {
    let trimmed = hardware_id.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidInput("hardware id cannot be empty".to_string()));
    }
    Ok(trimmed)
}
