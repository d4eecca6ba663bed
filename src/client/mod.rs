//! # Ingestion Client Module
//!
//! HTTP access to the TruckTrace server.
//!
//! This module handles:
//! - Transport abstraction over `reqwest` (mockable in tests)
//! - Health check, tracker registration, location upload, status query
//! - Request and response body types

pub mod api;
pub mod transport;
pub mod types;

pub use api::IngestionClient;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{GpsVehicle, HardwareStatus, RegistrationRequest, RegistrationResponse};
