//! # Firmware Generator
//!
//! Emits Arduino source for an ESP32 with a serial GPS receiver. The
//! generated sketch applies the same odometer policy as [`crate::gps::Odometer`]
//! and posts the same JSON record to `/api/locations`.
//!
//! The sketch is the askama template `templates/tracker.ino`. String values
//! are escaped as C literals before rendering, so the template itself runs
//! with escaping turned off.

use askama::Template;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::gps::odometer::NOISE_GATE_M;
use crate::gps::sample::{DEFAULT_HDOP, DEFAULT_HEADING_DEG, DEFAULT_SATELLITES, DEFAULT_SPEED_KPH};
use crate::gps::SOURCE_TAG;

/// Everything that varies between generated sketches
#[derive(Debug, Clone)]
pub struct FirmwareParams {
    pub hardware_id: String,
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub server_ip: String,
    pub server_port: u16,
    pub interval_ms: u64,
    pub gps_baud: u32,
    pub generated_at: NaiveDateTime,
}

impl FirmwareParams {
    /// Take WiFi, server, cadence and baud settings from the configuration
    pub fn from_config(hardware_id: &str, config: &Config) -> Self {
        Self {
            hardware_id: hardware_id.trim().to_string(),
            wifi_ssid: config.firmware.wifi_ssid.clone(),
            wifi_password: config.firmware.wifi_password.clone(),
            server_ip: config.firmware.server_ip.clone(),
            server_port: config.firmware.server_port,
            interval_ms: config.reporting.interval_ms,
            gps_baud: config.gps.baud_rate,
            generated_at: chrono::Local::now().naive_local(),
        }
    }

    /// Ingestion URL the sketch posts to
    pub fn server_url(&self) -> String {
        format!("http://{}:{}/api/locations", self.server_ip, self.server_port)
    }

    /// Name of the generated sketch file
    pub fn file_name(&self) -> String {
        format!("trucktrace_gps_{}.ino", self.hardware_id)
    }

    fn validate(&self) -> Result<()> {
        let id = &self.hardware_id;
        if id.is_empty() {
            return Err(TrackerError::InvalidInput("hardware id cannot be empty".to_string()));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(TrackerError::InvalidInput(format!(
                "hardware id {:?} may only contain letters, digits, '-' and '_'",
                id
            )));
        }
        let ip = self.server_ip.trim();
        if ip.is_empty() || ip.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(TrackerError::InvalidInput(format!("invalid server address {:?}", self.server_ip)));
        }
        if self.server_port == 0 {
            return Err(TrackerError::InvalidInput("server port must be greater than 0".to_string()));
        }
        if self.interval_ms == 0 {
            return Err(TrackerError::InvalidInput("report interval must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Escape text for use inside a C string literal
///
/// Control characters become three-digit octal escapes, which C never
/// extends into a following digit.
pub fn escape_c_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_ascii_control() => escaped.push_str(&format!("\\{:03o}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Sketch source with every value already in C syntax
#[derive(Template)]
#[template(path = "tracker.ino", escape = "none")]
struct TrackerSketch<'a> {
    hardware_id: String,
    generated_at: String,
    wifi_ssid: String,
    wifi_password: String,
    server_url: String,
    gps_baud: u32,
    interval_ms: u64,
    noise_gate_m: String,
    default_speed: String,
    default_heading: String,
    default_satellites: u32,
    default_hdop: String,
    source_tag: &'a str,
}

impl TrackerSketch<'_> {
    fn new(params: &FirmwareParams) -> Self {
        Self {
            hardware_id: escape_c_string(&params.hardware_id),
            generated_at: params.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            wifi_ssid: escape_c_string(&params.wifi_ssid),
            wifi_password: escape_c_string(&params.wifi_password),
            server_url: escape_c_string(&params.server_url()),
            gps_baud: params.gps_baud,
            interval_ms: params.interval_ms,
            // Debug keeps the decimal point so C reads a double
            noise_gate_m: format!("{:?}", NOISE_GATE_M),
            default_speed: format!("{:?}", DEFAULT_SPEED_KPH),
            default_heading: format!("{:?}", DEFAULT_HEADING_DEG),
            default_satellites: DEFAULT_SATELLITES,
            default_hdop: format!("{:?}", DEFAULT_HDOP),
            source_tag: SOURCE_TAG,
        }
    }
}

/// Render the Arduino sketch for `params`
///
/// # Errors
///
/// Returns error if the parameters fail validation or the template cannot
/// be rendered.
pub fn render_firmware(params: &FirmwareParams) -> Result<String> {
    params.validate()?;
    Ok(TrackerSketch::new(params).render()?)
}

/// Render the sketch and write it to `dir`, returning the file path
pub fn write_firmware(params: &FirmwareParams, dir: &Path) -> Result<PathBuf> {
    let source = render_firmware(params)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(params.file_name());
    fs::write(&path, source)?;
    info!("Arduino code generated: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params() -> FirmwareParams {
        FirmwareParams {
            hardware_id: "ESP32-001".to_string(),
            wifi_ssid: "depot-wifi".to_string(),
            wifi_password: "hunter2".to_string(),
            server_ip: "192.168.29.238".to_string(),
            server_port: 8080,
            interval_ms: 10000,
            gps_baud: 9600,
            generated_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_render_contains_configuration() {
        let source = render_firmware(&params()).unwrap();

        assert!(source.contains("// Hardware ID: ESP32-001"));
        assert!(source.contains("// Generated: 2024-05-01 09:30:00"));
        assert!(source.contains(r#"const char* ssid = "depot-wifi";"#));
        assert!(source.contains(r#"const char* password = "hunter2";"#));
        assert!(source.contains(r#"const char* serverUrl = "http://192.168.29.238:8080/api/locations";"#));
        assert!(source.contains(r#"const String hardwareId = "ESP32-001";"#));
        assert!(source.contains("#define GPS_BAUD 9600"));
        assert!(source.contains("GPS_UPDATE_INTERVAL = 10000;"));
    }

    #[test]
    fn test_render_carries_odometer_policy() {
        let source = render_firmware(&params()).unwrap();

        assert!(source.contains("const double NOISE_GATE_M = 5.0;"));
        assert!(source.contains("if (dist_m > NOISE_GATE_M)"));
        assert!(source.contains("odometer_km += dist_m / 1000.0;"));
        assert!(source.contains(r#"doc["source"] = "esp32_gps_enhanced";"#));
        assert!(source.contains(": 99.99;"));

        // Last position is updated outside the gate
        let gate = source.find("if (dist_m > NOISE_GATE_M)").unwrap();
        let update = source.find("lastLat = lat;").unwrap();
        let gate_block_end = gate + source[gate..].find("}\n    }").unwrap();
        assert!(update > gate_block_end);
    }

    #[test]
    fn test_render_leaves_no_placeholders() {
        let source = render_firmware(&params()).unwrap();
        assert!(!source.contains("{{"));
        assert!(!source.contains("}}"));
    }

    #[test]
    fn test_credentials_are_escaped() {
        let mut p = params();
        p.wifi_ssid = "Bob's \"Fast\" WiFi".to_string();
        p.wifi_password = "back\\slash\n{{server_url}}".to_string();

        let source = render_firmware(&p).unwrap();
        assert!(source.contains(r#"const char* ssid = "Bob's \"Fast\" WiFi";"#));
        assert!(source.contains(r#"const char* password = "back\\slash\n{{server_url}}";"#));
    }

    #[test]
    fn test_control_characters_in_credentials() {
        let mut p = params();
        p.wifi_ssid = "yard\u{1}a".to_string();

        let source = render_firmware(&p).unwrap();
        assert!(source.contains(r#"const char* ssid = "yard\001a";"#));
    }

    #[test]
    fn test_invalid_hardware_id() {
        for id in ["", "../evil", "ESP 32", "ESP32\"001"] {
            let mut p = params();
            p.hardware_id = id.to_string();
            assert!(
                matches!(render_firmware(&p), Err(TrackerError::InvalidInput(_))),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_invalid_server_address() {
        let mut p = params();
        p.server_ip = "10.0.0.1/evil".to_string();
        assert!(render_firmware(&p).is_err());

        let mut p = params();
        p.server_ip = String::new();
        assert!(render_firmware(&p).is_err());
    }

    #[test]
    fn test_custom_port_and_interval() {
        let mut p = params();
        p.server_port = 9000;
        p.interval_ms = 30000;
        let source = render_firmware(&p).unwrap();
        assert!(source.contains("http://192.168.29.238:9000/api/locations"));
        assert!(source.contains("GPS_UPDATE_INTERVAL = 30000;"));
    }

    #[test]
    fn test_escape_c_string() {
        assert_eq!(escape_c_string("plain"), "plain");
        assert_eq!(escape_c_string("a\"b"), "a\\\"b");
        assert_eq!(escape_c_string("tab\there"), "tab\\there");
        assert_eq!(escape_c_string("\u{1}"), "\\001");
        assert_eq!(escape_c_string("\u{7f}"), "\\177");
        // A hex digit after a control character stays a separate byte
        assert_eq!(escape_c_string("\u{1}a"), "\\001a");
        assert_eq!(escape_c_string("\u{1b}7"), "\\0337");
    }

    #[test]
    fn test_write_firmware() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_firmware(&params(), &dir.path().join("sketches")).unwrap();

        assert_eq!(path.file_name().unwrap(), "trucktrace_gps_ESP32-001.ino");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_firmware(&params()).unwrap());
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.firmware.wifi_ssid = "yard".to_string();
        config.firmware.server_port = 8081;
        config.reporting.interval_ms = 15000;

        let p = FirmwareParams::from_config(" ESP32-002 ", &config);
        assert_eq!(p.hardware_id, "ESP32-002");
        assert_eq!(p.wifi_ssid, "yard");
        assert_eq!(p.server_url(), "http://192.168.29.238:8081/api/locations");
        assert_eq!(p.interval_ms, 15000);
        assert_eq!(p.gps_baud, 9600);
    }
}
