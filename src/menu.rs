//! # Interactive Menu
//!
//! Line-oriented operator console over any async reader and writer:
//!
//! ```text
//! 1. Register new GPS tracker
//! 2. Send test data
//! 3. Check tracker status
//! 4. Generate Arduino code
//! 5. Exit
//! ```
//!
//! End of input is treated as option 5. Failed operations are reported and
//! the menu keeps running.

use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::client::{HttpTransport, IngestionClient};
use crate::config::Config;
use crate::error::Result;
use crate::firmware::{write_firmware, FirmwareParams};
use crate::testdata::send_test_batch;

/// Test batch size when the operator's answer is not a number
const DEFAULT_TEST_COUNT: usize = 5;

const OPTIONS: &str = "\nOptions:\n\
    1. Register new GPS tracker\n\
    2. Send test data\n\
    3. Check tracker status\n\
    4. Generate Arduino code\n\
    5. Exit\n";

struct Console<R, W> {
    lines: Lines<R>,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn say(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Print `label` and read one trimmed answer, `None` at end of input
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        self.output.write_all(label.as_bytes()).await?;
        self.output.flush().await?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }
}

/// Parse the test batch size, falling back to the default
fn parse_count(answer: &str) -> usize {
    answer.parse().unwrap_or(DEFAULT_TEST_COUNT)
}

/// Run the menu until the operator exits or input ends
pub async fn run_menu<T, R, W>(
    client: &IngestionClient<T>,
    config: &Config,
    input: R,
    output: W,
) -> Result<()>
where
    T: HttpTransport,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut console = Console {
        lines: input.lines(),
        output,
    };

    loop {
        console.say(OPTIONS).await?;
        let Some(choice) = console.ask("Select option (1-5): ").await? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                let Some(hardware_id) = console.ask("Enter hardware ID (e.g., ESP32-001): ").await? else {
                    break;
                };
                let Some(vehicle_name) = console.ask("Enter vehicle name (optional): ").await? else {
                    break;
                };
                let vehicle_name = Some(vehicle_name.as_str()).filter(|n| !n.is_empty());

                match client.register(&hardware_id, vehicle_name).await {
                    Ok(response) => {
                        console.say("Tracker registered successfully").await?;
                        console.say(&format!("   Hardware ID: {}", hardware_id)).await?;
                        console.say(response.to_string().trim_end()).await?;
                    }
                    Err(e) => console.say(&format!("Registration failed: {}", e)).await?,
                }
            }

            "2" => {
                let Some(hardware_id) = console.ask("Enter hardware ID: ").await? else {
                    break;
                };
                let Some(count) = console.ask("Number of test updates (default 5): ").await? else {
                    break;
                };
                let count = parse_count(&count);

                console.say(&format!("Sending {} test GPS updates...", count)).await?;
                match send_test_batch(client, &hardware_id, count, config.reporting.test_batch_delay()).await {
                    Ok(report) => {
                        console
                            .say(&format!("{} of {} updates sent", report.sent, report.total()))
                            .await?
                    }
                    Err(e) => console.say(&format!("Test data failed: {}", e)).await?,
                }
            }

            "3" => match client.hardware_status().await {
                Ok(status) => console.say(status.to_string().trim_end()).await?,
                Err(e) => console.say(&format!("Status check failed: {}", e)).await?,
            },

            "4" => {
                let Some(hardware_id) = console.ask("Enter hardware ID: ").await? else {
                    break;
                };
                let Some(wifi_ssid) = console.ask("Enter WiFi SSID: ").await? else {
                    break;
                };
                let Some(wifi_password) = console.ask("Enter WiFi password: ").await? else {
                    break;
                };
                let label = format!("Enter server IP (default {}): ", config.firmware.server_ip);
                let Some(server_ip) = console.ask(&label).await? else {
                    break;
                };

                let mut params = FirmwareParams::from_config(&hardware_id, config);
                params.wifi_ssid = wifi_ssid;
                params.wifi_password = wifi_password;
                if !server_ip.is_empty() {
                    params.server_ip = server_ip;
                }

                match write_firmware(&params, Path::new(&config.firmware.output_dir)) {
                    Ok(path) => {
                        console
                            .say(&format!("Arduino code generated: {}", path.display()))
                            .await?
                    }
                    Err(e) => console.say(&format!("Firmware generation failed: {}", e)).await?,
                }
            }

            "5" => break,

            _ => console.say("Invalid option").await?,
        }
    }

    console.say("Goodbye!").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::mocks::{MockReply, RecordingTransport};
    use crate::config::ServerConfig;

    fn test_config(output_dir: &Path) -> Config {
        let mut config = Config::default();
        config.reporting.test_batch_delay_ms = 0;
        config.firmware.output_dir = output_dir.to_string_lossy().into_owned();
        config
    }

    async fn drive(transport: &RecordingTransport, config: &Config, script: &str) -> String {
        let client = IngestionClient::new(transport.clone(), &ServerConfig::default());
        let mut output = Vec::new();
        run_menu(&client, config, script.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3"), 3);
        assert_eq!(parse_count(""), 5);
        assert_eq!(parse_count("lots"), 5);
        assert_eq!(parse_count("-2"), 5);
    }

    #[tokio::test]
    async fn test_exit_and_eof() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let transport = RecordingTransport::new();

        let out = drive(&transport, &config, "5\n").await;
        assert!(out.contains("1. Register new GPS tracker"));
        assert!(out.ends_with("Goodbye!\n"));

        let out = drive(&transport, &config, "").await;
        assert!(out.ends_with("Goodbye!\n"));
        assert!(transport.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_option() {
        let dir = tempfile::tempdir().unwrap();
        let out = drive(&RecordingTransport::new(), &test_config(dir.path()), "9\nabc\n5\n").await;
        assert_eq!(out.matches("Invalid option").count(), 2);
    }

    #[tokio::test]
    async fn test_register_option() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();
        transport.push_status(201, r#"{"vehicle_id": 12, "signal_quality": "good"}"#);

        let out = drive(&transport, &test_config(dir.path()), "1\nESP32-001\n\n5\n").await;
        assert!(out.contains("Tracker registered successfully"));
        assert!(out.contains("Vehicle ID: 12"));

        let requests = transport.get_requests();
        assert_eq!(requests.len(), 1);
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["vehicle_name"], "GPS Tracker ESP32-001");
    }

    #[tokio::test]
    async fn test_register_failure_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();
        transport.push_reply(MockReply::Unreachable);

        let out = drive(&transport, &test_config(dir.path()), "1\nESP32-001\nTruck 7\n3\n5\n").await;
        assert!(out.contains("Registration failed"));
        assert!(out.contains("GPS Tracker Status:"));
    }

    #[tokio::test]
    async fn test_send_test_data_default_count() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();

        let out = drive(&transport, &test_config(dir.path()), "2\nESP32-001\nmany\n5\n").await;
        assert!(out.contains("Sending 5 test GPS updates"));
        assert!(out.contains("5 of 5 updates sent"));
        assert_eq!(transport.get_requests().len(), 5);
    }

    #[tokio::test]
    async fn test_send_test_data_count() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();

        drive(&transport, &test_config(dir.path()), "2\nESP32-001\n2\n5\n").await;
        assert_eq!(transport.get_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_status_option() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();
        transport.push_status(
            200,
            r#"{"hardware_connected": true, "recent_updates": 4,
                "gps_vehicles": [{"name": "Truck 7", "plate": "KA-01", "latitude": 40.75891, "longitude": -73.98512}]}"#,
        );

        let out = drive(&transport, &test_config(dir.path()), "3\n5\n").await;
        assert!(out.contains("Hardware Connected: true"));
        assert!(out.contains("Truck 7 (KA-01)"));
        assert!(out.contains("Location: 40.7589, -73.9851"));
        assert!(transport.get_requests()[0].url.ends_with("/api/hardware/status"));
    }

    #[tokio::test]
    async fn test_generate_firmware_default_ip() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let transport = RecordingTransport::new();

        let out = drive(&transport, &config, "4\nESP32-009\nyard\nsecret\n\n5\n").await;
        assert!(out.contains("Arduino code generated"));

        let source = std::fs::read_to_string(dir.path().join("trucktrace_gps_ESP32-009.ino")).unwrap();
        assert!(source.contains(r#"const char* ssid = "yard";"#));
        assert!(source.contains("http://192.168.29.238:8080/api/locations"));
        assert!(transport.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_generate_firmware_custom_ip() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        drive(&RecordingTransport::new(), &config, "4\nESP32-010\nyard\nsecret\n10.0.0.5\n5\n").await;
        let source = std::fs::read_to_string(dir.path().join("trucktrace_gps_ESP32-010.ino")).unwrap();
        assert!(source.contains("http://10.0.0.5:8080/api/locations"));
    }

    #[tokio::test]
    async fn test_generate_firmware_bad_id_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = drive(&RecordingTransport::new(), &test_config(dir.path()), "4\n../x\na\nb\n\n5\n").await;
        assert!(out.contains("Firmware generation failed"));
    }

    #[tokio::test]
    async fn test_eof_mid_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();
        let out = drive(&transport, &test_config(dir.path()), "1\nESP32-001").await;
        assert!(out.ends_with("Goodbye!\n"));
        assert!(transport.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_prompts_written_before_reads() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let client = IngestionClient::new(RecordingTransport::new(), &ServerConfig::default());

        let input = tokio_test::io::Builder::new().read(b"7\n").read(b"5\n").build();
        let mut output = Vec::new();
        run_menu(&client, &config, tokio::io::BufReader::new(input), &mut output)
            .await
            .unwrap();

        let out = String::from_utf8(output).unwrap();
        let first_prompt = out.find("Select option (1-5): ").unwrap();
        let invalid = out.find("Invalid option").unwrap();
        assert!(first_prompt < invalid);
        assert_eq!(out.matches("Select option (1-5): ").count(), 2);
    }
}
