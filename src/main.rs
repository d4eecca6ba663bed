//! # TruckTrace Tracker
//!
//! Command line front end for the TruckTrace GPS tracker client.
//!
//! Without a subcommand the interactive menu is started. `track` runs the
//! reporting loop against a serial receiver or a recorded NMEA log.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trucktrace_tracker::client::{IngestionClient, ReqwestTransport};
use trucktrace_tracker::config::Config;
use trucktrace_tracker::firmware::{write_firmware, FirmwareParams};
use trucktrace_tracker::gps::Odometer;
use trucktrace_tracker::menu::run_menu;
use trucktrace_tracker::reporter::Reporter;
use trucktrace_tracker::serial::GpsSerial;
use trucktrace_tracker::telemetry::DeliveryJournal;
use trucktrace_tracker::testdata::send_test_batch;

/// Configuration file used when `--config` is not given and it exists
const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";

/// File name prefix of the rolling diagnostic log
const LOG_FILE_PREFIX: &str = "trucktrace-tracker.log";

#[derive(Debug, Parser)]
#[command(name = "trucktrace-tracker", version, about = "GPS tracker client for TruckTrace")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the server base URL, e.g. http://10.0.0.5:8080
    #[arg(long)]
    server_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the server is reachable
    Health,

    /// Register a tracker with a placeholder position
    Register {
        hardware_id: String,
        #[arg(long)]
        vehicle_name: Option<String>,
    },

    /// Send a batch of synthetic location samples
    TestData {
        hardware_id: String,
        #[arg(long)]
        count: Option<usize>,
    },

    /// Show the fleet hardware status
    Status,

    /// Generate ESP32 Arduino firmware
    Firmware {
        hardware_id: String,
        #[arg(long)]
        ssid: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        server_ip: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Report positions from a GPS receiver or an NMEA log
    Track {
        #[arg(long)]
        hardware_id: Option<String>,
        /// Replay an NMEA log instead of reading the serial receiver
        #[arg(long)]
        nmea: Option<PathBuf>,
    },

    /// Interactive menu (default)
    Menu,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH))?,
        None => Config::default(),
    };

    if let Some(url) = &cli.server_url {
        config.server.base_url = url.clone();
        config.validate().context("Invalid --server-url")?;
    }

    Ok(config)
}

/// Install the tracing subscriber; the guard must live as long as logging
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let (file_layer, guard) = if config.logging.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.logging.file_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = init_logging(&config);

    info!("TruckTrace Tracker v{} starting...", env!("CARGO_PKG_VERSION"));

    let client = IngestionClient::new(ReqwestTransport::new()?, &config.server);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Health => {
            client.health().await.context("Server connection failed")?;
            println!("Server connection successful");
        }

        Commands::Register { hardware_id, vehicle_name } => {
            let vehicle_name = vehicle_name.or_else(|| {
                Some(config.device.vehicle_name.clone()).filter(|n| !n.trim().is_empty())
            });
            let response = client
                .register(&hardware_id, vehicle_name.as_deref())
                .await
                .context("Registration failed")?;
            println!("Tracker registered successfully");
            println!("   Hardware ID: {}", hardware_id.trim());
            print!("{}", response);
        }

        Commands::TestData { hardware_id, count } => {
            let count = count.unwrap_or(config.reporting.test_batch_count);
            let report =
                send_test_batch(&client, &hardware_id, count, config.reporting.test_batch_delay()).await?;
            println!("{} of {} updates sent", report.sent, report.total());
        }

        Commands::Status => {
            let status = client.hardware_status().await.context("Status check failed")?;
            print!("{}", status);
        }

        Commands::Firmware { hardware_id, ssid, password, server_ip, output_dir } => {
            let mut params = FirmwareParams::from_config(&hardware_id, &config);
            if let Some(ssid) = ssid {
                params.wifi_ssid = ssid;
            }
            if let Some(password) = password {
                params.wifi_password = password;
            }
            if let Some(server_ip) = server_ip {
                params.server_ip = server_ip;
            }
            let dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.firmware.output_dir));
            let path = write_firmware(&params, &dir)?;
            println!("Arduino code generated: {}", path.display());
        }

        Commands::Track { hardware_id, nmea } => {
            let hardware_id = hardware_id.unwrap_or_else(|| config.device.hardware_id.clone());
            if hardware_id.trim().is_empty() {
                bail!("No hardware id: pass --hardware-id or set device.hardware_id");
            }

            let mut reporter = Reporter::new(
                Odometer::new(hardware_id.trim()),
                client,
                config.reporting.interval(),
            );
            if config.telemetry.enabled {
                reporter = reporter.with_journal(DeliveryJournal::open(&config.telemetry)?);
            }

            match nmea {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("Failed to open NMEA log {}", path.display()))?;
                    reporter.run(BufReader::new(file)).await;
                }
                None => {
                    let gps = GpsSerial::open(&config.gps)?;
                    info!("GPS receiver opened at: {}", gps.device_path());
                    reporter.run(gps.into_reader()).await;
                }
            }
        }

        Commands::Menu => {
            println!("TruckTrace GPS Tracker Configuration Tool");
            client
                .health()
                .await
                .context("Please ensure the TruckTrace server is running and accessible")?;
            run_menu(
                &client,
                &config,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_menu() {
        let cli = Cli::parse_from(["trucktrace-tracker"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_track() {
        let cli = Cli::parse_from([
            "trucktrace-tracker",
            "--server-url",
            "http://10.0.0.5:8080",
            "track",
            "--hardware-id",
            "ESP32-001",
            "--nmea",
            "drive.nmea",
        ]);
        assert_eq!(cli.server_url.as_deref(), Some("http://10.0.0.5:8080"));
        match cli.command {
            Some(Commands::Track { hardware_id, nmea }) => {
                assert_eq!(hardware_id.as_deref(), Some("ESP32-001"));
                assert_eq!(nmea, Some(PathBuf::from("drive.nmea")));
            }
            other => panic!("Expected track command, got: {:?}", other),
        }
    }

    #[test]
    fn test_server_url_override_validated() {
        let cli = Cli::parse_from(["trucktrace-tracker", "--server-url", "ftp://nope", "status"]);
        assert!(load_config(&cli).is_err());

        let cli = Cli::parse_from(["trucktrace-tracker", "--server-url", "http://10.0.0.5:8080/", "status"]);
        assert_eq!(load_config(&cli).unwrap().server.base_url, "http://10.0.0.5:8080/");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::parse_from(["trucktrace-tracker", "--config", "/nonexistent/tracker.toml", "health"]);
        assert!(load_config(&cli).is_err());
    }
}
