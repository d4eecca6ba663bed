//! # Reporter
//!
//! The tracker's main loop: drain NMEA lines from the receiver, fold valid
//! fixes into the odometer on each reporting boundary, and post the
//! resulting sample.
//!
//! ## Cadence
//!
//! The first valid fix is sent immediately. After that a fix is only
//! recorded and sent once more than `interval` has passed since the previous
//! transmission attempt; fixes in between are decoded and dropped. The
//! transmission time is updated whether or not the server accepted the
//! sample, so a down server is not hammered on every fix.
//!
//! ## Failure Handling
//!
//! Nothing here is fatal. Malformed sentences, invalid fixes, transport
//! errors and rejected samples are logged and the loop moves on. A sample
//! that fails to send is gone.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, trace, warn};

use crate::client::{HttpTransport, IngestionClient};
use crate::error::TrackerError;
use crate::gps::nmea::{NmeaDecoder, NMEA_MAX_SENTENCE_LEN};
use crate::gps::{GpsFix, LocationSample, Odometer};
use crate::telemetry::{DeliveryJournal, JournalRecord};

/// Number of transmissions between status log messages
const LOG_INTERVAL_REPORTS: u64 = 30;

/// What happened to one fix
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// Receiver had no valid position
    NoFix,
    /// Valid fix inside the current reporting interval
    Throttled,
    /// Server accepted the sample
    Delivered(u16),
    /// Server answered with a non-success status
    Rejected(u16),
    /// Transport failure, sample lost
    Failed(String),
}

/// Counters for one reporting session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub lines: u64,
    pub bad_lines: u64,
    pub fixes: u64,
    pub no_fix: u64,
    pub throttled: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl ReportStats {
    /// Samples that reached the transport, whatever the outcome
    pub fn transmitted(&self) -> u64 {
        self.delivered + self.rejected + self.failed
    }

    fn count(&mut self, outcome: &FixOutcome) {
        self.fixes += 1;
        match outcome {
            FixOutcome::NoFix => self.no_fix += 1,
            FixOutcome::Throttled => self.throttled += 1,
            FixOutcome::Delivered(_) => self.delivered += 1,
            FixOutcome::Rejected(_) => self.rejected += 1,
            FixOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Interval-driven reporter for one tracker
pub struct Reporter<T> {
    odometer: Odometer,
    client: IngestionClient<T>,
    interval: Duration,
    last_post: Option<Instant>,
    journal: Option<DeliveryJournal>,
}

impl<T: HttpTransport> Reporter<T> {
    /// Create a reporter that has not transmitted yet
    ///
    /// # Arguments
    ///
    /// * `odometer` - Running state for the tracker; the reporter owns it from here on
    /// * `client` - Ingestion client samples are posted through
    /// * `interval` - Minimum time between transmissions
    pub fn new(odometer: Odometer, client: IngestionClient<T>, interval: Duration) -> Self {
        Self {
            odometer,
            client,
            interval,
            last_post: None,
            journal: None,
        }
    }

    /// Record every transmission attempt to `journal`
    pub fn with_journal(mut self, journal: DeliveryJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Current odometer state
    pub fn odometer(&self) -> &Odometer {
        &self.odometer
    }

    /// Client used for transmissions
    pub fn client(&self) -> &IngestionClient<T> {
        &self.client
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        match self.last_post {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        }
    }

    /// Process one decoded fix observed at `now`
    ///
    /// Invalid and throttled fixes leave the odometer untouched. Every other
    /// fix is recorded and posted, and the interval restarts whatever the
    /// server answered.
    pub async fn handle_fix(&mut self, fix: &GpsFix, now: Instant) -> FixOutcome {
        if !fix.is_usable() {
            trace!("No valid fix");
            return FixOutcome::NoFix;
        }

        if !self.interval_elapsed(now) {
            return FixOutcome::Throttled;
        }

        let Some(sample) = self.odometer.record_fix(fix) else {
            return FixOutcome::NoFix;
        };

        let outcome = match self.client.post_location(&sample).await {
            Ok(status) => {
                info!(
                    "Sent {} at ({:.6}, {:.6}), odometer {:.3} km: {}",
                    sample.hardware_id, sample.latitude, sample.longitude, sample.odometer_km, status
                );
                FixOutcome::Delivered(status)
            }
            Err(TrackerError::Status { status, body }) => {
                warn!("Server rejected sample with status {}: {}", status, body);
                FixOutcome::Rejected(status)
            }
            Err(e) => {
                warn!("Failed to send sample: {}", e);
                FixOutcome::Failed(e.to_string())
            }
        };

        self.last_post = Some(now);
        self.journal_outcome(&sample, &outcome);
        outcome
    }

    fn journal_outcome(&mut self, sample: &LocationSample, outcome: &FixOutcome) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };

        let (label, status, error) = match outcome {
            FixOutcome::Delivered(status) => ("delivered", Some(*status), None),
            FixOutcome::Rejected(status) => ("rejected", Some(*status), None),
            FixOutcome::Failed(reason) => ("failed", None, Some(reason.clone())),
            FixOutcome::NoFix | FixOutcome::Throttled => return,
        };

        let record = JournalRecord {
            timestamp: Utc::now(),
            outcome: label.to_string(),
            status,
            error,
            sample: sample.clone(),
        };
        if let Err(e) = journal.append(&record) {
            warn!("Failed to write delivery journal: {}", e);
        }
    }

    /// Drain NMEA lines from `reader` until EOF, Ctrl+C or a read failure
    ///
    /// Lines that are not valid UTF-8 (line noise, baud mismatch at power-up)
    /// are decoded lossily and counted as bad lines.
    pub async fn run<R>(&mut self, mut reader: R) -> ReportStats
    where
        R: AsyncBufRead + Unpin,
    {
        let mut decoder = NmeaDecoder::new();
        let mut buf = Vec::with_capacity(NMEA_MAX_SENTENCE_LEN * 2);
        let mut stats = ReportStats::default();
        let mut last_log_count = 0;

        info!(
            "Reporting for {} every {:?} to {}",
            self.odometer.hardware_id(),
            self.interval,
            self.client.base_url()
        );

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    match read {
                        Ok(0) => {
                            info!("GPS stream ended");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Failed to read from GPS stream: {}", e);
                            break;
                        }
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    buf.clear();
                    stats.lines += 1;

                    let fix = match decoder.feed(&line) {
                        Ok(Some(fix)) => fix,
                        Ok(None) => continue,
                        Err(e) => {
                            debug!("Skipping line: {}", e);
                            stats.bad_lines += 1;
                            continue;
                        }
                    };

                    let outcome = self.handle_fix(&fix, Instant::now()).await;
                    stats.count(&outcome);

                    if stats.transmitted() - last_log_count >= LOG_INTERVAL_REPORTS {
                        info!(
                            "{} samples sent ({} delivered), odometer {:.3} km",
                            stats.transmitted(), stats.delivered, self.odometer.odometer_km()
                        );
                        last_log_count = stats.transmitted();
                    }
                }

                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down...");
                    break;
                }
            }
        }

        info!(
            "Reporting stopped: {} delivered, {} rejected, {} failed, odometer {:.3} km",
            stats.delivered, stats.rejected, stats.failed, self.odometer.odometer_km()
        );
        stats
    }
}
