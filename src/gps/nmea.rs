//! # NMEA 0183 Decoder
//!
//! Decodes the position-bearing sentences a serial GPS receiver emits.
//!
//! ## Sentence Framing
//!
//! ```text
//! $GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A
//! ^ ^^^^^ fields ...                                                ^ XOR checksum
//! | talker (2) + type (3)
//! ```
//!
//! The checksum is the XOR of every byte between `$` and `*`, written as two
//! hex digits. Sentences without a checksum are rejected.
//!
//! ## Supported Sentences
//!
//! | Type | Fields used | Validity |
//! |------|-------------|----------|
//! | RMC | lat, lon, speed (knots), course | status `A` |
//! | GGA | lat, lon, satellites, HDOP | fix quality > 0 |
//!
//! Any two-letter talker (GP, GN, GL, GA, BD) is accepted.

use crate::error::{Result, TrackerError};

use super::sample::GpsFix;

/// Kilometres per hour in one knot
pub const KPH_PER_KNOT: f64 = 1.852;

/// Longest sentence the standard allows, including `$` and checksum
pub const NMEA_MAX_SENTENCE_LEN: usize = 82;

/// A framed, checksum-verified sentence split into its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence<'a> {
    pub talker: &'a str,
    pub kind: &'a str,
    pub fields: Vec<&'a str>,
}

/// XOR checksum over the sentence body (between `$` and `*`)
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Verify framing and checksum, then split a sentence into fields
///
/// # Errors
///
/// Returns error if:
/// - The line does not start with `$`
/// - The checksum is missing, malformed or does not match
/// - The address field is not talker + type
pub fn parse_sentence(line: &str) -> Result<Sentence<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.len() > NMEA_MAX_SENTENCE_LEN {
        return Err(TrackerError::Nmea(format!("Sentence too long: {} bytes", line.len())));
    }

    let rest = line
        .strip_prefix('$')
        .ok_or_else(|| TrackerError::Nmea("Missing '$' start delimiter".to_string()))?;

    let (body, hex) = rest
        .rsplit_once('*')
        .ok_or_else(|| TrackerError::Nmea("Missing checksum".to_string()))?;

    if hex.len() != 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TrackerError::Nmea(format!("Malformed checksum: {:?}", hex)));
    }
    let expected = u8::from_str_radix(hex, 16)
        .map_err(|_| TrackerError::Nmea(format!("Malformed checksum: {:?}", hex)))?;

    let calculated = checksum(body);
    if calculated != expected {
        return Err(TrackerError::Nmea(format!(
            "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
            calculated, expected
        )));
    }

    let mut parts = body.split(',');
    let address = parts.next().unwrap_or_default();
    if address.len() != 5 || !address.is_ascii() {
        return Err(TrackerError::Nmea(format!("Invalid address field: {:?}", address)));
    }

    Ok(Sentence {
        talker: &address[..2],
        kind: &address[2..],
        fields: parts.collect(),
    })
}

/// Convert an NMEA `ddmm.mmmm` / `dddmm.mmmm` value plus hemisphere to degrees
///
/// Returns `Ok(None)` when both fields are empty (receiver has no position).
pub fn parse_coordinate(value: &str, hemisphere: &str) -> Result<Option<f64>> {
    if value.is_empty() && hemisphere.is_empty() {
        return Ok(None);
    }

    let raw: f64 = value
        .parse()
        .map_err(|_| TrackerError::Nmea(format!("Invalid coordinate: {:?}", value)))?;

    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 || raw < 0.0 {
        return Err(TrackerError::Nmea(format!("Invalid coordinate: {:?}", value)));
    }
    let decimal = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => Ok(Some(decimal)),
        "S" | "W" => Ok(Some(-decimal)),
        other => Err(TrackerError::Nmea(format!("Invalid hemisphere: {:?}", other))),
    }
}

fn parse_optional<T: std::str::FromStr>(field: &str, name: &str) -> Result<Option<T>> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| TrackerError::Nmea(format!("Invalid {}: {:?}", name, field)))
}

fn field<'a>(sentence: &Sentence<'a>, index: usize) -> Result<&'a str> {
    sentence.fields.get(index).copied().ok_or_else(|| {
        TrackerError::Nmea(format!("{} sentence too short: missing field {}", sentence.kind, index))
    })
}

/// Stateful decoder that remembers the latest motion and quality readings
///
/// RMC carries speed and course, GGA carries satellites and HDOP. Each
/// accepted sentence yields a [`GpsFix`] snapshot combining the sentence's
/// own position with the last known values of the other fields.
#[derive(Debug, Default, Clone)]
pub struct NmeaDecoder {
    speed_kph: Option<f64>,
    heading_deg: Option<f64>,
    satellites: Option<u32>,
    hdop: Option<f64>,
    sentences: u64,
    errors: u64,
}

impl NmeaDecoder {
    /// Create a decoder with no remembered motion or quality readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sentences accepted so far
    pub fn sentences(&self) -> u64 {
        self.sentences
    }

    /// Number of lines rejected so far
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Feed one line from the receiver
    ///
    /// # Returns
    ///
    /// * `Ok(Some(fix))` - an RMC or GGA sentence was decoded
    /// * `Ok(None)` - a valid sentence of a type we do not track
    /// * `Err(_)` - the line was malformed
    pub fn feed(&mut self, line: &str) -> Result<Option<GpsFix>> {
        let result = self.decode(line);
        match &result {
            Ok(_) => self.sentences += 1,
            Err(_) => self.errors += 1,
        }
        result
    }

    fn decode(&mut self, line: &str) -> Result<Option<GpsFix>> {
        let sentence = parse_sentence(line)?;
        match sentence.kind {
            "RMC" => self.decode_rmc(&sentence).map(Some),
            "GGA" => self.decode_gga(&sentence).map(Some),
            _ => Ok(None),
        }
    }

    fn decode_rmc(&mut self, sentence: &Sentence<'_>) -> Result<GpsFix> {
        // 0 time, 1 status, 2 lat, 3 N/S, 4 lon, 5 E/W, 6 knots, 7 course
        let status = field(sentence, 1)?;
        let latitude = parse_coordinate(field(sentence, 2)?, field(sentence, 3)?)?;
        let longitude = parse_coordinate(field(sentence, 4)?, field(sentence, 5)?)?;

        if let Some(knots) = parse_optional::<f64>(field(sentence, 6)?, "speed")? {
            self.speed_kph = Some(knots * KPH_PER_KNOT);
        }
        if let Some(course) = parse_optional::<f64>(field(sentence, 7)?, "course")? {
            self.heading_deg = Some(course);
        }

        Ok(self.snapshot(status == "A", latitude, longitude))
    }

    fn decode_gga(&mut self, sentence: &Sentence<'_>) -> Result<GpsFix> {
        // 0 time, 1 lat, 2 N/S, 3 lon, 4 E/W, 5 quality, 6 satellites, 7 hdop
        let latitude = parse_coordinate(field(sentence, 1)?, field(sentence, 2)?)?;
        let longitude = parse_coordinate(field(sentence, 3)?, field(sentence, 4)?)?;
        let quality = parse_optional::<u8>(field(sentence, 5)?, "fix quality")?.unwrap_or(0);

        if let Some(satellites) = parse_optional::<u32>(field(sentence, 6)?, "satellite count")? {
            self.satellites = Some(satellites);
        }
        if let Some(hdop) = parse_optional::<f64>(field(sentence, 7)?, "hdop")? {
            self.hdop = Some(hdop);
        }

        Ok(self.snapshot(quality > 0, latitude, longitude))
    }

    fn snapshot(&self, valid: bool, latitude: Option<f64>, longitude: Option<f64>) -> GpsFix {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => GpsFix {
                valid,
                latitude,
                longitude,
                speed_kph: self.speed_kph,
                heading_deg: self.heading_deg,
                satellites: self.satellites,
                hdop: self.hdop,
            },
            _ => GpsFix::invalid(),
        }
    }
}
