//! # Telemetry Module
//!
//! Local record of every transmission attempt.
//!
//! This module handles:
//! - Formatting delivery outcomes as JSONL (JSON Lines)
//! - Writing to rotating journal files
//! - Managing file rotation (max N records per file)
//! - Retaining only the last M files

pub mod journal;

pub use journal::{DeliveryJournal, JournalRecord};
