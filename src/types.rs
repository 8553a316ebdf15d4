//! Core types for the Synheart Band pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw transport records, decoded samples, the reconstructed series,
//! and per-window wear verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of payload elements in one transport record
pub const PAYLOAD_LEN: usize = 20;

/// Modulus of the device-local packet counter (10 bits)
pub const SEQUENCE_MODULUS: i64 = 1024;

/// Raw payload as handed over by the transport layer.
///
/// Upstream format drift means the same stream can deliver the 20 packed
/// bytes either as a comma-separated numeric string or as an already-numeric
/// sequence; both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPayload {
    /// Comma-separated numeric string, e.g. `"12,-3,0,..."`
    Text(String),
    /// Already-numeric sequence
    Values(Vec<f64>),
}

impl RawPayload {
    /// Number of elements the payload carries
    pub fn field_count(&self) -> usize {
        match self {
            RawPayload::Text(s) => s.split(',').count(),
            RawPayload::Values(v) => v.len(),
        }
    }
}

/// One physical transmission from the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Wall-clock arrival timestamp (UTC)
    pub capture_time: DateTime<Utc>,
    /// Packed 20-byte payload
    pub payload: RawPayload,
}

/// One record decoded into physical channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSample {
    /// Device-local packet counter, wraps at 1024
    pub sequence: u16,
    /// Accelerometer x/y/z (signed 16-bit, device units)
    pub accel: [i16; 3],
    /// Gyroscope x/y/z (signed 16-bit, device units)
    pub gyro: [i16; 3],
    /// Optical red/infrared/green photodetector counts
    pub optical: [u16; 3],
    /// Transport arrival time of the carrying record
    pub capture_time: DateTime<Utc>,
}

/// One row of the reconstructed, evenly spaced series.
///
/// Channel values are `f64` because gap rows are filled by linear
/// interpolation between observed neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    /// Unwrapped, re-based sequence number (0-based, contiguous)
    pub sequence: i64,
    /// Linearly interpolated timestamp
    pub time: DateTime<Utc>,
    /// Accelerometer x/y/z
    pub accel: [f64; 3],
    /// Gyroscope x/y/z
    pub gyro: [f64; 3],
    /// Optical red/infrared/green
    pub optical: [f64; 3],
    /// True when the row came from a decoded packet rather than gap fill
    pub observed: bool,
}

/// Transport-loss accounting for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Decoded samples handed to the reconstructor
    pub received: usize,
    /// Samples discarded for a duplicate sequence number
    pub duplicates: usize,
    /// Packets implied missing by small sequence gaps
    pub missed: u64,
    /// Sequence jumps too large to be ordinary loss
    pub sync_errors: u64,
}

/// Reconstructed, contiguous, time-interpolated series for one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedSeries {
    /// Output rows, one per integer sequence value, ordered
    pub samples: Vec<SeriesSample>,
    /// Loss diagnostics gathered while reconstructing
    pub stats: LinkStats,
}

impl ReconstructedSeries {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fraction of rows backed by an observed packet (1.0 for an empty series)
    pub fn observed_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            return 1.0;
        }
        let observed = self.samples.iter().filter(|s| s.observed).count();
        observed as f64 / self.samples.len() as f64
    }
}

/// Worn / not-worn verdict for one aggregate window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WearWindow {
    /// Window start (inclusive)
    pub start_time: DateTime<Utc>,
    /// Window end (exclusive)
    pub end_time: DateTime<Utc>,
    /// True when the majority of sub-windows look like skin contact
    pub worn: bool,
    /// Sub-windows voting worn
    pub worn_subwindows: u32,
    /// Sub-windows in the vote
    pub total_subwindows: u32,
}
