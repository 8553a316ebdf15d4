//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Band: one ordered batch
//! of raw records in, a reconstructed series plus wear verdicts and a batch
//! report out.
//!
//! Pipeline stages:
//! 1. Validator - admission control on payload shape
//! 2. Decoder - bit-packed payload to physical channels
//! 3. Reconstructor - counter unwrap, dedup, densify, time interpolation
//! 4. WearClassifier - windowed worn / not-worn verdicts

use crate::config::PipelineConfig;
use crate::decoder;
use crate::error::DecodeError;
use crate::quality::WearClassifier;
use crate::reconstructor::Reconstructor;
use crate::report::{BatchReport, ReportEncoder};
use crate::types::{RawRecord, ReconstructedSeries, WearWindow};
use crate::validator;
use serde::{Deserialize, Serialize};

/// Full output for one processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Contiguous, time-interpolated channel series
    pub series: ReconstructedSeries,
    /// Aggregate worn / not-worn windows over the optical stream
    pub wear: Vec<WearWindow>,
    /// Provenance and loss diagnostics
    pub report: BatchReport,
}

/// Process one ordered batch of raw records.
///
/// # Arguments
/// * `records` - Ordered raw records for one (user, placement, day) batch
/// * `config` - Pipeline thresholds; `PipelineConfig::default()` for the
///   canonical tuning
///
/// # Returns
/// The reconstructed series, wear windows, and batch report. The only error
/// is a record whose payload passed admission control but cannot be coerced
/// to numbers at all.
pub fn process_batch(
    records: Vec<RawRecord>,
    config: &PipelineConfig,
) -> Result<BatchOutput, DecodeError> {
    BandProcessor::with_config(config.clone()).process(records)
}

/// Stateful processor for repeated batches with one configuration and a
/// stable report instance id.
pub struct BandProcessor {
    config: PipelineConfig,
    encoder: ReportEncoder,
}

impl Default for BandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BandProcessor {
    /// Create a processor with the canonical configuration
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            encoder: ReportEncoder::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline over one ordered batch.
    pub fn process(&self, records: Vec<RawRecord>) -> Result<BatchOutput, DecodeError> {
        let records_received = records.len();

        // Stage 1: admission control
        let validated = validator::validate(records);

        // Stage 2: decode packed payloads
        let mut samples = Vec::with_capacity(validated.accepted.len());
        for record in &validated.accepted {
            samples.push(decoder::decode(record)?);
        }

        // Stage 3: reconstruct the contiguous series
        let series = Reconstructor::reconstruct(&samples, &self.config.reconstruct);

        // Stage 4: windowed wear verdicts over the optical stream
        let wear = WearClassifier::classify(&series, &self.config.quality);

        let report = self
            .encoder
            .encode(records_received, validated.dropped, &series, &wear);
        Ok(BatchOutput {
            series,
            wear,
            report,
        })
    }

    /// Process a JSON array of raw records (transport-layer export format).
    pub fn process_json(&self, raw_json: &str) -> Result<BatchOutput, DecodeError> {
        self.process(parse_records_array(raw_json)?)
    }
}

/// Parse a JSON array of raw records
pub fn parse_records_array(raw_json: &str) -> Result<Vec<RawRecord>, DecodeError> {
    Ok(serde_json::from_str(raw_json)?)
}

/// Parse newline-delimited JSON, one raw record per line
pub fn parse_records_ndjson(input: &str) -> Result<Vec<RawRecord>, DecodeError> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}
