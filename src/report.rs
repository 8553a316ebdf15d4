//! Batch report envelope
//!
//! Per-batch provenance and transport-loss diagnostics, serialized for the
//! calling pipeline. The envelope carries the same producer/provenance shape
//! the rest of the Synheart tooling emits, so drop rates and link damage can
//! be audited without parsing logs.

use crate::types::{LinkStats, ReconstructedSeries, WearWindow};
use crate::{BAND_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Diagnostics for one processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub report_version: String,
    pub producer: ReportProducer,
    /// Unique id for this processed batch
    pub batch_id: String,
    pub computed_at_utc: String,
    /// Raw records handed to admission control
    pub records_received: usize,
    /// Records dropped for a malformed payload
    pub records_dropped: usize,
    /// Transport-loss accounting from the reconstructor
    pub link: LinkStats,
    /// Rows in the reconstructed series
    pub series_rows: usize,
    /// Fraction of series rows backed by an observed packet
    pub observed_fraction: f64,
    /// Aggregate wear windows emitted
    pub wear_windows: usize,
    /// Aggregate wear windows with a worn verdict
    pub worn_windows: usize,
}

/// Builder that stamps a stable producer identity on every report
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a unique instance id
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance id
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Assemble the report for one processed batch
    pub fn encode(
        &self,
        records_received: usize,
        records_dropped: usize,
        series: &ReconstructedSeries,
        wear: &[WearWindow],
    ) -> BatchReport {
        BatchReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: BAND_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            batch_id: Uuid::new_v4().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            records_received,
            records_dropped,
            link: series.stats,
            series_rows: series.samples.len(),
            observed_fraction: series.observed_fraction(),
            wear_windows: wear.len(),
            worn_windows: wear.iter().filter(|w| w.worn).count(),
        }
    }
}
