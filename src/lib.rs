//! Synheart Band - on-device decode and wear-detection engine for wrist-worn
//! multi-sensor packet streams
//!
//! Band turns raw radio records from a wrist device (3-axis accelerometer,
//! 3-axis gyroscope, 3-channel optical pulse sensor) into an evenly spaced
//! physical-channel series and per-window worn / not-worn verdicts through a
//! deterministic pipeline: admission control → bit-packed decode → sequence
//! reconstruction → windowed wear classification.
//!
//! ## Modules
//!
//! - **validator**: payload-shape admission control with audited drops
//! - **decoder**: bit-packed 20-byte frames to physical channels
//! - **reconstructor**: counter unwrap, loss accounting, time interpolation
//! - **quality**: windowed worn / not-worn classification
//! - **pipeline**: batch orchestration and JSON ingest

pub mod config;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod quality;
pub mod reconstructor;
pub mod report;
pub mod signal;
pub mod types;
pub mod validator;

pub use config::{ChannelRange, PipelineConfig, QualityConfig, ReconstructConfig};
pub use error::DecodeError;
pub use pipeline::{process_batch, BandProcessor, BatchOutput};
pub use quality::WearClassifier;
pub use reconstructor::Reconstructor;
pub use report::BatchReport;
pub use types::{
    DecodedSample, LinkStats, RawPayload, RawRecord, ReconstructedSeries, SeriesSample, WearWindow,
};
pub use validator::{validate, Validated};

/// Band version embedded in all batch reports
pub const BAND_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for batch reports
pub const PRODUCER_NAME: &str = "synheart-band";
