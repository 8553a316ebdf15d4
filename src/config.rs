//! Pipeline configuration
//!
//! Every threshold the decode and wear-detection stages rely on lives here as
//! an explicit, serializable value with a documented default, so batches can
//! be processed with study-specific tuning without touching the core.

use serde::{Deserialize, Serialize};

/// Nominal sampling rate of the device streams (Hz)
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 25.0;

/// Largest sequence gap still attributed to ordinary packet loss
pub const DEFAULT_MAX_GAP: i64 = 50;

/// Sub-window length for the wear classifier (seconds)
pub const DEFAULT_SUB_WINDOW_SECS: f64 = 10.0;

/// Aggregate window length for the majority vote (seconds)
pub const DEFAULT_AGG_WINDOW_SECS: f64 = 60.0;

/// Minimum fraction of expected samples (and of in-range samples) a
/// sub-window needs before any verdict other than not-worn is possible
pub const DEFAULT_COVERAGE_FRACTION: f64 = 0.64;

/// Heart-rate band used to test for a pulsatile component (Hz)
pub const DEFAULT_PULSE_BAND_HZ: (f64, f64) = (0.5, 4.0);

/// Sequence reconstruction tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructConfig {
    /// Largest sequence gap attributed to ordinary loss. Anything larger is
    /// counted as a sync error, and a counter drop of more than
    /// `1024 - max_gap` between neighbouring packets is a wraparound.
    pub max_gap: i64,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            max_gap: DEFAULT_MAX_GAP,
        }
    }
}

/// Inclusive plausible range for one optical channel (device counts)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Wear-classifier thresholds.
///
/// The separation and range defaults are the canonical tuning for the
/// current sensor generation; earlier firmware used a stricter 50000/15000
/// separation pair, which deployments can restore through this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Nominal sampling rate of the optical stream (Hz)
    pub sampling_rate_hz: f64,
    /// Sub-window length (seconds)
    pub sub_window_secs: f64,
    /// Aggregate window length (seconds); a whole multiple of the
    /// sub-window length
    pub agg_window_secs: f64,
    /// Coverage fraction for both the sample-count and in-range checks
    pub coverage_fraction: f64,
    /// Plausible count range, red channel
    pub red_range: ChannelRange,
    /// Plausible count range, infrared channel
    pub infrared_range: ChannelRange,
    /// Plausible count range, green channel
    pub green_range: ChannelRange,
    /// Channel-mean floor below which the sensor is reading darkness
    pub noise_floor: f64,
    /// Required mean separation, infrared over red
    pub min_infrared_red_separation: f64,
    /// Required mean separation, red over green
    pub min_red_green_separation: f64,
    /// Separation applied instead when the red mean sits against a rail
    pub reduced_infrared_red_separation: f64,
    /// Separation applied instead when the red mean sits against a rail
    pub reduced_red_green_separation: f64,
    /// Red mean at or below this counts as very low
    pub red_saturation_low: f64,
    /// Red mean at or above this counts as saturated
    pub red_saturation_high: f64,
    /// Pulsatile band (Hz)
    pub pulse_band_hz: (f64, f64),
    /// Bandpassed standard deviation at or below this on every channel
    /// means no pulsatile component
    pub pulse_std_floor: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            sub_window_secs: DEFAULT_SUB_WINDOW_SECS,
            agg_window_secs: DEFAULT_AGG_WINDOW_SECS,
            coverage_fraction: DEFAULT_COVERAGE_FRACTION,
            red_range: ChannelRange {
                min: 1_000.0,
                max: 60_000.0,
            },
            infrared_range: ChannelRange {
                min: 5_000.0,
                max: 64_000.0,
            },
            green_range: ChannelRange {
                min: 200.0,
                max: 40_000.0,
            },
            noise_floor: 500.0,
            min_infrared_red_separation: 30_000.0,
            min_red_green_separation: 11_000.0,
            reduced_infrared_red_separation: 10_000.0,
            reduced_red_green_separation: 4_000.0,
            red_saturation_low: 2_000.0,
            red_saturation_high: 60_000.0,
            pulse_band_hz: DEFAULT_PULSE_BAND_HZ,
            pulse_std_floor: 10.0,
        }
    }
}

/// Top-level configuration for one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub reconstruct: ReconstructConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

impl PipelineConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
