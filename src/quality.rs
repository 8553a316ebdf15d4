//! Windowed wear detection over the optical stream
//!
//! Two-level windowing: short sub-windows are classified with a battery of
//! statistical heuristics (coverage, plausible range, noise floor, absorption
//! ordering, channel separation, pulsatile energy), then each aggregate
//! window takes the majority vote of its sub-windows. Every check fails
//! closed: a window that cannot prove skin contact is reported as not worn,
//! and a tied vote resolves to not worn.

use crate::config::{ChannelRange, QualityConfig};
use crate::signal::{bandpass_std, mean};
use crate::types::{ReconstructedSeries, SeriesSample, WearWindow};
use chrono::{DateTime, Duration, Utc};

/// Wear classifier over a reconstructed series
pub struct WearClassifier;

impl WearClassifier {
    /// Classify one reconstructed series into aggregate wear windows.
    ///
    /// Always returns a verdict per window; an empty series yields no
    /// windows rather than an error.
    pub fn classify(series: &ReconstructedSeries, config: &QualityConfig) -> Vec<WearWindow> {
        if series.samples.is_empty() {
            return Vec::new();
        }
        let sub_verdicts = classify_sub_windows(&series.samples, config);
        aggregate(&sub_verdicts, config)
    }
}

/// Verdict for one sub-window
struct SubWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    worn: bool,
}

/// Partition the series into non-overlapping sub-windows anchored at the
/// first sample and classify each one.
fn classify_sub_windows(samples: &[SeriesSample], config: &QualityConfig) -> Vec<SubWindow> {
    let t0 = samples[0].time;
    let t_end = samples[samples.len() - 1].time;
    let sub_ns = (config.sub_window_secs * 1e9) as i64;
    if sub_ns <= 0 {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut idx = 0usize;
    let mut k = 0i64;
    loop {
        let start = t0 + Duration::nanoseconds(k * sub_ns);
        if start > t_end {
            break;
        }
        let end = t0 + Duration::nanoseconds((k + 1) * sub_ns);

        let begin = idx;
        while idx < samples.len() && samples[idx].time < end {
            idx += 1;
        }
        windows.push(SubWindow {
            start,
            end,
            worn: sub_window_worn(&samples[begin..idx], config),
        });

        if idx >= samples.len() {
            break;
        }
        k += 1;
    }
    windows
}

/// Run the heuristic battery over one sub-window slice.
fn sub_window_worn(samples: &[SeriesSample], config: &QualityConfig) -> bool {
    let expected = config.sampling_rate_hz * config.sub_window_secs;
    if (samples.len() as f64) < config.coverage_fraction * expected {
        return false;
    }

    let red: Vec<f64> = samples.iter().map(|s| s.optical[0]).collect();
    let infrared: Vec<f64> = samples.iter().map(|s| s.optical[1]).collect();
    let green: Vec<f64> = samples.iter().map(|s| s.optical[2]).collect();

    // Plausible-range occupancy: darkness or ambient flooding pushes every
    // channel out of its physical operating window.
    let any_channel_in_range = [
        (&red, &config.red_range),
        (&infrared, &config.infrared_range),
        (&green, &config.green_range),
    ]
    .iter()
    .any(|(channel, range)| in_range_fraction(channel, range) >= config.coverage_fraction);
    if !any_channel_in_range {
        return false;
    }

    let red_mean = mean(&red);
    let infrared_mean = mean(&infrared);
    let green_mean = mean(&green);

    if red_mean < config.noise_floor
        && infrared_mean < config.noise_floor
        && green_mean < config.noise_floor
    {
        return false;
    }

    // Absorption ordering: through skin, infrared > red > green.
    if !(infrared_mean > red_mean && red_mean > green_mean) {
        return false;
    }

    // Channel separation, relaxed when the red mean sits against a rail and
    // the separations compress.
    let red_at_rail =
        red_mean <= config.red_saturation_low || red_mean >= config.red_saturation_high;
    let (min_ir_red, min_red_green) = if red_at_rail {
        (
            config.reduced_infrared_red_separation,
            config.reduced_red_green_separation,
        )
    } else {
        (
            config.min_infrared_red_separation,
            config.min_red_green_separation,
        )
    };
    if infrared_mean - red_mean <= min_ir_red || red_mean - green_mean <= min_red_green {
        return false;
    }

    // A worn sensor shows a pulsatile component in the heart-rate band on at
    // least one channel.
    let (low_hz, high_hz) = config.pulse_band_hz;
    [&red, &infrared, &green].iter().any(|channel| {
        bandpass_std(channel, config.sampling_rate_hz, low_hz, high_hz) > config.pulse_std_floor
    })
}

/// Fraction of samples inside the plausible range; 0.0 for an empty slice
fn in_range_fraction(values: &[f64], range: &ChannelRange) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let inside = values.iter().filter(|v| range.contains(**v)).count();
    inside as f64 / values.len() as f64
}

/// Majority-vote sub-window verdicts into aggregate windows. A strict
/// majority is required, so a tie (or an empty vote) is not worn.
fn aggregate(sub: &[SubWindow], config: &QualityConfig) -> Vec<WearWindow> {
    let per_window = (config.agg_window_secs / config.sub_window_secs)
        .round()
        .max(1.0) as usize;

    sub.chunks(per_window)
        .map(|chunk| {
            let worn_count = chunk.iter().filter(|w| w.worn).count();
            WearWindow {
                start_time: chunk[0].start,
                end_time: chunk[chunk.len() - 1].end,
                worn: worn_count * 2 > chunk.len(),
                worn_subwindows: worn_count as u32,
                total_subwindows: chunk.len() as u32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReconstructedSeries;
    use chrono::{TimeZone, Utc};
    use std::f64::consts::PI;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()
    }

    /// Series at the nominal rate with per-sample optical values
    fn make_series(
        seconds: f64,
        rate_hz: f64,
        optical: impl Fn(f64) -> [f64; 3],
    ) -> ReconstructedSeries {
        let n = (seconds * rate_hz) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / rate_hz;
                SeriesSample {
                    sequence: i as i64,
                    time: base_time() + Duration::nanoseconds((t * 1e9) as i64),
                    accel: [0.0; 3],
                    gyro: [0.0; 3],
                    optical: optical(t),
                    observed: true,
                }
            })
            .collect();
        ReconstructedSeries {
            samples,
            stats: Default::default(),
        }
    }

    /// Well-separated, in-range, pulsatile channels
    fn worn_optical(t: f64) -> [f64; 3] {
        let pulse = (2.0 * PI * 1.2 * t).sin() * 400.0;
        [20_000.0 + pulse, 52_000.0 + pulse, 6_000.0 + pulse]
    }

    #[test]
    fn test_worn_minute() {
        let series = make_series(60.0, 25.0, worn_optical);
        let windows = WearClassifier::classify(&series, &QualityConfig::default());
        assert_eq!(windows.len(), 1);
        assert!(windows[0].worn);
        assert_eq!(windows[0].total_subwindows, 6);
        assert_eq!(windows[0].worn_subwindows, 6);
    }

    #[test]
    fn test_all_zero_not_worn() {
        let series = make_series(60.0, 25.0, |_| [0.0; 3]);
        let windows = WearClassifier::classify(&series, &QualityConfig::default());
        assert_eq!(windows.len(), 1);
        assert!(!windows[0].worn);
        assert_eq!(windows[0].worn_subwindows, 0);
    }

    #[test]
    fn test_insufficient_coverage_fails_closed() {
        // half the nominal rate: perfect signal, too few samples per window
        let series = make_series(60.0, 12.0, worn_optical);
        let config = QualityConfig::default();
        let windows = WearClassifier::classify(&series, &config);
        assert!(windows.iter().all(|w| !w.worn));
    }

    #[test]
    fn test_absorption_ordering_violation_not_worn() {
        // green above red: every other check would pass
        let series = make_series(60.0, 25.0, |t| {
            let pulse = (2.0 * PI * 1.2 * t).sin() * 400.0;
            [20_000.0 + pulse, 52_000.0 + pulse, 21_000.0 + pulse]
        });
        let windows = WearClassifier::classify(&series, &QualityConfig::default());
        assert!(windows.iter().all(|w| !w.worn));
    }

    #[test]
    fn test_separation_too_small_not_worn() {
        // ordering holds but infrared sits only 5000 counts above red
        let series = make_series(60.0, 25.0, |t| {
            let pulse = (2.0 * PI * 1.2 * t).sin() * 400.0;
            [20_000.0 + pulse, 25_000.0 + pulse, 6_000.0 + pulse]
        });
        let windows = WearClassifier::classify(&series, &QualityConfig::default());
        assert!(windows.iter().all(|w| !w.worn));
    }

    #[test]
    fn test_no_pulse_not_worn() {
        // well-separated but flat channels
        let series = make_series(60.0, 25.0, |_| [20_000.0, 52_000.0, 6_000.0]);
        let windows = WearClassifier::classify(&series, &QualityConfig::default());
        assert!(windows.iter().all(|w| !w.worn));
    }

    #[test]
    fn test_majority_vote_tie_is_not_worn() {
        let sub: Vec<SubWindow> = (0..6)
            .map(|i| SubWindow {
                start: base_time() + Duration::seconds(10 * i),
                end: base_time() + Duration::seconds(10 * (i + 1)),
                worn: i % 2 == 0,
            })
            .collect();
        let windows = aggregate(&sub, &QualityConfig::default());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].worn_subwindows, 3);
        assert!(!windows[0].worn);
    }

    #[test]
    fn test_majority_vote_worn() {
        let sub: Vec<SubWindow> = (0..6)
            .map(|i| SubWindow {
                start: base_time() + Duration::seconds(10 * i),
                end: base_time() + Duration::seconds(10 * (i + 1)),
                worn: i != 0,
            })
            .collect();
        let windows = aggregate(&sub, &QualityConfig::default());
        assert!(windows[0].worn);
        assert_eq!(windows[0].worn_subwindows, 5);
    }

    #[test]
    fn test_partial_trailing_window() {
        // 90 seconds: one full aggregate window plus a 3-sub-window remainder
        let series = make_series(90.0, 25.0, worn_optical);
        let windows = WearClassifier::classify(&series, &QualityConfig::default());
        assert_eq!(windows.len(), 2);
        assert!(windows[0].worn);
        assert_eq!(windows[1].total_subwindows, 3);
        assert!(windows[1].worn);
    }

    #[test]
    fn test_empty_series() {
        let windows =
            WearClassifier::classify(&ReconstructedSeries::default(), &QualityConfig::default());
        assert!(windows.is_empty());
    }

    #[test]
    fn test_sub_window_boundaries_cover_series() {
        let series = make_series(60.0, 25.0, worn_optical);
        let config = QualityConfig::default();
        let sub = classify_sub_windows(&series.samples, &config);
        assert_eq!(sub.len(), 6);
        for (i, w) in sub.iter().enumerate() {
            assert_eq!(w.start, base_time() + Duration::seconds(10 * i as i64));
            assert_eq!(w.end, base_time() + Duration::seconds(10 * (i as i64 + 1)));
        }
    }
}
