//! Sequence reconstruction and time interpolation
//!
//! A batch arrives as decoded samples ordered by transport arrival, with a
//! 10-bit counter that wraps every 1024 packets and a radio that drops,
//! duplicates, and occasionally reorders frames. This module recovers a
//! contiguous, evenly spaced series:
//!
//! 1. unwrap the counter across wraparounds
//! 2. account for loss (small gap = missed packets, large jump = sync error)
//! 3. drop duplicate sequence numbers, first seen wins
//! 4. densify to the full `[0, max]` range
//! 5. interpolate timestamps linearly between the first and last arrivals,
//!    assuming uniform spacing across the whole batch
//! 6. fill channel gaps by linear interpolation between observed neighbours,
//!    dropping any row that remains unfilled

use crate::config::ReconstructConfig;
use crate::types::{DecodedSample, LinkStats, ReconstructedSeries, SeriesSample, SEQUENCE_MODULUS};
use chrono::Duration;
use std::collections::BTreeMap;

/// Reconstructor over one ordered batch
pub struct Reconstructor;

impl Reconstructor {
    /// Rebuild the contiguous series for one user/day batch.
    ///
    /// Never fails: an empty batch produces an empty series, and transport
    /// damage is reported through [`LinkStats`] rather than errors.
    pub fn reconstruct(
        samples: &[DecodedSample],
        config: &ReconstructConfig,
    ) -> ReconstructedSeries {
        if samples.is_empty() {
            return ReconstructedSeries::default();
        }

        let raw: Vec<u16> = samples.iter().map(|s| s.sequence).collect();
        let mut stats = account_losses(&raw, config.max_gap);
        stats.received = samples.len();

        let unwrapped = unwrap_sequence(&raw, config.max_gap);
        let base = unwrapped[0];

        // Deduplicate on the re-based sequence, first seen wins. Out-of-order
        // stragglers that re-base below zero fall outside the densified range
        // and count as duplicates as well.
        let mut by_sequence: BTreeMap<i64, usize> = BTreeMap::new();
        for (i, &u) in unwrapped.iter().enumerate() {
            let sequence = u - base;
            if sequence < 0 {
                stats.duplicates += 1;
                continue;
            }
            if by_sequence.contains_key(&sequence) {
                stats.duplicates += 1;
            } else {
                by_sequence.insert(sequence, i);
            }
        }

        let max_sequence = match by_sequence.keys().next_back() {
            Some(&max) => max,
            None => {
                return ReconstructedSeries {
                    samples: Vec::new(),
                    stats,
                }
            }
        };
        let len = (max_sequence + 1) as usize;

        let mut dense: Vec<Option<[f64; 9]>> = vec![None; len];
        let mut observed = vec![false; len];
        for (&sequence, &i) in &by_sequence {
            dense[sequence as usize] = Some(channel_row(&samples[i]));
            observed[sequence as usize] = true;
        }

        // Fill gaps between observed neighbours; interpolation never
        // extrapolates past the first or last observed row.
        let observed_seqs: Vec<i64> = by_sequence.keys().copied().collect();
        for pair in observed_seqs.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b - a < 2 {
                continue;
            }
            let (Some(va), Some(vb)) = (dense[a as usize], dense[b as usize]) else {
                continue;
            };
            for s in (a + 1)..b {
                let frac = (s - a) as f64 / (b - a) as f64;
                let mut row = [0.0; 9];
                for (k, slot) in row.iter_mut().enumerate() {
                    *slot = va[k] + (vb[k] - va[k]) * frac;
                }
                dense[s as usize] = Some(row);
            }
        }

        // Uniform-spacing time base between the first and last arrivals
        let t_first = samples[0].capture_time;
        let t_last = samples[samples.len() - 1].capture_time;
        let span_ns = (t_last - t_first).num_nanoseconds().unwrap_or(0);
        let time_at = |sequence: i64| {
            if max_sequence == 0 {
                t_first
            } else {
                let offset = (span_ns as i128 * sequence as i128) / max_sequence as i128;
                t_first + Duration::nanoseconds(offset as i64)
            }
        };

        let mut rows = Vec::with_capacity(len);
        for (s, channels) in dense.into_iter().enumerate() {
            let Some(ch) = channels else { continue };
            rows.push(SeriesSample {
                sequence: s as i64,
                time: time_at(s as i64),
                accel: [ch[0], ch[1], ch[2]],
                gyro: [ch[3], ch[4], ch[5]],
                optical: [ch[6], ch[7], ch[8]],
                observed: observed[s],
            });
        }

        ReconstructedSeries {
            samples: rows,
            stats,
        }
    }
}

/// Resolve 10-bit counter wraparounds into a monotonically non-decreasing
/// sequence.
///
/// A drop of more than `1024 - max_gap` between neighbouring raw values is a
/// wraparound and adds 1024 to everything after it; smaller drops are
/// duplication or reordering and are left for the dedup pass.
pub fn unwrap_sequence(raw: &[u16], max_gap: i64) -> Vec<i64> {
    let mut offset = 0i64;
    let mut prev: Option<i64> = None;
    let mut out = Vec::with_capacity(raw.len());
    for &value in raw {
        let value = value as i64;
        if let Some(p) = prev {
            if value - p < -(SEQUENCE_MODULUS - max_gap) {
                offset += SEQUENCE_MODULUS;
            }
        }
        out.push(value + offset);
        prev = Some(value);
    }
    out
}

/// Classify successive raw-counter differences, taken mod 1024: zero is a
/// duplicate (counted by the dedup pass), anything above `max_gap` is a sync
/// error, and the rest imply `d - 1` missed packets.
fn account_losses(raw: &[u16], max_gap: i64) -> LinkStats {
    let mut stats = LinkStats::default();
    for pair in raw.windows(2) {
        let d = (pair[1] as i64 - pair[0] as i64).rem_euclid(SEQUENCE_MODULUS);
        if d == 0 {
            continue;
        }
        if d > max_gap {
            stats.sync_errors += 1;
        } else {
            stats.missed += (d - 1) as u64;
        }
    }
    stats
}

fn channel_row(sample: &DecodedSample) -> [f64; 9] {
    [
        sample.accel[0] as f64,
        sample.accel[1] as f64,
        sample.accel[2] as f64,
        sample.gyro[0] as f64,
        sample.gyro[1] as f64,
        sample.gyro[2] as f64,
        sample.optical[0] as f64,
        sample.optical[1] as f64,
        sample.optical[2] as f64,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const MAX_GAP: i64 = 50;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()
    }

    fn make_sample(sequence: u16, at: DateTime<Utc>, accel_x: i16) -> DecodedSample {
        DecodedSample {
            sequence,
            accel: [accel_x, 0, 0],
            gyro: [0, 0, 0],
            optical: [2_000, 8_000, 1_000],
            capture_time: at,
        }
    }

    fn batch(seqs: &[u16]) -> Vec<DecodedSample> {
        seqs.iter()
            .enumerate()
            .map(|(i, &s)| make_sample(s, base_time() + Duration::milliseconds(40 * i as i64), 0))
            .collect()
    }

    #[test]
    fn test_unwrap_wraparound() {
        let raw = [1020, 1021, 1022, 1023, 0, 1, 2];
        let expected = vec![1020, 1021, 1022, 1023, 1024, 1025, 1026];
        assert_eq!(unwrap_sequence(&raw, MAX_GAP), expected);
    }

    #[test]
    fn test_unwrap_multiple_wraparounds() {
        let raw = [1000, 20, 1010, 5];
        let expected = vec![1000, 1044, 2034, 2053];
        assert_eq!(unwrap_sequence(&raw, MAX_GAP), expected);
    }

    #[test]
    fn test_unwrap_small_backstep_is_not_a_wrap() {
        let raw = [5, 3, 9];
        assert_eq!(unwrap_sequence(&raw, MAX_GAP), vec![5, 3, 9]);
    }

    #[test]
    fn test_gap_accounting() {
        let series = Reconstructor::reconstruct(&batch(&[0, 1, 4, 5]), &ReconstructConfig::default());
        assert_eq!(series.stats.missed, 2);
        assert_eq!(series.stats.sync_errors, 0);
        assert_eq!(series.stats.received, 4);
    }

    #[test]
    fn test_sync_error_counted_not_fatal() {
        let series = Reconstructor::reconstruct(&batch(&[0, 200]), &ReconstructConfig::default());
        assert_eq!(series.stats.sync_errors, 1);
        assert_eq!(series.stats.missed, 0);
        // the jump is still densified and time-filled
        assert_eq!(series.samples.len(), 201);
    }

    #[test]
    fn test_wraparound_gap_counts_as_ordinary_loss() {
        let series =
            Reconstructor::reconstruct(&batch(&[1022, 1023, 2, 3]), &ReconstructConfig::default());
        // 1023 -> 2 skips sequence 0 and 1
        assert_eq!(series.stats.missed, 2);
        assert_eq!(series.stats.sync_errors, 0);
        assert_eq!(series.samples.len(), 6);
    }

    #[test]
    fn test_duplicates_first_seen_wins() {
        let t = base_time();
        let samples = vec![
            make_sample(0, t, 10),
            make_sample(1, t + Duration::milliseconds(40), 20),
            make_sample(1, t + Duration::milliseconds(80), 99),
            make_sample(2, t + Duration::milliseconds(120), 30),
        ];
        let series = Reconstructor::reconstruct(&samples, &ReconstructConfig::default());
        assert_eq!(series.stats.duplicates, 1);
        assert_eq!(series.samples.len(), 3);
        assert_eq!(series.samples[1].accel[0], 20.0);
    }

    #[test]
    fn test_densify_is_contiguous_and_monotone() {
        let series = Reconstructor::reconstruct(&batch(&[0, 2, 5]), &ReconstructConfig::default());
        assert_eq!(series.samples.len(), 6);
        for (i, row) in series.samples.iter().enumerate() {
            assert_eq!(row.sequence, i as i64);
        }
        for pair in series.samples.windows(2) {
            assert!(pair[1].time > pair[0].time);
        }
    }

    #[test]
    fn test_time_and_channel_interpolation() {
        let t = base_time();
        let samples = vec![
            make_sample(0, t, 0),
            make_sample(10, t + Duration::seconds(10), 100),
        ];
        let series = Reconstructor::reconstruct(&samples, &ReconstructConfig::default());
        assert_eq!(series.samples.len(), 11);
        assert_eq!(series.stats.missed, 9);

        let mid = &series.samples[5];
        assert_eq!(mid.time, t + Duration::seconds(5));
        assert_eq!(mid.accel[0], 50.0);
        assert!(!mid.observed);
        assert!(series.samples[0].observed);
        assert!(series.samples[10].observed);

        // never extrapolates past the observed ends
        assert_eq!(series.samples[0].time, t);
        assert_eq!(series.samples[10].time, t + Duration::seconds(10));
    }

    #[test]
    fn test_out_of_order_straggler_dropped_as_duplicate() {
        let series = Reconstructor::reconstruct(&batch(&[5, 3, 9]), &ReconstructConfig::default());
        // 3 re-bases below the batch start and is discarded
        assert_eq!(series.stats.duplicates, 1);
        assert_eq!(series.samples.len(), 5);
        assert_eq!(series.samples[0].sequence, 0);
        assert_eq!(series.samples[4].sequence, 4);
    }

    #[test]
    fn test_empty_batch() {
        let series = Reconstructor::reconstruct(&[], &ReconstructConfig::default());
        assert!(series.is_empty());
        assert_eq!(series.stats, LinkStats::default());
    }

    #[test]
    fn test_single_sample() {
        let series = Reconstructor::reconstruct(&batch(&[42]), &ReconstructConfig::default());
        assert_eq!(series.samples.len(), 1);
        assert_eq!(series.samples[0].sequence, 0);
        assert_eq!(series.samples[0].time, base_time());
        assert!(series.samples[0].observed);
    }
}
