use crate::{
    error::EstimateError,
    types::{RuleOptions, SegmentRecord, TraceSample},
};

/// Throughput figures produced for one decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputEstimate {
    /// Harmonic mean over the most recent usable history samples, kbps.
    pub harmonic_kbps: f64,
    /// Throughput of the single most recent download, kbps.
    pub instantaneous_kbps: f64,
}

/// Stateless throughput estimator over segment-download timing traces.
///
/// All estimation happens on the history snapshot passed in per call;
/// nothing is retained between calls.
#[derive(Clone, Copy, Debug)]
pub struct ThroughputEstimator {
    window: usize,
    safety_factor: f64,
}

impl ThroughputEstimator {
    pub fn new(opts: &RuleOptions) -> Self {
        Self {
            window: opts.harmonic_window,
            safety_factor: opts.throughput_safety_factor,
        }
    }

    /// Compute both estimates for one decision.
    pub fn estimate(
        &self,
        history: &[SegmentRecord],
        current: &SegmentRecord,
    ) -> Result<ThroughputEstimate, EstimateError> {
        Ok(ThroughputEstimate {
            harmonic_kbps: self.harmonic_mean_kbps(history)?,
            instantaneous_kbps: self.instantaneous_kbps(current)?,
        })
    }

    /// Throughput of a single download, taken from its trace alone.
    ///
    /// Unlike the harmonic path this does not filter on segment type or
    /// completion timestamps; the most recent request is measured as-is.
    pub fn instantaneous_kbps(&self, current: &SegmentRecord) -> Result<f64, EstimateError> {
        let kbps =
            trace_throughput_kbps(&current.trace).ok_or(EstimateError::MissingTelemetry)?;
        Ok(kbps * self.safety_factor)
    }

    /// Harmonic mean over the most recent usable samples, newest first,
    /// capped at the configured window.
    ///
    /// The harmonic mean weights slow downloads more heavily than an
    /// arithmetic mean would, which keeps the figure conservative for
    /// gating up-switches.
    pub fn harmonic_mean_kbps(&self, history: &[SegmentRecord]) -> Result<f64, EstimateError> {
        let mut reciprocal_sum = 0.0;
        let mut samples = 0usize;

        for record in history.iter().rev() {
            if !record.is_usable_for_throughput() {
                continue;
            }
            let Some(kbps) = trace_throughput_kbps(&record.trace) else {
                continue;
            };
            if kbps <= 0.0 {
                continue;
            }

            reciprocal_sum += 1.0 / kbps;
            samples += 1;
            if samples >= self.window {
                break;
            }
        }

        if samples == 0 {
            return Err(EstimateError::NoUsableSamples);
        }

        let mean = samples as f64 / reciprocal_sum;
        Ok(mean * self.safety_factor)
    }
}

/// Per-segment throughput in kbps: `8 * bytes / duration_ms`, rounded.
///
/// Returns `None` for an empty trace or one spanning no elapsed time.
fn trace_throughput_kbps(trace: &[TraceSample]) -> Option<f64> {
    if trace.is_empty() {
        return None;
    }

    let bytes: u64 = trace.iter().map(|s| s.bytes).sum();
    let millis: f64 = trace
        .iter()
        .map(|s| s.duration.as_secs_f64() * 1000.0)
        .sum();
    if millis <= 0.0 {
        return None;
    }

    Some((8.0 * bytes as f64 / millis).round())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_relative_eq;
    use rstest::rstest;
    use web_time::Instant;

    use super::*;
    use crate::types::SegmentType;

    /// Fully-timed media record whose trace yields `kbps` exactly:
    /// `8 * bytes / 1000ms = kbps` when `bytes = kbps * 125`.
    fn media_record(kbps: u64) -> SegmentRecord {
        let now = Instant::now();
        SegmentRecord {
            segment_type: SegmentType::Media,
            request_started_at: Some(now),
            response_started_at: Some(now),
            finished_at: Some(now),
            trace: vec![TraceSample {
                bytes: kbps * 125,
                duration: Duration::from_millis(1000),
            }],
        }
    }

    fn estimator(window: usize, safety: f64) -> ThroughputEstimator {
        ThroughputEstimator::new(&RuleOptions {
            harmonic_window: window,
            throughput_safety_factor: safety,
            ..RuleOptions::default()
        })
    }

    #[rstest]
    #[case(125_000, 1000, 1000.0)] // 1 Mbps: 125 kB over 1 s
    #[case(250_000, 500, 4000.0)] // same bytes, half the time
    #[case(1, 1000, 0.0)] // 8 bits over 1 s rounds to 0 kbps
    fn single_download_throughput(
        #[case] bytes: u64,
        #[case] millis: u64,
        #[case] expected_kbps: f64,
    ) {
        let trace = vec![TraceSample {
            bytes,
            duration: Duration::from_millis(millis),
        }];
        assert_relative_eq!(trace_throughput_kbps(&trace).unwrap(), expected_kbps);
    }

    #[test]
    fn chunked_trace_sums_before_dividing() {
        // 100 kB over 400 ms + 150 kB over 600 ms = 250 kB over 1 s = 2000 kbps
        let trace = vec![
            TraceSample {
                bytes: 100_000,
                duration: Duration::from_millis(400),
            },
            TraceSample {
                bytes: 150_000,
                duration: Duration::from_millis(600),
            },
        ];
        assert_relative_eq!(trace_throughput_kbps(&trace).unwrap(), 2000.0);
    }

    #[test]
    fn empty_or_zero_duration_trace_yields_none() {
        assert_eq!(trace_throughput_kbps(&[]), None);
        let zero = vec![TraceSample {
            bytes: 1000,
            duration: Duration::ZERO,
        }];
        assert_eq!(trace_throughput_kbps(&zero), None);
    }

    #[test]
    fn harmonic_mean_weights_slow_samples() {
        // 3 / (1/1000 + 1/2000 + 1/4000) = 1714.285...
        let history = vec![media_record(1000), media_record(2000), media_record(4000)];
        let mean = estimator(10, 1.0).harmonic_mean_kbps(&history).unwrap();
        assert_relative_eq!(mean, 1714.2857, max_relative = 1e-4);
    }

    #[test]
    fn harmonic_mean_only_counts_newest_window() {
        // 15 usable records; only the most recent 10 (2000 kbps) may count.
        let mut history = vec![media_record(100); 5];
        history.extend(std::iter::repeat_with(|| media_record(2000)).take(10));

        let mean = estimator(10, 1.0).harmonic_mean_kbps(&history).unwrap();
        assert_relative_eq!(mean, 2000.0, max_relative = 1e-9);
    }

    #[test]
    fn unusable_records_are_skipped_not_counted() {
        let mut init = media_record(9999);
        init.segment_type = SegmentType::Init;
        let mut in_flight = media_record(9999);
        in_flight.finished_at = None;

        let history = vec![media_record(1000), init, in_flight];
        let mean = estimator(10, 1.0).harmonic_mean_kbps(&history).unwrap();
        assert_relative_eq!(mean, 1000.0);
    }

    #[test]
    fn no_usable_samples_is_an_explicit_error() {
        let mut init = media_record(1000);
        init.segment_type = SegmentType::Init;
        let history = vec![init.clone(), init.clone(), init.clone(), init.clone(), init];

        let err = estimator(10, 1.0).harmonic_mean_kbps(&history).unwrap_err();
        assert_eq!(err, EstimateError::NoUsableSamples);
    }

    #[test]
    fn instantaneous_ignores_usability_filtering() {
        // An in-flight non-media record still measures, trace permitting.
        let mut record = media_record(1500);
        record.segment_type = SegmentType::Other;
        record.finished_at = None;

        let kbps = estimator(10, 1.0).instantaneous_kbps(&record).unwrap();
        assert_relative_eq!(kbps, 1500.0);
    }

    #[test]
    fn instantaneous_without_trace_is_missing_telemetry() {
        let mut record = media_record(1000);
        record.trace.clear();

        let err = estimator(10, 1.0).instantaneous_kbps(&record).unwrap_err();
        assert_eq!(err, EstimateError::MissingTelemetry);
    }

    #[test]
    fn safety_factor_scales_both_estimates() {
        let history = vec![media_record(1000); 5];
        let est = estimator(10, 0.5)
            .estimate(&history, history.last().unwrap())
            .unwrap();
        assert_relative_eq!(est.harmonic_kbps, 500.0);
        assert_relative_eq!(est.instantaneous_kbps, 500.0);
    }
}
