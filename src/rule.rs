use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::{
    error::{AbrResult, ConfigError, EstimateError},
    estimator::ThroughputEstimator,
    types::{DecisionContext, MediaType, RuleOptions},
};

/// Name the host registers this rule under.
pub const RULE_NAME: &str = "LlamaABR";

/// Handle to the host's download scheduler.
///
/// The rule's only side effect goes through here: clearing any pending
/// artificial load delay whenever a steady-state decision is made.
#[cfg_attr(test, automock)]
pub trait ScheduleController {
    fn set_time_to_load_delay(&mut self, delay: Duration);
}

/// Which guard produced the decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchReason {
    /// The context violated the host contract (empty bitrate list or
    /// out-of-range quality index).
    IncompleteContext,
    /// Audio contexts are never adapted by this rule.
    AudioPassThrough,
    /// The metrics collector reported no buffer state yet.
    NoBufferState,
    /// Too little history right after start or a seek.
    StartUp,
    /// The history passed the start-up gate but held no usable sample,
    /// or the current request carries no timing trace.
    InsufficientSamples,
    /// The last download could not sustain the current bitrate.
    SwitchDown,
    /// Both estimates clear the next rendition's bitrate.
    SwitchUp,
    /// Neither switch condition fired.
    Hold,
}

impl std::fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let explanation = match self {
            Self::IncompleteContext => "No rule context.",
            Self::AudioPassThrough => "Audio pass-through.",
            Self::NoBufferState => "No buffer state.",
            Self::StartUp => "Start-up phase.",
            Self::InsufficientSamples => "No usable throughput samples.",
            Self::SwitchDown => "Switch down.",
            Self::SwitchUp => "Switch up.",
            Self::Hold => "Hold current quality.",
        };
        f.write_str(explanation)
    }
}

/// Outcome of one rule invocation, consumed by the scheduler and dropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    /// Quality index to request next, or `None` when the rule declines to
    /// override (audio, broken context).
    pub quality: Option<usize>,
    pub reason: SwitchReason,
    /// Throughput figure (kbps) that drove the decision: instantaneous for
    /// a down-switch, harmonic for up-switch and hold.
    pub throughput_kbps: Option<f64>,
}

impl Decision {
    /// Rule name carried in every decision, for host-side diagnostics.
    pub const RULE: &'static str = RULE_NAME;

    /// Decline to pick a quality at all.
    fn no_override(reason: SwitchReason) -> Self {
        Self {
            quality: None,
            reason,
            throughput_kbps: None,
        }
    }

    /// Fail safe to the lowest rendition.
    fn floor(reason: SwitchReason) -> Self {
        Self {
            quality: Some(0),
            reason,
            throughput_kbps: None,
        }
    }
}

/// Object-safe interface ABR strategies expose to the host.
///
/// Hosts keep their own name-to-strategy table; nothing in this crate
/// registers anything.
pub trait QualityRule {
    fn name(&self) -> &'static str;

    fn select_quality(
        &self,
        ctx: &DecisionContext<'_>,
        schedule: &mut dyn ScheduleController,
    ) -> Decision;
}

/// Throughput-driven three-way switch rule.
///
/// Holds only validated configuration; every decision is a pure function
/// of the context snapshot, so the rule is re-entrant and `Sync`.
#[derive(Clone, Debug)]
pub struct LlamaRule {
    opts: RuleOptions,
    estimator: ThroughputEstimator,
}

impl LlamaRule {
    pub fn new(opts: RuleOptions) -> AbrResult<Self> {
        if opts.harmonic_window == 0 {
            return Err(ConfigError::EmptyHarmonicWindow(opts.harmonic_window));
        }
        if !opts.throughput_safety_factor.is_finite() || opts.throughput_safety_factor <= 0.0 {
            return Err(ConfigError::InvalidSafetyFactor(
                opts.throughput_safety_factor,
            ));
        }
        if opts.startup_history_len == 0 {
            return Err(ConfigError::EmptyStartupThreshold(opts.startup_history_len));
        }

        let estimator = ThroughputEstimator::new(&opts);
        Ok(Self { opts, estimator })
    }

    /// Pick the quality index for the next segment request.
    ///
    /// Guards are evaluated in strict order; the first match wins. Every
    /// path yields a decision: data sparsity degrades to the lowest
    /// quality instead of an error.
    pub fn select_quality(
        &self,
        ctx: &DecisionContext<'_>,
        schedule: &mut dyn ScheduleController,
    ) -> Decision {
        let Some(last) = ctx.bitrates_kbps.len().checked_sub(1) else {
            tracing::warn!("decision context carries an empty bitrate list");
            return Decision::no_override(SwitchReason::IncompleteContext);
        };
        if ctx.current_quality > last {
            tracing::warn!(
                current_quality = ctx.current_quality,
                bitrate_count = ctx.bitrates_kbps.len(),
                "current quality index out of range"
            );
            return Decision::no_override(SwitchReason::IncompleteContext);
        }

        if ctx.media_type == MediaType::Audio {
            return Decision::no_override(SwitchReason::AudioPassThrough);
        }

        if ctx.buffer_state.is_none() {
            tracing::debug!("no buffer state reported, floor quality");
            return Decision::floor(SwitchReason::NoBufferState);
        }

        if ctx.history.len() < self.opts.startup_history_len {
            tracing::debug!(
                history_len = ctx.history.len(),
                threshold = self.opts.startup_history_len,
                "start-up phase, floor quality"
            );
            return Decision::floor(SwitchReason::StartUp);
        }

        let estimate = match ctx.current_request {
            Some(current) => self.estimator.estimate(ctx.history, current),
            None => Err(EstimateError::MissingTelemetry),
        };
        let estimate = match estimate {
            Ok(est) => est,
            Err(err) => {
                tracing::warn!(%err, "throughput estimate unavailable, floor quality");
                return Decision::floor(SwitchReason::InsufficientSamples);
            }
        };

        let current = ctx.current_quality;
        let higher = (current + 1).min(last);
        let lower = current.saturating_sub(1);

        // Steady state always requests immediate scheduling.
        schedule.set_time_to_load_delay(Duration::ZERO);

        let current_bitrate = ctx.bitrates_kbps[current] as f64;
        let higher_bitrate = ctx.bitrates_kbps[higher] as f64;

        tracing::debug!(
            current,
            current_bitrate,
            higher_bitrate,
            harmonic_kbps = estimate.harmonic_kbps,
            instantaneous_kbps = estimate.instantaneous_kbps,
            buffer_level_secs = ctx.buffer_level_secs,
            "evaluating switch"
        );

        // A single bad download drops quality regardless of the longer
        // harmonic trend.
        if estimate.instantaneous_kbps < current_bitrate {
            return Decision {
                quality: Some(lower),
                reason: SwitchReason::SwitchDown,
                throughput_kbps: Some(estimate.instantaneous_kbps),
            };
        }

        // Up-switch needs both the sustained estimate and the latest
        // sample above the next rendition's bitrate.
        if estimate.harmonic_kbps > higher_bitrate
            && estimate.instantaneous_kbps > higher_bitrate
            && ctx.buffer_level_secs >= self.opts.min_buffer_level_secs
        {
            return Decision {
                quality: Some(higher),
                reason: SwitchReason::SwitchUp,
                throughput_kbps: Some(estimate.harmonic_kbps),
            };
        }

        Decision {
            quality: Some(current),
            reason: SwitchReason::Hold,
            throughput_kbps: Some(estimate.harmonic_kbps),
        }
    }
}

impl QualityRule for LlamaRule {
    fn name(&self) -> &'static str {
        RULE_NAME
    }

    fn select_quality(
        &self,
        ctx: &DecisionContext<'_>,
        schedule: &mut dyn ScheduleController,
    ) -> Decision {
        Self::select_quality(self, ctx, schedule)
    }
}
