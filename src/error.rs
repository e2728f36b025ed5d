use thiserror::Error;

/// Result type used by `llama-abr`.
pub type AbrResult<T> = Result<T, ConfigError>;

/// Fatal misconfiguration detected when constructing the rule.
///
/// These are never produced during decision-making: once a rule is built,
/// every decision path resolves to a safe value instead of an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("harmonic window must hold at least one sample, got {0}")]
    EmptyHarmonicWindow(usize),

    #[error("throughput safety factor must be positive and finite, got {0}")]
    InvalidSafetyFactor(f64),

    #[error("start-up history threshold must be at least 1, got {0}")]
    EmptyStartupThreshold(usize),
}

/// Why a throughput estimate could not be produced.
///
/// Recovered inside the rule (resolved to a lowest-quality decision),
/// never surfaced to the caller.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum EstimateError {
    /// The most recent download carries no usable timing trace.
    #[error("current request has no usable timing trace")]
    MissingTelemetry,

    /// The history held no usable media-segment sample inside the window,
    /// so the harmonic mean is undefined.
    #[error("no usable media-segment samples in the estimation window")]
    NoUsableSamples,
}
