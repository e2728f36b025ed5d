use std::time::Duration;

use web_time::Instant;

/// Media track the decision applies to.
///
/// The rule only adapts video; audio contexts pass through untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MediaType {
    Video,
    Audio,
}

/// Kind of HTTP exchange a [`SegmentRecord`] describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentType {
    /// A media segment carrying playable content. Only these feed the
    /// harmonic-mean estimate.
    Media,
    /// An initialization segment (codec/container headers).
    Init,
    /// Anything else (manifest refresh, license request, ...).
    Other,
}

/// One byte/duration sub-interval of a segment download.
///
/// Progressive and chunked transfers report several of these per segment;
/// a plain download reports one covering the whole response body.
#[derive(Clone, Copy, Debug)]
pub struct TraceSample {
    /// Bytes transferred during this sub-interval.
    pub bytes: u64,
    /// Wall-clock time the sub-interval spanned.
    pub duration: Duration,
}

/// One completed (or in-flight) segment download, as reported by the
/// host's metrics collector.
#[derive(Clone, Debug)]
pub struct SegmentRecord {
    pub segment_type: SegmentType,
    /// When the request was issued. `None` while unknown.
    pub request_started_at: Option<Instant>,
    /// When the first response byte arrived.
    pub response_started_at: Option<Instant>,
    /// When the download completed. `None` for in-flight downloads.
    pub finished_at: Option<Instant>,
    /// Sub-interval timing samples for the response body.
    pub trace: Vec<TraceSample>,
}

impl SegmentRecord {
    /// Whether this record may contribute a sample to the harmonic mean.
    ///
    /// Requires a fully-timed media segment with at least one trace sample.
    pub fn is_usable_for_throughput(&self) -> bool {
        self.segment_type == SegmentType::Media
            && self.finished_at.is_some()
            && self.request_started_at.is_some()
            && self.response_started_at.is_some()
            && !self.trace.is_empty()
    }
}

/// Player buffer condition as reported by the host.
///
/// The rule only cares whether a state was reported at all; a missing
/// state forces the lowest quality.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BufferState {
    /// Enough data buffered for uninterrupted playback.
    Loaded,
    /// Playback stalled waiting for data.
    Stalled,
}

/// Immutable per-decision snapshot of everything the rule reads.
///
/// The host assembles one of these from its metrics collector before each
/// scheduling opportunity. Telemetry sparsity is explicit: optional fields
/// model data the collector may not have yet, and the rule resolves their
/// absence to a safe floor decision rather than an error.
#[derive(Clone, Debug)]
pub struct DecisionContext<'a> {
    pub media_type: MediaType,
    /// Buffer condition, or `None` when the collector has not reported one.
    pub buffer_state: Option<BufferState>,
    /// Seconds of media buffered ahead of the playhead.
    pub buffer_level_secs: f64,
    /// Download history for this media type, most recent last.
    pub history: &'a [SegmentRecord],
    /// The most recently started download, if any.
    pub current_request: Option<&'a SegmentRecord>,
    /// Available rendition bitrates in kbps, lowest first, index-aligned
    /// with quality indices.
    pub bitrates_kbps: &'a [u64],
    /// Quality index currently being played/requested.
    pub current_quality: usize,
    /// Whether the stream is live (`true`), on-demand (`false`), or
    /// undetermined. Carried for parity with the host context; the policy
    /// does not read it.
    pub is_dynamic: Option<bool>,
}

/// Rule configuration.
///
/// Defaults reproduce the reference tuning: no safety margin, a ten-sample
/// harmonic window, a five-record start-up gate, and a buffer gate that is
/// effectively always open.
#[derive(Clone)]
pub struct RuleOptions {
    /// Multiplier applied to both throughput estimates before the policy
    /// compares them against rendition bitrates. Values below 1.0 make the
    /// rule more conservative.
    pub throughput_safety_factor: f64,
    /// Maximum number of usable history samples feeding the harmonic mean.
    pub harmonic_window: usize,
    /// Minimum history length before the rule leaves the start-up floor.
    pub startup_history_len: usize,
    /// Buffer level (seconds) required before an up-switch. The reference
    /// value of -1.0 admits any non-negative reading.
    pub min_buffer_level_secs: f64,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            throughput_safety_factor: 1.0,
            harmonic_window: 10,
            startup_history_len: 5,
            min_buffer_level_secs: -1.0,
        }
    }
}

impl std::fmt::Debug for RuleOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleOptions")
            .field("throughput_safety_factor", &self.throughput_safety_factor)
            .field("harmonic_window", &self.harmonic_window)
            .field("startup_history_len", &self.startup_history_len)
            .field("min_buffer_level_secs", &self.min_buffer_level_secs)
            .finish()
    }
}
