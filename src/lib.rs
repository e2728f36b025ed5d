//! Throughput-driven adaptive bitrate (ABR) rule for segmented streaming.
//!
//! Given the download history and buffer snapshot for a video track, the
//! rule picks which rendition to request next: switch down after a single
//! slow download, switch up when both the harmonic-mean and the most
//! recent throughput clear the next rendition's bitrate, hold otherwise.
//!
//! ## Design
//!
//! - **Stateless**: every decision is a pure function of the
//!   [`DecisionContext`] snapshot handed in; nothing is retained between
//!   calls, so the rule is re-entrant and safe to share.
//! - **Never fails at decision time**: sparse telemetry degrades to the
//!   lowest rendition instead of an error; only a degenerate
//!   [`RuleOptions`] is rejected, at construction.
//! - **Narrow host contract**: the single side effect (clearing the
//!   scheduler's artificial load delay) goes through the
//!   [`ScheduleController`] trait, and hosts that swap strategies by name
//!   can hold the rule as a [`QualityRule`] trait object.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use llama_abr::{
//!     BufferState, DecisionContext, LlamaRule, MediaType, RuleOptions, ScheduleController,
//!     SwitchReason,
//! };
//!
//! struct ImmediateScheduler;
//!
//! impl ScheduleController for ImmediateScheduler {
//!     fn set_time_to_load_delay(&mut self, _delay: Duration) {}
//! }
//!
//! let rule = LlamaRule::new(RuleOptions::default())?;
//!
//! // Right after playback start there is no history yet, so the rule
//! // floors to the lowest rendition.
//! let ctx = DecisionContext {
//!     media_type: MediaType::Video,
//!     buffer_state: Some(BufferState::Loaded),
//!     buffer_level_secs: 0.0,
//!     history: &[],
//!     current_request: None,
//!     bitrates_kbps: &[500, 1000, 2000],
//!     current_quality: 0,
//!     is_dynamic: Some(false),
//! };
//!
//! let decision = rule.select_quality(&ctx, &mut ImmediateScheduler);
//! assert_eq!(decision.quality, Some(0));
//! assert_eq!(decision.reason, SwitchReason::StartUp);
//! # Ok::<(), llama_abr::ConfigError>(())
//! ```

#![forbid(unsafe_code)]

mod error;
mod estimator;
mod rule;
mod types;

pub use error::{AbrResult, ConfigError, EstimateError};
pub use estimator::{ThroughputEstimate, ThroughputEstimator};
pub use rule::{Decision, LlamaRule, QualityRule, ScheduleController, SwitchReason, RULE_NAME};
pub use types::{
    BufferState, DecisionContext, MediaType, RuleOptions, SegmentRecord, SegmentType, TraceSample,
};
