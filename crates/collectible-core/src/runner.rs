//! Session loop runner with run controls.
//!
//! [`run_session`] drives every participant of an in-process session one
//! tick at a time, in a fixed order, with support for:
//!
//! - **Bounded runs**: stop after `max_ticks`
//! - **Variable tick speed**: interval adjustable while running
//! - **Clean stop**: a stop request ends the loop before the next tick
//!
//! Participants never run concurrently with each other; they communicate
//! only through their replication channels.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{info, warn};

use crate::participant::{Participant, TickError, TickSummary};
use crate::ports::{ActionChannel, IdentityProvider, SceneEngine};

/// Errors that can occur during the session run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A participant's tick failed.
    #[error("tick error in {participant}: {source}")]
    Tick {
        /// The participant whose tick failed.
        participant: String,
        /// The underlying tick error.
        source: TickError,
    },
}

/// Reason the session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// A stop was requested.
    StopRequested,
}

/// Shared run controls.
///
/// Atomic fields so a controller task can adjust the loop without locks.
#[derive(Debug)]
pub struct RunControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,
    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,
    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,
}

impl RunControl {
    /// Create run controls.
    pub const fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            max_ticks,
        }
    }

    /// Request a clean stop before the next tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the tick interval. Returns the previous value.
    pub fn set_tick_interval_ms(&self, interval_ms: u64) -> u64 {
        self.tick_interval_ms.swap(interval_ms, Ordering::AcqRel)
    }

    /// Configured tick limit (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether `completed` ticks reach the limit.
    pub const fn tick_limit_reached(&self, completed: u64) -> bool {
        self.max_ticks > 0 && completed >= self.max_ticks
    }
}

/// Result of the session run.
#[derive(Debug)]
pub struct SessionResult {
    /// The reason the session ended.
    pub end_reason: SessionEndReason,
    /// Per-participant summaries of the last completed tick.
    pub final_summaries: Vec<TickSummary>,
    /// Total number of session ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after every participant has run a tick.
///
/// Receives the participants mutably so drivers can move avatars between
/// ticks.
pub trait TickCallback<C, S, I> {
    /// Called after a session tick completes.
    fn on_tick(
        &mut self,
        tick: u64,
        participants: &mut [Participant<C, S, I>],
        summaries: &[TickSummary],
    );
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl<C, S, I> TickCallback<C, S, I> for NoOpCallback {
    fn on_tick(
        &mut self,
        _tick: u64,
        _participants: &mut [Participant<C, S, I>],
        _summaries: &[TickSummary],
    ) {
    }
}

/// Run the session loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if any participant's tick fails.
pub async fn run_session<C, S, I>(
    participants: &mut [Participant<C, S, I>],
    control: &RunControl,
    callback: &mut dyn TickCallback<C, S, I>,
) -> Result<SessionResult, RunnerError>
where
    C: ActionChannel,
    S: SceneEngine,
    I: IdentityProvider,
{
    let mut final_summaries = Vec::new();
    let mut total_ticks: u64 = 0;

    info!(
        participants = participants.len(),
        max_ticks = control.max_ticks(),
        tick_interval_ms = control.tick_interval_ms(),
        "Session starting"
    );

    loop {
        // --- Check stop request (before tick) ---
        if control.is_stop_requested() {
            info!(total_ticks, "Stop requested");
            return Ok(SessionResult {
                end_reason: SessionEndReason::StopRequested,
                final_summaries,
                total_ticks,
            });
        }

        // --- Execute tick ---
        let mut summaries = Vec::with_capacity(participants.len());
        for participant in participants.iter_mut() {
            let summary = participant
                .run_tick()
                .map_err(|source| RunnerError::Tick {
                    participant: participant.name().to_owned(),
                    source,
                })?;
            summaries.push(summary);
        }
        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(total_ticks, participants, &summaries);
        final_summaries = summaries;

        // --- Check tick limit (after tick) ---
        if control.tick_limit_reached(total_ticks) {
            info!(
                total_ticks,
                max_ticks = control.max_ticks(),
                "Tick limit reached"
            );
            return Ok(SessionResult {
                end_reason: SessionEndReason::MaxTicksReached,
                final_summaries,
                total_ticks,
            });
        }

        // --- Sleep for tick interval ---
        let interval_ms = control.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log the session end.
pub fn log_session_end(result: &SessionResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "Session ended"
    );
    if result.final_summaries.is_empty() {
        warn!("Session ended with no ticks executed");
    }
    for summary in &result.final_summaries {
        info!(
            tick = summary.tick,
            live_items = summary.live_items,
            version = summary.version,
            "Final participant summary"
        );
    }
}
