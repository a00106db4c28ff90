//! One participant's tick cycle.
//!
//! Each tick runs these phases in order:
//!
//! 1. **Clock** -- advance the local tick counter.
//! 2. **Receive** -- drain delivered frames, decode, fold through the
//!    dispatcher, and append state-changing envelopes to the action log.
//! 3. **Spawn** -- evaluate the authority spawn policy (authority only).
//! 4. **Trigger** -- turn local-avatar overlaps into destroy actions.
//! 5. **Bind** -- run the reactive binder pass, only when the state
//!    version moved since the last complete pass.
//!
//! Dispatch is fire-and-forget: a participant's own actions reach its
//! state through the same receive phase as everyone else's, on a later
//! tick.

use collectible_events::{ActionLog, LogError};
use collectible_state::{ApplyOutcome, ReplicatedState};
use collectible_types::{Action, ActionEnvelope, EntityHandle, WireError, decode, encode};
use tracing::{debug, info, warn};

use crate::binder::{BindReport, EntityBinder};
use crate::clock::{ClockError, TickClock};
use crate::config::SessionConfig;
use crate::ports::{
    ActionChannel, ChannelError, CollectibleSpec, IdentityProvider, SceneEngine,
};
use crate::spawn::{SpawnDecision, SpawnPolicy};
use crate::trigger::{BridgeDecision, TriggerBridge};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The replication channel failed.
    #[error("channel error: {source}")]
    Channel {
        /// The underlying channel error.
        #[from]
        source: ChannelError,
    },

    /// An outbound envelope could not be encoded.
    #[error("encode error: {source}")]
    Encode {
        /// The underlying wire error.
        #[from]
        source: WireError,
    },

    /// The action log refused an entry.
    #[error("action log error: {source}")]
    Log {
        /// The underlying log error.
        #[from]
        source: LogError,
    },

    /// The outbound sequence counter would overflow.
    #[error("outbound sequence overflow")]
    SequenceOverflow,
}

/// Counts from the receive phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Frames drained from the channel.
    pub frames: usize,
    /// Envelopes that changed state.
    pub applied: usize,
    /// Spawns that overwrote a live handle.
    pub overwrites: usize,
    /// Destroys for handles that were not live.
    pub stale_destroys: usize,
    /// Redelivered envelopes dropped.
    pub duplicates: usize,
    /// Envelopes dropped by validation.
    pub rejected: usize,
    /// Frames that failed to decode.
    pub malformed: usize,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Receive phase counts.
    pub received: ReceiveStats,
    /// Spawn phase outcome.
    pub spawn: SpawnDecision,
    /// Items the local avatar collected this tick.
    pub collected: Vec<EntityHandle>,
    /// Reactive pass report, if the pass ran.
    pub bind: Option<BindReport>,
    /// Live items after the tick.
    pub live_items: usize,
    /// State version after the tick.
    pub version: u64,
}

/// A process taking part in a replicated collectible session.
#[derive(Debug)]
pub struct Participant<C, S, I> {
    name: String,
    channel: C,
    scene: S,
    identity: I,
    state: ReplicatedState,
    log: ActionLog,
    binder: EntityBinder,
    policy: SpawnPolicy,
    bridge: TriggerBridge,
    clock: TickClock,
    next_sequence: u64,
    /// State version the binder last fully converged on.
    bound_version: Option<u64>,
}

impl<C, S, I> Participant<C, S, I>
where
    C: ActionChannel,
    S: SceneEngine,
    I: IdentityProvider,
{
    /// Assemble a participant from its collaborators.
    pub fn new(
        name: impl Into<String>,
        config: &SessionConfig,
        channel: C,
        scene: S,
        identity: I,
    ) -> Self {
        let name = name.into();
        info!(
            participant = %name,
            peer = %channel.peer_id(),
            authority = channel.is_authority(),
            user = %identity.local_user(),
            "Participant created"
        );
        Self {
            name,
            policy: SpawnPolicy::new(config.spawn.clone(), config.session.seed),
            binder: EntityBinder::new(CollectibleSpec::from_config(&config.binder)),
            channel,
            scene,
            identity,
            state: ReplicatedState::new(),
            log: ActionLog::new(),
            bridge: TriggerBridge::new(),
            clock: TickClock::new(),
            next_sequence: 0,
            bound_version: None,
        }
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if the clock overflows, the channel fails, or
    /// the log refuses an entry. Malformed or redelivered frames are not
    /// errors.
    pub fn run_tick(&mut self) -> Result<TickSummary, TickError> {
        // --- Phase 1: Clock ---
        let tick = self.clock.advance()?;

        // --- Phase 2: Receive ---
        let received = self.phase_receive(tick)?;

        // --- Phase 3: Spawn ---
        let spawn = self.policy.evaluate(
            self.channel.is_authority(),
            self.state.items(),
            &mut self.scene,
        );
        if let SpawnDecision::Spawned(action) = spawn {
            let envelope = match self.dispatch(action) {
                Ok(envelope) => envelope,
                Err(error) => {
                    self.policy.acknowledge(action.entity_handle);
                    return Err(error);
                }
            };
            info!(
                participant = %self.name,
                tick,
                handle = %action.entity_handle,
                color = %action.color,
                action_id = %envelope.id,
                "Spawn dispatched"
            );
        }

        // --- Phase 4: Trigger ---
        let collected = self.phase_trigger()?;

        // --- Phase 5: Bind ---
        let bind = self.phase_bind();

        if received.frames > 0 || !collected.is_empty() {
            debug!(
                participant = %self.name,
                tick,
                frames = received.frames,
                applied = received.applied,
                collected = collected.len(),
                version = self.state.version(),
                "Tick complete"
            );
        }

        Ok(TickSummary {
            tick,
            received,
            spawn,
            collected,
            bind,
            live_items: self.state.items().len(),
            version: self.state.version(),
        })
    }

    /// Encode and dispatch an action under the next outbound sequence.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if the sequence overflows, encoding fails, or
    /// the channel rejects the frame.
    pub fn dispatch(&mut self, action: impl Into<Action>) -> Result<ActionEnvelope, TickError> {
        let sequence = self
            .next_sequence
            .checked_add(1)
            .ok_or(TickError::SequenceOverflow)?;
        let envelope = ActionEnvelope::new(self.channel.peer_id(), sequence, action);
        let frame = encode(&envelope)?;
        self.channel.dispatch(frame)?;
        self.next_sequence = sequence;
        Ok(envelope)
    }

    /// Phase 2: fold every delivered frame.
    fn phase_receive(&mut self, tick: u64) -> Result<ReceiveStats, TickError> {
        let frames = self.channel.drain_inbound()?;
        let mut stats = ReceiveStats {
            frames: frames.len(),
            ..ReceiveStats::default()
        };

        for frame in frames {
            let envelope = match decode(&frame) {
                Ok(envelope) => envelope,
                Err(error) => {
                    warn!(participant = %self.name, tick, %error, "Dropping undecodable frame");
                    stats.malformed = stats.malformed.saturating_add(1);
                    continue;
                }
            };

            let outcome = self.state.apply(&envelope);
            if let Action::Spawn(spawn) = &envelope.action {
                self.policy.acknowledge(spawn.entity_handle);
            }
            match outcome {
                ApplyOutcome::Applied => {}
                ApplyOutcome::Overwrote { .. } => {
                    stats.overwrites = stats.overwrites.saturating_add(1);
                }
                ApplyOutcome::StaleDestroy => {
                    stats.stale_destroys = stats.stale_destroys.saturating_add(1);
                }
                ApplyOutcome::Duplicate => {
                    stats.duplicates = stats.duplicates.saturating_add(1);
                }
                ApplyOutcome::Rejected(_) => {
                    stats.rejected = stats.rejected.saturating_add(1);
                }
            }
            if outcome.changed_state() {
                stats.applied = stats.applied.saturating_add(1);
                self.log.append(tick, envelope)?;
            }
        }
        Ok(stats)
    }

    /// Phase 4: bridge local overlaps into destroy actions.
    fn phase_trigger(&mut self) -> Result<Vec<EntityHandle>, TickError> {
        let mut collected = Vec::new();
        for overlap in self.scene.drain_overlaps() {
            let decision = self
                .bridge
                .on_overlap(overlap, &self.identity, &mut self.binder);
            if let BridgeDecision::Collect(action) = decision {
                self.dispatch(action)?;
                collected.push(action.entity_handle);
            }
        }
        Ok(collected)
    }

    /// Phase 5: reactive pass, skipped while the state is unchanged.
    fn phase_bind(&mut self) -> Option<BindReport> {
        let version = self.state.version();
        if self.bound_version == Some(version) {
            return None;
        }
        let report = self.binder.reconcile(
            self.state.items(),
            self.state.placements(),
            &mut self.scene,
        );
        if report.deferred.is_empty() {
            self.bound_version = Some(version);
        }
        Some(report)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Display name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replicated projections.
    pub const fn state(&self) -> &ReplicatedState {
        &self.state
    }

    /// Action log of every state-changing envelope.
    pub const fn log(&self) -> &ActionLog {
        &self.log
    }

    /// The binder owning local collectible entities.
    pub const fn binder(&self) -> &EntityBinder {
        &self.binder
    }

    /// The scene collaborator.
    pub const fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene collaborator, for driving avatars.
    pub const fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// The identity collaborator.
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    /// The replication channel.
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Current local tick.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }
}
