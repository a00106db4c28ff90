//! Avatar bots that drive a headless session.
//!
//! Each participant owns one bot. A bot walks toward the nearest collectible
//! its own scene shows, or toward a random waypoint when there is none, and
//! its new position is mirrored into every participant's scene so all
//! trigger subsystems see all avatars.

use collectible_core::headless::HeadlessScene;
use collectible_core::loopback::LoopbackChannel;
use collectible_core::participant::{Participant, TickSummary};
use collectible_core::ports::{LocalEntity, LocalIdentity};
use collectible_core::runner::TickCallback;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// Log scores every this many ticks.
const SCORE_LOG_INTERVAL: u64 = 100;

/// Waypoints closer than this count as reached.
const ARRIVAL_DISTANCE: f32 = 0.1;

#[derive(Debug)]
struct Bot {
    rng: StdRng,
    waypoint: Option<Vec3>,
}

/// Tick callback that moves every avatar once per tick.
#[derive(Debug)]
pub struct BotDriver {
    bots: Vec<Bot>,
    avatars: Vec<Vec<LocalEntity>>,
    speed: f32,
    half_extent: f32,
    height: f32,
}

impl BotDriver {
    /// Create one bot per avatar column.
    pub fn new(
        avatars: Vec<Vec<LocalEntity>>,
        speed: f32,
        half_extent: f32,
        height: f32,
        seed: u64,
    ) -> Self {
        let bots = (0..avatars.len())
            .map(|i| Bot {
                rng: StdRng::seed_from_u64(seed.wrapping_add(u64::try_from(i).unwrap_or(0))),
                waypoint: None,
            })
            .collect();
        Self {
            bots,
            avatars,
            speed,
            half_extent: if half_extent.is_finite() {
                half_extent.abs()
            } else {
                0.0
            },
            height,
        }
    }

    /// Next position for bot `index` inside its own scene.
    fn step(&mut self, index: usize, scene: &HeadlessScene, own: LocalEntity) -> Option<Vec3> {
        let current = scene.world_position(own)?;
        let (extent, height) = (self.half_extent, self.height);

        let nearest = scene
            .collectible_positions()
            .into_iter()
            .map(|(_, position)| position)
            .min_by(|a, b| current.distance(*a).total_cmp(&current.distance(*b)));

        let target = if let Some(item) = nearest {
            item
        } else {
            let bot = self.bots.get_mut(index)?;
            let reached = bot
                .waypoint
                .is_none_or(|w| current.distance(w) <= ARRIVAL_DISTANCE);
            if reached {
                bot.waypoint = Some(Vec3::new(
                    bot.rng.random_range(-extent..=extent),
                    height,
                    bot.rng.random_range(-extent..=extent),
                ));
            }
            bot.waypoint?
        };

        let offset = target - current;
        let distance = offset.length();
        if distance <= self.speed {
            Some(target)
        } else {
            Some(current + offset / distance * self.speed)
        }
    }
}

impl TickCallback<LoopbackChannel, HeadlessScene, LocalIdentity> for BotDriver {
    fn on_tick(
        &mut self,
        tick: u64,
        participants: &mut [Participant<LoopbackChannel, HeadlessScene, LocalIdentity>],
        summaries: &[TickSummary],
    ) {
        for (participant, summary) in participants.iter().zip(summaries) {
            for handle in &summary.collected {
                debug!(participant = participant.name(), %handle, tick, "Collection dispatched");
            }
        }

        let mut moves = Vec::with_capacity(participants.len());
        for (index, participant) in participants.iter().enumerate() {
            let Some(own) = self.avatars.get(index).and_then(|row| row.get(index)).copied() else {
                continue;
            };
            if let Some(position) = self.step(index, participant.scene(), own) {
                moves.push((index, position));
            }
        }

        for (k, participant) in participants.iter_mut().enumerate() {
            let Some(row) = self.avatars.get(k) else {
                continue;
            };
            for (index, position) in &moves {
                let Some(entity) = row.get(*index).copied() else {
                    continue;
                };
                if let Err(error) = participant.scene_mut().move_entity(entity, *position) {
                    warn!(participant = participant.name(), %error, "Failed to mirror avatar");
                }
            }
        }

        if tick.checked_rem(SCORE_LOG_INTERVAL) == Some(0) {
            if let Some(authority) = participants.first() {
                let scores = authority.state().scores();
                info!(
                    tick,
                    collectors = scores.len(),
                    total_collected = scores.total(),
                    live_items = authority.state().items().len(),
                    "Score update"
                );
            }
        }
    }
}
